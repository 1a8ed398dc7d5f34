// mesh.rs: inverted sphere for viewing an equirectangular image from the inside

use std::f32::consts::PI;

use crate::config::ConfigError;

#[derive(Debug, Clone)]
pub struct SphereMesh {
    pub positions: Vec<[f32; 3]>,
    /// Inward-facing unit normals.
    pub normals: Vec<[f32; 3]>,
    /// Texture coordinates with v = 0 at the image's top row.
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl SphereMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Builds a sphere mirrored on X, so its triangles wind counter-clockwise when seen
/// from the center. Longitude runs along U, latitude along V.
pub fn build_inverted_sphere(
    radius: f32,
    width_segments: u32,
    height_segments: u32,
) -> Result<SphereMesh, ConfigError> {
    if width_segments < 3 {
        return Err(ConfigError::WidthSegments(width_segments));
    }
    if height_segments < 2 {
        return Err(ConfigError::HeightSegments(height_segments));
    }
    if !(radius.is_finite() && radius > 0.0) {
        return Err(ConfigError::Radius(radius));
    }

    let lon = width_segments as usize;
    let lat = height_segments as usize;
    let row = lon + 1;

    let mut positions = Vec::with_capacity((lat + 1) * row);
    let mut normals = Vec::with_capacity((lat + 1) * row);
    let mut uvs = Vec::with_capacity((lat + 1) * row);

    for i in 0..=lat {
        let v = i as f32 / lat as f32;
        let theta = PI * v;
        let sin_t = theta.sin();
        let cos_t = theta.cos();

        for j in 0..=lon {
            let u = j as f32 / lon as f32;
            let phi = 2.0 * PI * u;

            // x is already mirrored: a regular sphere would use -cos(phi)
            let n = [phi.cos() * sin_t, cos_t, phi.sin() * sin_t];

            positions.push([radius * n[0], radius * n[1], radius * n[2]]);
            normals.push([-n[0], -n[1], -n[2]]);
            uvs.push([u, v]);
        }
    }

    let mut indices = Vec::with_capacity(lon * (lat - 1) * 6);
    for i in 0..lat {
        for j in 0..lon {
            let a = (i * row + j + 1) as u32;
            let b = (i * row + j) as u32;
            let c = ((i + 1) * row + j) as u32;
            let d = ((i + 1) * row + j + 1) as u32;

            // the pole rows collapse one triangle of each quad to a point
            if i != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if i != lat - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    Ok(SphereMesh {
        positions,
        normals,
        uvs,
        indices,
    })
}
