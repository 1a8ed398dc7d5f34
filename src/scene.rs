//! Renderable state of the viewer: one inverted sphere wrapped in a textured material.

use image::{Rgba, RgbaImage};

use crate::config::{ConfigError, ViewerConfig};
use crate::mesh::{build_inverted_sphere, SphereMesh};

/// Image sampled onto the sphere.
///
/// The backing image can be swapped while the owning [`Material`] stays in place.
/// Every swap sets `needs_update`, which the renderer clears after uploading.
#[derive(Debug, Clone)]
pub struct Texture {
    image: RgbaImage,
    request_seq: u64,
    revision: u64,
    needs_update: bool,
}

impl Texture {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            request_seq: 0,
            revision: 0,
            needs_update: true,
        }
    }

    /// 2x2 checkerboard shown until the first real image lands.
    pub fn placeholder() -> Self {
        let mut image = RgbaImage::new(2, 2);
        image.put_pixel(0, 0, Rgba([96, 96, 96, 255]));
        image.put_pixel(1, 0, Rgba([160, 160, 160, 255]));
        image.put_pixel(0, 1, Rgba([160, 160, 160, 255]));
        image.put_pixel(1, 1, Rgba([96, 96, 96, 255]));
        Self::new(image)
    }

    /// Swap in the result of load request `request_seq`.
    ///
    /// Returns false, leaving the texture untouched, when an image from the same or a
    /// newer request is already applied.
    pub fn replace_image(&mut self, image: RgbaImage, request_seq: u64) -> bool {
        if request_seq <= self.request_seq {
            return false;
        }
        self.image = image;
        self.request_seq = request_seq;
        self.revision += 1;
        self.needs_update = true;
        true
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Sequence number of the load request currently displayed, 0 for the placeholder.
    pub fn request_seq(&self) -> u64 {
        self.request_seq
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub fn mark_uploaded(&mut self) {
        self.needs_update = false;
    }
}

#[derive(Debug, Clone)]
pub struct Material {
    pub texture: Texture,
}

#[derive(Debug, Clone)]
pub struct PanoramaMesh {
    pub radius: f32,
    pub geometry: SphereMesh,
    pub material: Material,
}

/// Exactly one panorama for the lifetime of the viewer.
#[derive(Debug, Clone)]
pub struct Scene {
    panorama: PanoramaMesh,
}

impl Scene {
    pub fn new(config: &ViewerConfig) -> Result<Self, ConfigError> {
        let geometry =
            build_inverted_sphere(config.radius, config.width_segments, config.height_segments)?;
        Ok(Self {
            panorama: PanoramaMesh {
                radius: config.radius,
                geometry,
                material: Material {
                    texture: Texture::placeholder(),
                },
            },
        })
    }

    pub fn panorama(&self) -> &PanoramaMesh {
        &self.panorama
    }

    pub fn texture(&self) -> &Texture {
        &self.panorama.material.texture
    }

    pub fn texture_mut(&mut self) -> &mut Texture {
        &mut self.panorama.material.texture
    }
}
