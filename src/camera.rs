// camera.rs: perspective camera fixed at the sphere's center
//
// Coordinate system (right-handed, Y up):
//   latitude  = angle above the horizon, degrees
//   longitude = angle around Y measured from +X towards +Z, degrees

use glam::{Mat4, Vec3};

/// Effective latitude is kept inside this range so look-at never hits the poles.
pub const LATITUDE_LIMIT: f32 = 85.0;

/// Distance of the look target from the eye. Only its direction matters.
const TARGET_DISTANCE: f32 = 500.0;

/// Aspect used for the projection while the viewport reports zero height.
const NEUTRAL_ASPECT: f32 = 1.0;

/// Width over height, or 0 when the surface has no height yet.
pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        return 0.0;
    }
    width as f32 / height as f32
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    projection: Mat4,
    view: Mat4,
}

impl Camera {
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov_degrees,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn update_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection_matrix();
    }

    pub fn set_fov(&mut self, fov_degrees: f32) {
        self.fov_degrees = fov_degrees;
        self.update_projection_matrix();
    }

    /// Rebuilds the projection from the current fields. A zero or invalid aspect
    /// falls back to a square projection instead of producing NaNs.
    pub fn update_projection_matrix(&mut self) {
        let aspect = if self.aspect.is_finite() && self.aspect > 0.0 {
            self.aspect
        } else {
            NEUTRAL_ASPECT
        };
        self.projection =
            Mat4::perspective_rh(self.fov_degrees.to_radians(), aspect, self.near, self.far);
    }

    /// Aim at the point on a fixed sphere given by the angles.
    /// Returns the latitude actually used after clamping.
    pub fn apply_orientation(&mut self, latitude: f32, longitude: f32) -> f32 {
        let latitude = latitude.clamp(-LATITUDE_LIMIT, LATITUDE_LIMIT);
        let phi = (90.0 - latitude).to_radians();
        let theta = longitude.to_radians();

        self.target = Vec3::new(
            TARGET_DISTANCE * phi.sin() * theta.cos(),
            TARGET_DISTANCE * phi.cos(),
            TARGET_DISTANCE * phi.sin() * theta.sin(),
        );
        self.view = Mat4::look_at_rh(self.position, self.target, Vec3::Y);
        latitude
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Unit vector from the eye towards the target.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn camera() -> Camera {
        Camera::new(75.0, 800.0 / 600.0, 1.0, 1100.0)
    }

    #[test]
    fn aspect_ratio_handles_zero_height() {
        assert_eq!(aspect_ratio(800, 0), 0.0);
        assert!((aspect_ratio(800, 600) - 4.0 / 3.0).abs() < EPS);
        assert!((aspect_ratio(800, 400) - 2.0).abs() < EPS);
    }

    #[test]
    fn update_aspect_is_idempotent() {
        let mut cam = camera();
        cam.update_aspect(2.0);
        let first = cam.projection_matrix();
        cam.update_aspect(2.0);
        assert_eq!(first, cam.projection_matrix());
    }

    #[test]
    fn zero_aspect_keeps_projection_finite() {
        let mut cam = camera();
        cam.update_aspect(0.0);
        assert_eq!(cam.aspect, 0.0);
        assert!(cam.projection_matrix().is_finite());
    }

    #[test]
    fn projection_tracks_aspect() {
        let mut cam = camera();
        cam.update_aspect(2.0);
        let p = cam.projection_matrix();
        // x scale = y scale / aspect
        assert!((p.x_axis.x * 2.0 - p.y_axis.y).abs() < EPS);
    }

    #[test]
    fn zero_angles_look_down_positive_x() {
        let mut cam = camera();
        cam.apply_orientation(0.0, 0.0);
        assert!((cam.forward() - Vec3::X).length() < EPS);
    }

    #[test]
    fn ninety_longitude_looks_down_positive_z() {
        let mut cam = camera();
        cam.apply_orientation(0.0, 90.0);
        assert!((cam.forward() - Vec3::Z).length() < EPS);
    }

    #[test]
    fn latitude_is_clamped_for_the_target() {
        let mut cam = camera();
        let used = cam.apply_orientation(120.0, 0.0);
        assert_eq!(used, LATITUDE_LIMIT);
        let elevation = cam.forward().y.asin().to_degrees();
        assert!((elevation - LATITUDE_LIMIT).abs() < 1e-2);

        assert_eq!(cam.apply_orientation(-300.0, 10.0), -LATITUDE_LIMIT);
    }

    #[test]
    fn view_matrix_maps_target_onto_negative_z() {
        let mut cam = camera();
        cam.apply_orientation(30.0, 45.0);
        let in_view = cam.view_matrix().transform_point3(cam.target);
        assert!(in_view.x.abs() < 1e-2 && in_view.y.abs() < 1e-2);
        assert!(in_view.z < 0.0);
    }
}
