// orbit.rs: pointer and wheel input -> latitude / longitude / field of view
//
//   Idle --pointer_down--> Dragging --pointer_up--> Idle
//   Dragging --pointer_move--> Dragging   (angles follow the pointer)
//   Idle --frame--> Idle                  (longitude drifts by AUTO_ROTATE_STEP)
//   any --wheel--> same state             (field of view changes)

use crate::camera::Camera;

/// Degrees per pointer pixel.
pub const DRAG_SENSITIVITY: f32 = 0.1;
/// Degrees of longitude added per idle frame.
pub const AUTO_ROTATE_STEP: f32 = 0.1;
/// Degrees of field of view per wheel delta unit.
pub const WHEEL_ZOOM_FACTOR: f32 = 0.05;

pub const FOV_MIN: f32 = 1.0;
pub const FOV_MAX: f32 = 179.0;

/// Pointer position and angles captured when a drag starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragAnchor {
    pub pointer_x: f32,
    pub pointer_y: f32,
    pub longitude: f32,
    pub latitude: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrbitPhase {
    Idle,
    Dragging(DragAnchor),
}

#[derive(Debug, Clone)]
pub struct OrbitState {
    pub phase: OrbitPhase,
    /// Degrees, unbounded.
    pub longitude: f32,
    /// Degrees. May leave [-85, 85] during a drag until the next frame clamps it.
    pub latitude: f32,
}

impl Default for OrbitState {
    fn default() -> Self {
        Self::new()
    }
}

impl OrbitState {
    pub fn new() -> Self {
        Self {
            phase: OrbitPhase::Idle,
            longitude: 0.0,
            latitude: 0.0,
        }
    }

    pub fn is_interacting(&self) -> bool {
        matches!(self.phase, OrbitPhase::Dragging(_))
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.phase = OrbitPhase::Dragging(DragAnchor {
            pointer_x: x,
            pointer_y: y,
            longitude: self.longitude,
            latitude: self.latitude,
        });
    }

    /// Returns false when not dragging, leaving the event to other handlers.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> bool {
        let OrbitPhase::Dragging(anchor) = self.phase else {
            return false;
        };

        // dragging right turns the view left
        self.longitude = (anchor.pointer_x - x) * DRAG_SENSITIVITY + anchor.longitude;
        self.latitude = (y - anchor.pointer_y) * DRAG_SENSITIVITY + anchor.latitude;
        true
    }

    pub fn pointer_up(&mut self) {
        self.phase = OrbitPhase::Idle;
    }

    /// Positive `delta_y` (scrolling down) widens the view.
    pub fn wheel(&mut self, delta_y: f32, camera: &mut Camera) {
        let fov = (camera.fov_degrees + delta_y * WHEEL_ZOOM_FACTOR).clamp(FOV_MIN, FOV_MAX);
        camera.set_fov(fov);
    }

    /// Per-frame idle drift. Does nothing while dragging.
    pub fn auto_rotate(&mut self) {
        if !self.is_interacting() {
            self.longitude += AUTO_ROTATE_STEP;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn camera() -> Camera {
        Camera::new(75.0, 1.0, 1.0, 1100.0)
    }

    #[test]
    fn starts_idle_at_zero() {
        let orbit = OrbitState::new();
        assert!(!orbit.is_interacting());
        assert_eq!((orbit.latitude, orbit.longitude), (0.0, 0.0));
    }

    #[test]
    fn pointer_down_snapshots_anchor() {
        let mut orbit = OrbitState::new();
        orbit.longitude = 12.0;
        orbit.latitude = -3.0;
        orbit.pointer_down(100.0, 50.0);

        assert_eq!(
            orbit.phase,
            OrbitPhase::Dragging(DragAnchor {
                pointer_x: 100.0,
                pointer_y: 50.0,
                longitude: 12.0,
                latitude: -3.0,
            })
        );
    }

    #[test]
    fn zero_displacement_move_keeps_angles() {
        let mut orbit = OrbitState::new();
        orbit.longitude = 33.0;
        orbit.latitude = 7.5;
        orbit.pointer_down(640.0, 360.0);
        assert!(orbit.pointer_move(640.0, 360.0));
        assert_eq!((orbit.latitude, orbit.longitude), (7.5, 33.0));
    }

    #[test]
    fn drag_follows_sensitivity_law() {
        for (dx, dy) in [(10.0, 0.0), (-37.0, 22.0), (250.0, -120.0)] {
            let mut orbit = OrbitState::new();
            orbit.longitude = 5.0;
            orbit.latitude = 1.0;
            orbit.pointer_down(200.0, 200.0);
            orbit.pointer_move(200.0 + dx, 200.0 + dy);

            assert!((orbit.longitude - 5.0 - (-dx * DRAG_SENSITIVITY)).abs() < EPS);
            assert!((orbit.latitude - 1.0 - dy * DRAG_SENSITIVITY).abs() < EPS);
        }
    }

    #[test]
    fn moves_are_relative_to_the_anchor_not_cumulative() {
        let mut orbit = OrbitState::new();
        orbit.pointer_down(0.0, 0.0);
        orbit.pointer_move(10.0, 0.0);
        orbit.pointer_move(20.0, 0.0);
        assert!((orbit.longitude + 2.0).abs() < EPS);
    }

    #[test]
    fn raw_latitude_may_exceed_limit_during_drag() {
        let mut orbit = OrbitState::new();
        orbit.pointer_down(0.0, 0.0);
        orbit.pointer_move(0.0, 2000.0);
        assert!((orbit.latitude - 200.0).abs() < EPS);
    }

    #[test]
    fn move_without_drag_is_ignored() {
        let mut orbit = OrbitState::new();
        assert!(!orbit.pointer_move(300.0, 300.0));
        assert_eq!((orbit.latitude, orbit.longitude), (0.0, 0.0));
    }

    #[test]
    fn auto_rotation_only_when_idle() {
        let mut orbit = OrbitState::new();
        orbit.auto_rotate();
        orbit.auto_rotate();
        assert!((orbit.longitude - 0.2).abs() < EPS);

        orbit.pointer_down(10.0, 10.0);
        for _ in 0..5 {
            orbit.auto_rotate();
        }
        assert!((orbit.longitude - 0.2).abs() < EPS);

        orbit.pointer_up();
        orbit.auto_rotate();
        assert!((orbit.longitude - 0.3).abs() < EPS);
    }

    #[test]
    fn wheel_changes_fov_in_any_phase() {
        let mut orbit = OrbitState::new();
        let mut cam = camera();

        orbit.wheel(100.0, &mut cam);
        assert!((cam.fov_degrees - 80.0).abs() < EPS);

        orbit.pointer_down(0.0, 0.0);
        orbit.wheel(-200.0, &mut cam);
        assert!((cam.fov_degrees - 70.0).abs() < EPS);
        assert!(orbit.is_interacting());
    }

    #[test]
    fn wheel_keeps_fov_projective() {
        let mut orbit = OrbitState::new();
        let mut cam = camera();
        orbit.wheel(-1.0e6, &mut cam);
        assert_eq!(cam.fov_degrees, FOV_MIN);
        orbit.wheel(1.0e6, &mut cam);
        assert_eq!(cam.fov_degrees, FOV_MAX);
        assert!(cam.projection_matrix().is_finite());
    }
}
