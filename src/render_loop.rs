// render_loop.rs: per-frame driver
//
// The shell schedules ticks at the display's refresh cadence (redraw requests with a
// FIFO present mode). Each tick polls the surface size, advances the stage and draws.
// The loop runs until `stop` or a cloned `LoopHandle` cancels it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::camera::Camera;
use crate::scene::Scene;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("surface lost")]
    SurfaceLost,
    #[error("surface outdated")]
    SurfaceOutdated,
    #[error("timed out acquiring the next frame")]
    Timeout,
    #[error("GPU out of memory")]
    OutOfMemory,
    #[error("failed to create surface: {0}")]
    CreateSurface(String),
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to request device: {0}")]
    RequestDevice(String),
}

/// Drawable target owned by the shell. The loop only reads its size.
pub trait ViewportSurface {
    fn pixel_size(&self) -> (u32, u32);
}

impl ViewportSurface for winit::window::Window {
    fn pixel_size(&self) -> (u32, u32) {
        let size = self.inner_size();
        (size.width, size.height)
    }
}

/// Values shown alongside the scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStatus {
    pub latitude: f32,
    pub longitude: f32,
    pub fov_degrees: f32,
    pub fps: f32,
    pub loading: bool,
    pub warning: Option<String>,
}

/// Everything a renderer needs for one draw. The scene is mutable so the renderer
/// can clear the texture's dirty flag after uploading it.
pub struct FrameView<'a> {
    pub scene: &'a mut Scene,
    pub camera: &'a Camera,
    pub opacity: f32,
    pub status: FrameStatus,
}

pub trait FrameRenderer {
    fn draw(&mut self, frame: FrameView<'_>) -> Result<(), RenderError>;
}

/// Something animated and drawn once per tick.
pub trait Stage {
    fn sync_viewport(&mut self, width: u32, height: u32);
    fn animate(&mut self);
    fn frame(&mut self, fps: f32) -> FrameView<'_>;
}

/// Cancels the loop it was taken from.
#[derive(Debug, Clone, Default)]
pub struct LoopHandle {
    cancelled: Arc<AtomicBool>,
}

impl LoopHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopPhase {
    /// Waiting for a surface with non-zero size.
    Pending,
    Running,
    Stopped,
}

#[derive(Debug)]
pub enum TickOutcome {
    Rendered,
    /// Surface has a zero dimension; the viewport was synced but the stage did not advance.
    Deferred,
    /// The draw failed; the loop keeps running.
    Dropped(RenderError),
    Stopped,
}

struct FrameClock {
    window_start: Instant,
    window_frames: u32,
    fps: f32,
}

impl FrameClock {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            window_frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.window_frames += 1;
        let now = Instant::now();
        let elapsed = now.duration_since(self.window_start).as_secs_f32();
        if elapsed >= 1.0 {
            self.fps = self.window_frames as f32 / elapsed;
            self.window_frames = 0;
            self.window_start = now;
        }
    }
}

pub struct RenderLoop<S> {
    stage: S,
    phase: LoopPhase,
    handle: LoopHandle,
    clock: FrameClock,
    frames_rendered: u64,
    // surface had a zero dimension on the last tick; no presents pace the loop
    parked: bool,
}

impl<S: Stage> RenderLoop<S> {
    pub fn new(stage: S) -> Self {
        Self {
            stage,
            phase: LoopPhase::Pending,
            handle: LoopHandle::default(),
            clock: FrameClock::new(),
            frames_rendered: 0,
            parked: false,
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut S {
        &mut self.stage
    }

    pub fn is_running(&self) -> bool {
        self.phase == LoopPhase::Running && !self.handle.is_cancelled()
    }

    /// True until the loop is stopped, including while it waits for a usable surface.
    pub fn is_active(&self) -> bool {
        self.phase != LoopPhase::Stopped && !self.handle.is_cancelled()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Whether the shell should schedule another tick. False while stopped or while the
    /// surface is zero-sized, until `resume` is called.
    pub fn wants_frame(&self) -> bool {
        self.is_active() && !self.parked
    }

    /// Call when the surface reports a non-zero size again.
    pub fn resume(&mut self) {
        if self.parked {
            log::debug!("render loop resumed");
        }
        self.parked = false;
    }

    pub fn stop(&mut self) {
        if self.phase != LoopPhase::Stopped {
            log::info!("render loop stopped after {} frames", self.frames_rendered);
        }
        self.phase = LoopPhase::Stopped;
        self.handle.cancel();
    }

    pub fn tick(
        &mut self,
        surface: &impl ViewportSurface,
        renderer: &mut impl FrameRenderer,
    ) -> TickOutcome {
        if self.handle.is_cancelled() {
            self.phase = LoopPhase::Stopped;
        }

        let (width, height) = surface.pixel_size();
        let degenerate = width == 0 || height == 0;
        match self.phase {
            LoopPhase::Stopped => return TickOutcome::Stopped,
            LoopPhase::Pending if degenerate => {
                self.parked = true;
                return TickOutcome::Deferred;
            }
            LoopPhase::Pending => {
                log::debug!("render loop started at {width}x{height}");
                self.phase = LoopPhase::Running;
            }
            LoopPhase::Running => {}
        }

        self.stage.sync_viewport(width, height);
        if degenerate {
            // nothing is presented, so animating here would run unpaced
            self.parked = true;
            return TickOutcome::Deferred;
        }
        self.parked = false;
        self.stage.animate();

        let fps = self.clock.fps;
        match renderer.draw(self.stage.frame(fps)) {
            Ok(()) => {
                self.clock.tick();
                self.frames_rendered += 1;
                TickOutcome::Rendered
            }
            Err(err) => {
                log::warn!("frame dropped: {err}");
                TickOutcome::Dropped(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use crate::texture::tests::png_bytes;
    use crate::viewer::ViewerState;
    use glam::Mat4;
    use std::cell::Cell;
    use std::time::Duration;

    struct FakeSurface(Cell<(u32, u32)>);

    impl FakeSurface {
        fn new(w: u32, h: u32) -> Self {
            Self(Cell::new((w, h)))
        }

        fn set(&self, w: u32, h: u32) {
            self.0.set((w, h));
        }
    }

    impl ViewportSurface for FakeSurface {
        fn pixel_size(&self) -> (u32, u32) {
            self.0.get()
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        projections: Vec<Mat4>,
        uploads: Vec<(u32, u32)>,
        opacities: Vec<f32>,
        fail_next: bool,
    }

    impl FrameRenderer for RecordingRenderer {
        fn draw(&mut self, frame: FrameView<'_>) -> Result<(), RenderError> {
            if std::mem::take(&mut self.fail_next) {
                return Err(RenderError::SurfaceLost);
            }
            let texture = frame.scene.texture_mut();
            if texture.needs_update() {
                self.uploads.push(texture.dimensions());
                texture.mark_uploaded();
            }
            self.projections.push(frame.camera.projection_matrix());
            self.opacities.push(frame.opacity);
            Ok(())
        }
    }

    fn viewer_loop() -> RenderLoop<ViewerState> {
        let config = ViewerConfig {
            texture: "/nonexistent/startup.jpg".into(),
            ..Default::default()
        };
        RenderLoop::new(ViewerState::new(config, (800, 600)).unwrap())
    }

    #[test]
    fn idle_run_rotates_point_one_degree_per_frame() {
        let mut render_loop = viewer_loop();
        let surface = FakeSurface::new(800, 600);
        let mut renderer = RecordingRenderer::default();

        for _ in 0..360 {
            assert!(matches!(
                render_loop.tick(&surface, &mut renderer),
                TickOutcome::Rendered
            ));
        }
        let orbit = render_loop.stage().orbit();
        assert!((orbit.longitude.rem_euclid(360.0) - 36.0).abs() < 1e-2);
        assert_eq!(orbit.latitude, 0.0);
        assert_eq!(render_loop.frames_rendered(), 360);
    }

    #[test]
    fn waits_for_non_zero_surface() {
        let mut render_loop = viewer_loop();
        let surface = FakeSurface::new(800, 0);
        let mut renderer = RecordingRenderer::default();

        assert!(matches!(
            render_loop.tick(&surface, &mut renderer),
            TickOutcome::Deferred
        ));
        assert!(!render_loop.is_running());
        assert!(render_loop.is_active());
        assert_eq!(render_loop.stage().orbit().longitude, 0.0);

        surface.set(800, 600);
        assert!(matches!(
            render_loop.tick(&surface, &mut renderer),
            TickOutcome::Rendered
        ));
        assert!(render_loop.is_running());
    }

    #[test]
    fn zero_height_mid_run_keeps_looping() {
        let mut render_loop = viewer_loop();
        let surface = FakeSurface::new(800, 600);
        let mut renderer = RecordingRenderer::default();
        render_loop.tick(&surface, &mut renderer);

        surface.set(800, 0);
        assert!(matches!(
            render_loop.tick(&surface, &mut renderer),
            TickOutcome::Deferred
        ));
        assert_eq!(render_loop.stage().camera().aspect, 0.0);

        surface.set(800, 600);
        assert!(matches!(
            render_loop.tick(&surface, &mut renderer),
            TickOutcome::Rendered
        ));
        assert_eq!(renderer.projections.len(), 2);
    }

    #[test]
    fn zero_sized_surface_freezes_rotation() {
        let mut render_loop = viewer_loop();
        let surface = FakeSurface::new(800, 600);
        let mut renderer = RecordingRenderer::default();
        render_loop.tick(&surface, &mut renderer);
        let longitude = render_loop.stage().orbit().longitude;

        surface.set(800, 0);
        for _ in 0..10_000 {
            assert!(matches!(
                render_loop.tick(&surface, &mut renderer),
                TickOutcome::Deferred
            ));
        }
        assert_eq!(render_loop.stage().orbit().longitude, longitude);
        assert_eq!(renderer.projections.len(), 1);

        surface.set(800, 600);
        render_loop.tick(&surface, &mut renderer);
        assert!((render_loop.stage().orbit().longitude - longitude - 0.1).abs() < 1e-4);
    }

    #[test]
    fn zero_sized_surface_parks_until_resumed() {
        let mut render_loop = viewer_loop();
        let surface = FakeSurface::new(800, 600);
        let mut renderer = RecordingRenderer::default();
        assert!(render_loop.wants_frame());

        render_loop.tick(&surface, &mut renderer);
        assert!(render_loop.wants_frame());

        surface.set(0, 0);
        render_loop.tick(&surface, &mut renderer);
        assert!(!render_loop.wants_frame());
        assert!(render_loop.is_active());

        surface.set(800, 600);
        render_loop.resume();
        assert!(render_loop.wants_frame());

        render_loop.stop();
        assert!(!render_loop.wants_frame());
    }

    #[test]
    fn resized_surface_reaches_the_next_projection() {
        let mut render_loop = viewer_loop();
        let surface = FakeSurface::new(800, 600);
        let mut renderer = RecordingRenderer::default();
        render_loop.tick(&surface, &mut renderer);

        surface.set(400, 300);
        render_loop.tick(&surface, &mut renderer);
        assert_eq!(renderer.projections[0], renderer.projections[1]);

        surface.set(800, 400);
        render_loop.tick(&surface, &mut renderer);
        assert!((render_loop.stage().camera().aspect - 2.0).abs() < 1e-4);
        let p = renderer.projections[2];
        assert!((p.x_axis.x * 2.0 - p.y_axis.y).abs() < 1e-4);
    }

    #[test]
    fn failed_draw_does_not_stop_the_loop() {
        let mut render_loop = viewer_loop();
        let surface = FakeSurface::new(640, 480);
        let mut renderer = RecordingRenderer {
            fail_next: true,
            ..Default::default()
        };

        assert!(matches!(
            render_loop.tick(&surface, &mut renderer),
            TickOutcome::Dropped(RenderError::SurfaceLost)
        ));
        assert!(matches!(
            render_loop.tick(&surface, &mut renderer),
            TickOutcome::Rendered
        ));
    }

    #[test]
    fn dropped_file_is_uploaded_on_a_following_frame() {
        let mut render_loop = viewer_loop();
        let surface = FakeSurface::new(800, 600);
        let mut renderer = RecordingRenderer::default();
        render_loop.tick(&surface, &mut renderer);
        assert_eq!(renderer.uploads, vec![(2, 2)]);

        render_loop.stage_mut().drag_enter();
        render_loop.tick(&surface, &mut renderer);
        assert_eq!(renderer.opacities.last(), Some(&0.5));

        render_loop
            .stage_mut()
            .drop_bytes(png_bytes(16, 8, [9, 9, 9, 255]));
        for _ in 0..2000 {
            render_loop.tick(&surface, &mut renderer);
            if renderer.uploads.len() > 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(renderer.uploads.last(), Some(&(16, 8)));
        assert_eq!(renderer.opacities.last(), Some(&1.0));
    }

    #[test]
    fn cancelled_handle_stops_the_loop() {
        let mut render_loop = viewer_loop();
        let surface = FakeSurface::new(800, 600);
        let mut renderer = RecordingRenderer::default();
        let handle = render_loop.handle();

        render_loop.tick(&surface, &mut renderer);
        handle.cancel();
        assert!(matches!(
            render_loop.tick(&surface, &mut renderer),
            TickOutcome::Stopped
        ));
        assert!(!render_loop.is_active());
        assert_eq!(render_loop.frames_rendered(), 1);
    }

    #[test]
    fn stop_is_final() {
        let mut render_loop = viewer_loop();
        let surface = FakeSurface::new(800, 600);
        let mut renderer = RecordingRenderer::default();

        render_loop.stop();
        assert!(matches!(
            render_loop.tick(&surface, &mut renderer),
            TickOutcome::Stopped
        ));
        assert!(renderer.projections.is_empty());
    }
}
