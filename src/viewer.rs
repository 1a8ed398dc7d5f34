//! Viewer state and the input surface the window shell forwards events to.
//!
//! Everything here runs on the event-loop thread. The only off-thread work is texture
//! decoding, whose results are picked up at the start of each frame.

use crate::camera::{aspect_ratio, Camera};
use crate::config::{ConfigError, ViewerConfig};
use crate::orbit::OrbitState;
use crate::render_loop::{FrameStatus, FrameView, Stage};
use crate::scene::Scene;
use crate::texture::{TextureCompletion, TextureLoader, TextureSource};

/// Surface opacity while a file is hovered over the viewer.
pub const DRAG_OVER_OPACITY: f32 = 0.5;

/// What a hovered drop would do, for shells that show a cursor affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropEffect {
    Copy,
}

pub struct ViewerState {
    config: ViewerConfig,
    scene: Scene,
    camera: Camera,
    orbit: OrbitState,
    loader: TextureLoader,
    viewport: (u32, u32),
    opacity: f32,
    // set by the first drop of a drag gesture, cleared when the next gesture starts
    drop_taken: bool,
    last_warning: Option<String>,
}

impl ViewerState {
    /// Validates `config`, builds the scene and starts loading the configured texture.
    pub fn new(config: ViewerConfig, viewport: (u32, u32)) -> Result<Self, ConfigError> {
        config.validate()?;
        let scene = Scene::new(&config)?;
        let camera = Camera::new(
            config.field_of_view,
            aspect_ratio(viewport.0, viewport.1),
            config.near_clipping,
            config.far_clipping,
        );

        let mut state = Self {
            config,
            scene,
            camera,
            orbit: OrbitState::new(),
            loader: TextureLoader::new(),
            viewport,
            opacity: 1.0,
            drop_taken: false,
            last_warning: None,
        };
        let source = state.config.texture_source();
        state.load(source);
        Ok(state)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn orbit(&self) -> &OrbitState {
        &self.orbit
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn is_loading(&self) -> bool {
        self.loader.in_flight() > 0
    }

    pub fn last_warning(&self) -> Option<&str> {
        self.last_warning.as_deref()
    }

    // --- pointer / wheel ---

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.orbit.pointer_down(x, y);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) -> bool {
        self.orbit.pointer_move(x, y)
    }

    pub fn pointer_up(&mut self) {
        self.orbit.pointer_up();
    }

    pub fn wheel(&mut self, delta_y: f32) {
        self.orbit.wheel(delta_y, &mut self.camera);
    }

    /// Back to the starting orientation and the configured field of view.
    pub fn reset_view(&mut self) {
        self.orbit.reset();
        self.camera.set_fov(self.config.field_of_view);
    }

    // --- surface ---

    /// Explicit resize notification. Always recomputes the projection.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.camera.update_aspect(aspect_ratio(width, height));
        log::debug!("viewport {width}x{height}, aspect {}", self.camera.aspect);
    }

    // --- drag and drop ---

    pub fn drag_enter(&mut self) {
        self.opacity = DRAG_OVER_OPACITY;
        self.drop_taken = false;
    }

    pub fn drag_leave(&mut self) {
        self.opacity = 1.0;
        self.drop_taken = false;
    }

    pub fn drag_over(&self) -> DropEffect {
        DropEffect::Copy
    }

    /// Replace the panorama with a dropped file's contents.
    pub fn drop_bytes(&mut self, bytes: Vec<u8>) -> Option<u64> {
        self.drop_source(TextureSource::Bytes(bytes))
    }

    /// Only the first file of a drop gesture is loaded; further drops return `None`
    /// until `drag_enter` or `drag_leave` starts a new gesture.
    pub fn drop_source(&mut self, source: TextureSource) -> Option<u64> {
        self.opacity = 1.0;
        if self.drop_taken {
            return None;
        }
        self.drop_taken = true;
        Some(self.load(source))
    }

    pub fn load(&mut self, source: TextureSource) -> u64 {
        self.loader.request(source)
    }

    fn apply_texture_completions(&mut self) {
        for completion in self.loader.drain() {
            self.apply_completion(completion);
        }
    }

    /// Failures keep the current image and become the last warning. Completions older
    /// than the image on screen are discarded.
    fn apply_completion(&mut self, completion: TextureCompletion) {
        match completion.result {
            Ok(image) => {
                let (w, h) = image.dimensions();
                if self.scene.texture_mut().replace_image(image, completion.seq) {
                    log::info!("texture #{} ({w}x{h}) from {}", completion.seq, completion.source);
                    self.last_warning = None;
                } else {
                    log::debug!(
                        "dropping stale texture #{}, #{} is already shown",
                        completion.seq,
                        self.scene.texture().request_seq()
                    );
                }
            }
            Err(err) => {
                log::warn!("texture #{} from {} failed: {err}", completion.seq, completion.source);
                self.last_warning = Some(format!("{}: {err}", completion.source));
            }
        }
    }
}

impl Stage for ViewerState {
    fn sync_viewport(&mut self, width: u32, height: u32) {
        if (width, height) != self.viewport {
            self.resize(width, height);
        }
    }

    fn animate(&mut self) {
        self.apply_texture_completions();
        self.orbit.auto_rotate();
        self.orbit.latitude = self
            .camera
            .apply_orientation(self.orbit.latitude, self.orbit.longitude);
    }

    fn frame(&mut self, fps: f32) -> FrameView<'_> {
        let status = FrameStatus {
            latitude: self.orbit.latitude,
            longitude: self.orbit.longitude,
            fov_degrees: self.camera.fov_degrees,
            fps,
            loading: self.loader.in_flight() > 0,
            warning: self.last_warning.clone(),
        };
        FrameView {
            scene: &mut self.scene,
            camera: &self.camera,
            opacity: self.opacity,
            status,
        }
    }
}
