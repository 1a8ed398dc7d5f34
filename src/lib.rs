//! Interactive 360° equirectangular panorama viewer.
//!
//! The image is drawn on the inside of a sphere around a fixed camera. Dragging turns
//! the view, the wheel zooms, and dropping an image file swaps the panorama at runtime.

pub mod camera;
pub mod config;
pub mod mesh;
pub mod orbit;
pub mod render_loop;
pub mod renderer;
pub mod scene;
pub mod texture;
pub mod viewer;

pub use config::{ConfigError, ViewerConfig};
pub use render_loop::{FrameRenderer, LoopHandle, RenderError, RenderLoop, TickOutcome, ViewportSurface};
pub use texture::{TextureLoadError, TextureSource};
pub use viewer::{DropEffect, ViewerState};
