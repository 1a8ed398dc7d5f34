// main.rs: window shell forwarding winit events to the viewer

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::sync::Arc;

use anyhow::Context;
use winit::{
    dpi::{LogicalPosition, LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, WindowBuilder},
};

use equirect_viewer::renderer::Renderer;
use equirect_viewer::{RenderError, RenderLoop, TextureSource, TickOutcome, ViewerConfig, ViewerState};

/// Browser-style wheel pixels per scroll line.
const PIXELS_PER_LINE: f32 = 100.0;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // configuration errors surface before any window or GPU resource exists
    let config = ViewerConfig::from_env().context("invalid viewer configuration")?;

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Equirectangular Panorama")
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)
            .context("failed to create window")?,
    );

    let size = window.inner_size();
    let state = ViewerState::new(config, (size.width, size.height))?;
    let mut renderer = pollster::block_on(Renderer::new(window.clone(), &state.scene().panorama().geometry))
        .context("failed to initialise the GPU renderer")?;
    let mut render_loop = RenderLoop::new(state);

    // last cursor position in logical pixels
    let mut cursor = LogicalPosition::new(0.0f32, 0.0f32);

    event_loop.run(move |event, _, control_flow| {
        // a zero-sized surface presents nothing, so wait for events instead of spinning
        *control_flow = if render_loop.wants_frame() {
            ControlFlow::Poll
        } else {
            ControlFlow::Wait
        };

        match event {
            Event::WindowEvent { event, .. } => {
                if renderer.on_window_event(&event) {
                    return;
                }
                let viewer = render_loop.stage_mut();

                match event {
                    WindowEvent::CloseRequested => {
                        render_loop.stop();
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                        viewer.resize(new_size.width, new_size.height);
                        if new_size.width > 0 && new_size.height > 0 {
                            render_loop.resume();
                            window.request_redraw();
                        }
                    }

                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        let new_size = *new_inner_size;
                        renderer.resize(new_size);
                        viewer.resize(new_size.width, new_size.height);
                        if new_size.width > 0 && new_size.height > 0 {
                            render_loop.resume();
                            window.request_redraw();
                        }
                    }

                    WindowEvent::KeyboardInput { input, .. } if input.state == ElementState::Pressed => {
                        match input.virtual_keycode {
                            Some(VirtualKeyCode::O) => {
                                if let Some(path) = rfd::FileDialog::new()
                                    .add_filter("Images", &["jpg", "jpeg", "png", "bmp", "webp"])
                                    .pick_file()
                                {
                                    viewer.load(TextureSource::Path(path));
                                }
                            }
                            Some(VirtualKeyCode::R) => viewer.reset_view(),
                            Some(VirtualKeyCode::F11) => {
                                if window.fullscreen().is_some() {
                                    window.set_fullscreen(None);
                                } else {
                                    window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                                }
                            }
                            _ => {}
                        }
                    }

                    WindowEvent::MouseInput {
                        state,
                        button: MouseButton::Left,
                        ..
                    } => match state {
                        ElementState::Pressed => viewer.pointer_down(cursor.x, cursor.y),
                        ElementState::Released => viewer.pointer_up(),
                    },

                    WindowEvent::CursorMoved { position, .. } => {
                        cursor = logical(position, window.scale_factor());
                        viewer.pointer_move(cursor.x, cursor.y);
                    }

                    WindowEvent::CursorLeft { .. } => viewer.pointer_up(),

                    WindowEvent::MouseWheel { delta, .. } => {
                        // winit reports scrolling up as positive, the viewer expects the opposite
                        let delta_y = match delta {
                            MouseScrollDelta::LineDelta(_, y) => -y * PIXELS_PER_LINE,
                            MouseScrollDelta::PixelDelta(pos) => -pos.y as f32,
                        };
                        viewer.wheel(delta_y);
                    }

                    WindowEvent::HoveredFile(_) => viewer.drag_enter(),
                    WindowEvent::HoveredFileCancelled => viewer.drag_leave(),
                    // winit reports one event per file; only the first of a drop is loaded
                    WindowEvent::DroppedFile(path) => {
                        if viewer.drop_source(TextureSource::Path(path.clone())).is_none() {
                            log::info!("ignoring additional dropped file {}", path.display());
                        }
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => match render_loop.tick(window.as_ref(), &mut renderer) {
                TickOutcome::Dropped(RenderError::SurfaceLost | RenderError::SurfaceOutdated) => {
                    renderer.resize(renderer.size);
                }
                TickOutcome::Dropped(RenderError::OutOfMemory) => {
                    log::error!("GPU out of memory, shutting down");
                    render_loop.stop();
                    *control_flow = ControlFlow::Exit;
                }
                TickOutcome::Rendered | TickOutcome::Deferred | TickOutcome::Dropped(_) => {}
                TickOutcome::Stopped => *control_flow = ControlFlow::Exit,
            },

            Event::MainEventsCleared => {
                if render_loop.wants_frame() {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    });
}

fn logical(position: PhysicalPosition<f64>, scale_factor: f64) -> LogicalPosition<f32> {
    let p: LogicalPosition<f64> = position.to_logical(scale_factor);
    LogicalPosition::new(p.x as f32, p.y as f32)
}
