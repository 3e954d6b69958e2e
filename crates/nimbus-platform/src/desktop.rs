use std::sync::Arc;
use std::time::Instant;

use nimbus_core::*;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::ModifiersState;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::common;
use crate::session::{DEFAULT_SIZE, ImeTarget, Session};

#[derive(Clone, Debug)]
pub struct DesktopOptions {
    pub title: String,
    /// Initial inner size in physical px.
    pub size: (u32, u32),
    /// Keep requesting frames even when nothing changed. Needed for video
    /// backgrounds and other time-driven content.
    pub continuous_redraw: bool,
}

impl Default for DesktopOptions {
    fn default() -> Self {
        Self {
            title: "Nimbus".into(),
            size: DEFAULT_SIZE,
            continuous_redraw: true,
        }
    }
}

pub fn run_desktop_app(root: impl FnMut(&mut Scheduler) -> View + 'static) -> anyhow::Result<()> {
    run_desktop_app_with_options(root, DesktopOptions::default())
}

pub fn run_desktop_app_with_options(
    root: impl FnMut(&mut Scheduler) -> View + 'static,
    options: DesktopOptions,
) -> anyhow::Result<()> {
    struct App {
        options: DesktopOptions,
        session: Session,
        window: Option<Arc<Window>>,
        backend: Option<nimbus_render_wgpu::WgpuBackend>,
        cursor: Vec2,
        modifiers: ModifiersState,
        ime: Option<ImeTarget>,
        dirty: bool,
    }

    impl App {
        fn request_redraw(&mut self) {
            self.dirty = true;
            if let Some(w) = &self.window {
                w.request_redraw();
            }
        }

        fn after_input(&mut self, changed: bool) {
            if let Some(w) = &self.window {
                common::sync_ime(w, &self.session, &mut self.ime);
            }
            if changed {
                self.request_redraw();
            }
        }

        fn shutdown(&mut self) {
            self.session.unmount();
            self.backend = None;
            self.ime = None;
        }
    }

    impl ApplicationHandler<()> for App {
        fn resumed(&mut self, el: &ActiveEventLoop) {
            if self.window.is_some() {
                return;
            }
            let (w, h) = self.options.size;
            let attrs = WindowAttributes::default()
                .with_title(self.options.title.clone())
                .with_inner_size(PhysicalSize::new(w, h));
            let win = match el.create_window(attrs) {
                Ok(win) => Arc::new(win),
                Err(e) => {
                    log::error!("Failed to create window: {e:?}");
                    el.exit();
                    return;
                }
            };
            let size = win.inner_size();
            self.session.set_size(size.width, size.height);
            self.session.set_density(win.scale_factor() as f32);
            match nimbus_render_wgpu::WgpuBackend::new(win.clone()) {
                Ok(b) => {
                    self.backend = Some(b);
                    self.window = Some(win);
                    self.session.mount();
                    self.request_redraw();
                }
                Err(e) => {
                    log::error!("Failed to create WGPU backend: {e:?}");
                    el.exit();
                }
            }
        }

        fn suspended(&mut self, _el: &ActiveEventLoop) {
            log::info!("suspended; disposing screen");
            self.shutdown();
            self.window = None;
        }

        fn window_event(&mut self, el: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
            match event {
                WindowEvent::CloseRequested => {
                    log::info!("Window close requested");
                    self.shutdown();
                    el.exit();
                }
                WindowEvent::Resized(size) => {
                    self.session.set_size(size.width, size.height);
                    if let Some(b) = &mut self.backend {
                        b.configure_surface(size.width, size.height);
                    }
                    self.request_redraw();
                }
                WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                    self.session.set_density(scale_factor as f32);
                    self.request_redraw();
                }
                WindowEvent::ModifiersChanged(m) => self.modifiers = m.state(),
                WindowEvent::CursorMoved { position, .. } => {
                    self.cursor = common::to_vec2(position);
                    self.session.pointer_move(self.cursor);
                    self.request_redraw();
                }
                WindowEvent::CursorLeft { .. } => self.session.cancel_pointer(),
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => {
                    match state {
                        ElementState::Pressed => {
                            self.session
                                .pointer_down(self.cursor, self.modifiers.shift_key());
                        }
                        ElementState::Released => {
                            self.session.pointer_up(self.cursor);
                        }
                    }
                    self.after_input(true);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    let changed = common::dispatch_key(&mut self.session, &event, self.modifiers);
                    self.after_input(changed);
                }
                WindowEvent::Ime(ime) => {
                    let changed = common::dispatch_ime(&mut self.session, ime);
                    self.after_input(changed);
                }
                WindowEvent::RedrawRequested => {
                    let Some(backend) = self.backend.as_mut() else {
                        return;
                    };
                    let frame = self.session.frame_at(Instant::now());
                    backend.frame(&frame.scene, GlyphRasterConfig::default());
                    self.dirty = false;
                    if let Some(w) = &self.window {
                        common::sync_ime(w, &self.session, &mut self.ime);
                    }
                }
                _ => {}
            }
        }

        fn about_to_wait(&mut self, _el: &ActiveEventLoop) {
            if self.options.continuous_redraw
                || self.dirty
                || self.session.wants_redraw(Instant::now())
            {
                self.request_redraw();
            }
        }

        fn exiting(&mut self, _el: &ActiveEventLoop) {
            self.shutdown();
        }
    }

    let event_loop = EventLoop::new()?;
    let mut app = App {
        options,
        session: Session::new(root),
        window: None,
        backend: None,
        cursor: Vec2::default(),
        modifiers: ModifiersState::default(),
        ime: None,
        dirty: true,
    };
    event_loop.run_app(&mut app)?;
    Ok(())
}
