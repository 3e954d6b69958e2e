use std::ffi::CString;
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

use nimbus_core::*;
use nimbus_media::assets::validate_asset_name;
use nimbus_media::{AssetSource, MediaError};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, Touch, TouchPhase, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};
use winit::platform::android::EventLoopBuilderExtAndroid;
use winit::platform::android::activity::AndroidApp;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::common;
use crate::session::{ImeTarget, Session};

#[derive(Clone, Copy, Debug)]
pub struct AndroidOptions {
    /// If true, runner keeps requesting frames (good for animations, costs battery).
    pub continuous_redraw: bool,
}

impl Default for AndroidOptions {
    fn default() -> Self {
        Self {
            continuous_redraw: true,
        }
    }
}

/// Reads `asset://` media from the APK's `assets/` directory.
#[derive(Clone)]
pub struct AndroidAssets(pub AndroidApp);

impl AssetSource for AndroidAssets {
    fn read(&self, name: &str) -> Result<Vec<u8>, MediaError> {
        validate_asset_name(name)?;
        let path = CString::new(name).map_err(|_| MediaError::InvalidUri(name.to_string()))?;
        let mut asset = self
            .0
            .asset_manager()
            .open(&path)
            .ok_or_else(|| MediaError::AssetNotFound(name.to_string()))?;
        let mut bytes = Vec::new();
        asset
            .read_to_end(&mut bytes)
            .map_err(|source| MediaError::Io {
                path: name.to_string(),
                source,
            })?;
        Ok(bytes)
    }
}

pub fn run_android_app(
    app: AndroidApp,
    root: impl FnMut(&mut Scheduler) -> View + 'static,
) -> anyhow::Result<()> {
    run_android_app_with_options(app, root, AndroidOptions::default())
}

pub fn run_android_app_with_options(
    app: AndroidApp,
    root: impl FnMut(&mut Scheduler) -> View + 'static,
    options: AndroidOptions,
) -> anyhow::Result<()> {
    let event_loop = EventLoop::builder().with_android_app(app).build()?;

    struct AppState {
        options: AndroidOptions,
        session: Session,
        window: Option<Arc<Window>>,
        backend: Option<nimbus_render_wgpu::WgpuBackend>,
        modifiers: ModifiersState,
        // Only the first finger drives the pointer.
        touch: Option<u64>,
        ime: Option<ImeTarget>,
        dirty: bool,
    }

    impl AppState {
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

        fn on_touch(&mut self, t: Touch) {
            let pos = common::to_vec2(t.location);
            match t.phase {
                TouchPhase::Started => {
                    if self.touch.is_some() {
                        return;
                    }
                    self.touch = Some(t.id);
                    self.session.pointer_down(pos, false);
                }
                TouchPhase::Moved if self.touch == Some(t.id) => {
                    self.session.pointer_move(pos);
                }
                TouchPhase::Ended if self.touch == Some(t.id) => {
                    self.touch = None;
                    self.session.pointer_up(pos);
                }
                TouchPhase::Cancelled if self.touch == Some(t.id) => {
                    self.touch = None;
                    self.session.cancel_pointer();
                }
                _ => return,
            }
            self.after_input(true);
        }

        fn shutdown(&mut self) {
            self.session.unmount();
            self.backend = None;
            self.touch = None;
            self.ime = None;
        }
    }

    impl ApplicationHandler<()> for AppState {
        fn resumed(&mut self, el: &ActiveEventLoop) {
            if self.window.is_some() {
                return;
            }
            let win = match el.create_window(WindowAttributes::default().with_title("Nimbus")) {
                Ok(win) => Arc::new(win),
                Err(e) => {
                    log::error!("Window create failed: {e:?}");
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
                    log::error!("WGPU backend init failed: {e:?}");
                    el.exit();
                }
            }
        }

        // The native window is gone; the screen is rebuilt on the next resume.
        fn suspended(&mut self, _el: &ActiveEventLoop) {
            log::info!("suspended; disposing screen");
            self.shutdown();
            self.window = None;
        }

        fn window_event(&mut self, el: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
            match event {
                WindowEvent::CloseRequested => {
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
                WindowEvent::Touch(t) => self.on_touch(t),
                WindowEvent::ModifiersChanged(m) => self.modifiers = m.state(),
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state == ElementState::Pressed
                        && !event.repeat
                        && matches!(
                            event.physical_key,
                            PhysicalKey::Code(KeyCode::Escape | KeyCode::BrowserBack)
                        )
                    {
                        // Back hides the keyboard first, then leaves.
                        if self.session.focused().is_some() {
                            self.session.clear_focus();
                            self.after_input(true);
                        } else {
                            self.shutdown();
                            el.exit();
                        }
                        return;
                    }
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

    let mut state = AppState {
        options,
        session: Session::new(root),
        window: None,
        backend: None,
        modifiers: ModifiersState::default(),
        touch: None,
        ime: None,
        dirty: true,
    };
    event_loop.run_app(&mut state)?;
    Ok(())
}
