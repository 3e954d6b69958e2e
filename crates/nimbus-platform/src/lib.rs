//! Platform runners (desktop via winit, Android native activity) and the
//! headless [`Session`] they both drive.
//!
//! ```rust
//! use nimbus_core::*;
//! use nimbus_platform::Session;
//! use nimbus_ui::*;
//!
//! let mut session = Session::new(|_| Column(Modifier::new()).child(Button("OK", || {})));
//! session.frame_at(std::time::Instant::now());
//! assert!(session.find(Role::Button, "OK").is_some());
//! ```

pub mod session;

#[cfg(any(feature = "desktop", feature = "android"))]
mod common;

#[cfg(feature = "desktop")]
mod desktop;

#[cfg(feature = "android")]
mod android;

pub use session::{DEFAULT_SIZE, ImeTarget, Session};

#[cfg(feature = "desktop")]
pub use desktop::{DesktopOptions, run_desktop_app, run_desktop_app_with_options};

#[cfg(feature = "android")]
pub use android::{AndroidAssets, AndroidOptions, run_android_app, run_android_app_with_options};
