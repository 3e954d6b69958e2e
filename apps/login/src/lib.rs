//! Login screen over a looping background video.
//!
//! The screen is a plain view function, [`Login`]; the binary and the
//! Android entry point only pick a runner and an asset source.
#![allow(non_snake_case)]

pub mod config;
pub mod input;
pub mod login;
pub mod media;

pub use config::LoginConfig;
pub use input::{InputKind, TextInput};
pub use login::{LOGIN_FAILED_MESSAGE, Login, LoginScreen, attempt_login};
pub use media::{AssetImage, VideoBackground};

use nimbus_core::{Scheduler, View};

/// Root view function for a runner.
pub fn app(config: LoginConfig) -> impl FnMut(&mut Scheduler) -> View + 'static {
    move |_: &mut Scheduler| LoginScreen(&config)
}

#[cfg(target_os = "android")]
#[unsafe(no_mangle)]
pub extern "C" fn android_main(android_app: winit::platform::android::activity::AndroidApp) {
    use log::LevelFilter;
    use nimbus_platform::{AndroidAssets, run_android_app};

    android_logger::init_once(android_logger::Config::default().with_max_level(LevelFilter::Trace));
    nimbus_media::set_asset_source(AndroidAssets(android_app.clone()));
    if let Err(e) = run_android_app(android_app, app(LoginConfig::from_env())) {
        log::error!("login app stopped: {e:?}");
    }
}
