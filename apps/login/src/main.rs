use nimbus_login::{LoginConfig, app};
use nimbus_platform::{DesktopOptions, run_desktop_app_with_options};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = LoginConfig::from_env();
    log::info!("starting with {config:?}");
    run_desktop_app_with_options(
        app(config),
        DesktopOptions {
            title: "Nimbus Login".into(),
            ..DesktopOptions::default()
        },
    )
}
