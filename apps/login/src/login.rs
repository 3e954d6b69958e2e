use nimbus_core::*;
use nimbus_ui::toast::{Toast, ToastDuration};
use nimbus_ui::*;

use crate::config::LoginConfig;
use crate::input::{InputKind, TextInput};
use crate::media::{AssetImage, VideoBackground};

pub const LOGIN_FAILED_MESSAGE: &str = "Something went wrong, try again later";

const SURFACE: &str = "#444444";
const SIGN_UP: &str = "#4281A4";

/// There is no backend: every attempt fails the same way.
pub fn attempt_login() {
    log::info!("login attempt");
    Toast::make_text(LOGIN_FAILED_MESSAGE, ToastDuration::Short).show();
}

/// The login screen with the default logo.
pub fn Login(video_uri: &str) -> View {
    LoginScreen(&LoginConfig {
        video_uri: video_uri.to_string(),
        ..LoginConfig::default()
    })
}

pub fn LoginScreen(config: &LoginConfig) -> View {
    let password_requester = remember(FocusRequester::new);
    let focus_manager = local_focus_manager();

    let username = TextInput(
        InputKind::Username,
        None,
        KeyboardActions::new().on_next({
            let r = (*password_requester).clone();
            move || {
                r.request_focus();
            }
        }),
    );
    let password = TextInput(
        InputKind::Password,
        Some((*password_requester).clone()),
        KeyboardActions::new().on_done(move || {
            focus_manager.clear_focus();
            attempt_login();
        }),
    );

    let form = Column(
        Modifier::new()
            .fill_max_size()
            .padding(24.0)
            .gap(16.0)
            .justify_content(JustifyContent::FlexEnd)
            .align_items(AlignItems::Center),
    )
    .child((
        AssetImage(&config.logo_asset, Modifier::new().size(80.0, 80.0)).image_tint(Color::WHITE),
        username,
        password,
        Button("SIGN IN", attempt_login)
            .modifier(Modifier::new().fill_max_width().height(48.0).clip_rounded(24.0)),
        Divider(Color::WHITE.copy_alpha(0.3), 1.0)
            .modifier(Modifier::new().fill_max_width().margin_top(48.0)),
        Row(Modifier::new().align_items(AlignItems::Center)).child((
            Text("Don't you have an account?"),
            TextButton("SIGN UP", || {}).button_colors(Color::TRANSPARENT, Color::from_hex(SIGN_UP)),
        )),
    ));

    Surface(
        Modifier::new()
            .fill_max_size()
            .background(Color::from_hex(SURFACE)),
        Stack(Modifier::new().fill_max_size()).child((
            VideoBackground(&config.video_uri, Modifier::new().fill_max_size()),
            form,
        )),
    )
}
