use std::cell::Cell;
use std::io::Cursor;
use std::rc::Rc;
use std::time::{Duration, Instant};

use ::image::codecs::gif::{GifEncoder, Repeat};
use ::image::{Delay, Frame, ImageFormat, Rgba, RgbaImage};
use nimbus_core::*;
use nimbus_login::{LOGIN_FAILED_MESSAGE, Login};
use nimbus_media::registry::{reset_stats, stats};
use nimbus_media::{MemoryAssets, set_asset_source};
use nimbus_platform::Session;
use nimbus_ui::toast;

const VIDEO: &str = "asset:///clouds.gif";

fn gif_bytes() -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut enc = GifEncoder::new(&mut out);
        enc.set_repeat(Repeat::Infinite).unwrap();
        let frames = [[200, 40, 40, 255], [40, 40, 200, 255]].map(|c| {
            Frame::from_parts(
                RgbaImage::from_pixel(4, 8, Rgba(c)),
                0,
                0,
                Delay::from_numer_denom_ms(100, 1),
            )
        });
        enc.encode_frames(frames).unwrap();
    }
    out
}

fn png_bytes() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn screen(video_uri: &'static str) -> Session {
    set_asset_source(
        MemoryAssets::new()
            .with("clouds.gif", gif_bytes())
            .with("logo.png", png_bytes()),
    );
    reset_stats();
    toast::reset();
    Session::new(move |_| Login(video_uri))
}

fn type_into(s: &mut Session, label: &str, text: &str, now: Instant) {
    assert!(s.focus(Role::TextField, label));
    for ch in text.chars() {
        assert!(s.type_text(&ch.to_string()));
        s.frame_at(now);
    }
}

fn shown(s: &Session, label: &str) -> String {
    s.display_text(label).unwrap_or_default()
}

fn outline(s: &Session) -> String {
    s.semantics()
        .iter()
        .map(|n| format!("{:?} {:?} {:?}", n.role, n.label, n.value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn background_generation(s: &Session) -> Option<u64> {
    let handle = s.frame()?.scene.nodes.iter().find_map(|n| match n {
        SceneNode::Image { handle, rect, .. } if rect.w > 100.0 => Some(*handle),
        _ => None,
    })?;
    with_image(handle, |img| img.generation)
}

#[test]
fn keystrokes_concatenate_in_order() {
    let t0 = Instant::now();
    let mut s = screen(VIDEO);
    s.frame_at(t0);
    type_into(&mut s, "username", "al", t0);
    s.type_text("ice");
    s.frame_at(t0);
    assert_eq!(shown(&s, "username"), "alice");
    assert_eq!(s.field_text("username").as_deref(), Some("alice"));
}

#[test]
fn username_next_lands_on_password() {
    let t0 = Instant::now();
    let mut s = screen(VIDEO);
    s.frame_at(t0);

    // Fresh, after typing, and coming back from the password field.
    s.click(Role::TextField, "username");
    assert!(s.ime_action());
    assert_eq!(s.focused_label(), Some("password"));

    type_into(&mut s, "username", "bob", t0);
    assert!(s.ime_action());
    assert_eq!(s.focused_label(), Some("password"));

    s.click(Role::TextField, "username");
    assert_eq!(s.focused_label(), Some("username"));
    assert!(s.perform_ime_action(ImeAction::Next));
    assert_eq!(s.focused_label(), Some("password"));
    assert_eq!(toast::shown_count(), 0);
}

#[test]
fn password_done_clears_focus_and_toasts_once() {
    let t0 = Instant::now();
    let mut s = screen(VIDEO);
    s.frame_at(t0);
    s.focus(Role::TextField, "password");
    assert!(s.focused().is_some());

    // Focus is already gone by the time the login attempt shows its toast.
    let focus_at_toast = Rc::new(Cell::new(None));
    {
        let fm = s.focus_manager().clone();
        let focus_at_toast = focus_at_toast.clone();
        toast::on_show(move |_| focus_at_toast.set(Some(fm.focused())));
    }
    assert!(s.ime_action());
    assert_eq!(focus_at_toast.get(), Some(None));
    assert_eq!(s.focused(), None);
    assert_eq!(toast::shown_count(), 1);

    let active = toast::active(t0);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].message, LOGIN_FAILED_MESSAGE);
    assert_eq!(active[0].duration, toast::ToastDuration::Short);
}

#[test]
fn sign_in_toasts_and_leaves_fields_alone() {
    let t0 = Instant::now();
    let mut s = screen(VIDEO);
    s.frame_at(t0);
    assert!(s.click(Role::Button, "SIGN IN"));
    s.frame_at(t0);
    assert_eq!(toast::shown_count(), 1);
    assert_eq!(shown(&s, "username"), "");
    assert_eq!(shown(&s, "password"), "");

    type_into(&mut s, "username", "u", t0);
    type_into(&mut s, "password", "p", t0);
    assert!(s.click(Role::Button, "SIGN IN"));
    s.frame_at(t0);
    assert_eq!(toast::shown_count(), 2);
    assert_eq!(s.field_text("username").as_deref(), Some("u"));
    assert_eq!(s.field_text("password").as_deref(), Some("p"));
}

#[test]
fn sign_up_does_nothing() {
    let t0 = Instant::now();
    let mut s = screen(VIDEO);
    s.frame_at(t0);
    assert!(s.click(Role::Button, "SIGN UP"));
    s.frame_at(t0);
    assert_eq!(toast::shown_count(), 0);
    assert_eq!(s.focused(), None);
}

#[test]
fn mount_then_unmount_releases_the_player_once() {
    let t0 = Instant::now();
    let mut s = screen(VIDEO);
    s.frame_at(t0);
    assert_eq!(stats().acquired, 1);
    assert_eq!(image_count(), 2);

    s.unmount();
    let st = stats();
    assert_eq!((st.acquired, st.released), (1, 1));
    assert_eq!((st.leaked, st.double_release), (0, 0));
    assert_eq!(image_count(), 0);

    s.unmount();
    drop(s);
    assert_eq!(stats().released, 1);
    assert_eq!(stats().double_release, 0);
}

#[test]
fn remount_builds_a_new_player_and_resets_fields() {
    let t0 = Instant::now();
    let mut s = screen(VIDEO);
    s.frame_at(t0);
    type_into(&mut s, "username", "alice", t0);
    type_into(&mut s, "password", "secret", t0);

    s.unmount();
    s.frame_at(t0 + Duration::from_millis(16));
    assert_eq!(shown(&s, "username"), "");
    assert_eq!(shown(&s, "password"), "");
    assert_eq!(stats().acquired, 2);
    assert_eq!(stats().live(), 1);

    drop(s);
    assert_eq!(stats().live(), 0);
    assert_eq!(stats().leaked, 0);
}

#[test]
fn password_is_masked_and_username_is_not() {
    let t0 = Instant::now();
    for input in ["", " ", "  a b ", "pässwörd", "秘密"] {
        let mut s = screen(VIDEO);
        s.frame_at(t0);
        type_into(&mut s, "username", input, t0);
        type_into(&mut s, "password", input, t0);
        assert_eq!(shown(&s, "username"), input);
        let masked = "\u{2022}".repeat(input.chars().count());
        assert_eq!(shown(&s, "password"), masked, "input {input:?}");
        assert_eq!(s.field_text("password").as_deref(), Some(input));
    }
}

#[test]
fn alice_signs_in_from_the_keyboard() {
    let t0 = Instant::now();
    let mut s = screen(VIDEO);
    s.frame_at(t0);

    type_into(&mut s, "username", "alice", t0);
    assert!(s.press_enter());
    assert_eq!(s.focused_label(), Some("password"));
    for ch in "secret".chars() {
        s.type_text(&ch.to_string());
    }
    s.frame_at(t0);
    assert!(s.press_enter());
    s.frame_at(t0);

    assert_eq!(s.focused(), None);
    assert_eq!(toast::shown_count(), 1);
    insta::assert_snapshot!(outline(&s), @r###"
    TextField Some("username") Some("alice")
    TextField Some("password") Some("••••••")
    Button Some("SIGN IN") None
    Text Some("Don't you have an account?") None
    Button Some("SIGN UP") None
    "###);
}

#[test]
fn background_takes_no_input() {
    let t0 = Instant::now();
    let mut s = screen(VIDEO);
    s.frame_at(t0);
    s.focus(Role::TextField, "username");
    assert!(!s.tap_at(Vec2::new(10.0, 10.0)));
    assert_eq!(s.focused(), None);
}

#[test]
fn video_loops_with_the_frame_clock() {
    let t0 = Instant::now();
    let mut s = screen(VIDEO);
    s.frame_at(t0);
    assert_eq!(background_generation(&s), Some(0));

    s.frame_at(t0 + Duration::from_millis(150));
    assert_eq!(background_generation(&s), Some(1));

    // Back to the first frame after one full loop.
    s.frame_at(t0 + Duration::from_millis(250));
    assert_eq!(background_generation(&s), Some(2));

    s.frame_at(t0 + Duration::from_millis(260));
    assert_eq!(background_generation(&s), Some(2));
}

#[test]
fn missing_video_leaves_a_blank_background() {
    let t0 = Instant::now();
    let mut s = screen("asset:///nope.gif");
    s.frame_at(t0);
    assert_eq!(background_generation(&s), None);
    assert_eq!(image_count(), 1);
    assert!(s.click(Role::Button, "SIGN IN"));
    assert_eq!(toast::shown_count(), 1);

    s.unmount();
    assert_eq!(stats().released, 1);
}

#[test]
fn broken_uri_is_not_fatal() {
    let t0 = Instant::now();
    let mut s = screen("ftp://example.com/clouds.gif");
    s.frame_at(t0);
    assert_eq!(background_generation(&s), None);
    assert!(s.find(Role::TextField, "username").is_some());
}

#[test]
fn toast_goes_away_on_its_own() {
    let t0 = Instant::now();
    let mut s = screen(VIDEO);
    s.frame_at(t0);
    s.click(Role::Button, "SIGN IN");
    assert!(s.wants_redraw(t0 + Duration::from_millis(1900)));
    s.frame_at(t0 + Duration::from_millis(2100));
    assert!(toast::active(t0 + Duration::from_millis(2100)).is_empty());
    assert!(!s.wants_redraw(t0 + Duration::from_millis(2100)));
}

#[test]
fn credential_fields_are_pill_shaped() {
    let t0 = Instant::now();
    let mut s = screen("asset:///none.gif");
    s.frame_at(t0);
    let scene = &s.frame().unwrap().scene;
    for label in ["username", "password"] {
        let field = s.find(Role::TextField, label).unwrap().rect;
        let radius = scene.nodes.iter().find_map(|n| match n {
            SceneNode::Rect { rect, radius, .. } if *rect == field => Some(*radius),
            _ => None,
        });
        assert_eq!(radius, Some(field.h / 2.0), "{label}");
    }
}
