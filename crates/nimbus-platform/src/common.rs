use crate::session::{ImeTarget, Session, preedit_cursor_chars};
use nimbus_core::*;

use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Ime, KeyEvent};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};
use winit::window::{ImePurpose, Window};

pub(crate) fn to_vec2(p: PhysicalPosition<f64>) -> Vec2 {
    Vec2::new(p.x as f32, p.y as f32)
}

/// Editing and focus keys shared by both runners. Returns true when the key
/// was consumed and the window needs a redraw.
pub(crate) fn dispatch_key(session: &mut Session, ev: &KeyEvent, mods: ModifiersState) -> bool {
    if ev.state != ElementState::Pressed {
        return false;
    }
    let shift = mods.shift_key();
    let ctrl = mods.control_key() || mods.super_key();

    match ev.physical_key {
        PhysicalKey::Code(KeyCode::Tab) => {
            if ev.repeat {
                return true;
            }
            return if shift {
                session.focus_previous()
            } else {
                session.focus_next()
            };
        }
        PhysicalKey::Code(KeyCode::Enter | KeyCode::NumpadEnter) if !ev.repeat => {
            return session.press_enter();
        }
        _ => {}
    }

    if session.is_composing() {
        // The IME owns these keys while composing.
        return false;
    }

    match ev.physical_key {
        PhysicalKey::Code(KeyCode::Backspace) => session.backspace(),
        PhysicalKey::Code(KeyCode::Delete) => session.delete(),
        PhysicalKey::Code(KeyCode::ArrowLeft) => session.move_cursor(-1, shift),
        PhysicalKey::Code(KeyCode::ArrowRight) => session.move_cursor(1, shift),
        PhysicalKey::Code(KeyCode::Home) => session.home(shift),
        PhysicalKey::Code(KeyCode::End) => session.end(shift),
        PhysicalKey::Code(KeyCode::KeyA) if ctrl => session.select_all(),
        _ if ctrl || mods.alt_key() => false,
        _ => match ev.text.as_deref() {
            Some(text) if !text.chars().all(char::is_control) => session.type_text(text),
            _ => false,
        },
    }
}

pub(crate) fn dispatch_ime(session: &mut Session, ime: Ime) -> bool {
    match ime {
        Ime::Enabled => false,
        Ime::Preedit(text, cursor) => {
            let cursor = preedit_cursor_chars(&text, cursor);
            session.ime_preedit(&text, cursor)
        }
        Ime::Commit(text) => session.ime_commit(&text),
        Ime::Disabled => session.ime_cancel(),
    }
}

/// Shows, moves or hides the soft keyboard to match the focused field.
pub(crate) fn sync_ime(window: &Window, session: &Session, last: &mut Option<ImeTarget>) {
    let target = session.ime_target();
    if target == *last {
        return;
    }
    match target {
        Some(t) => {
            window.set_ime_allowed(true);
            window.set_ime_purpose(match t.keyboard_type {
                KeyboardType::Password => ImePurpose::Password,
                _ => ImePurpose::Normal,
            });
            window.set_ime_cursor_area(
                PhysicalPosition::new(t.rect.x as i32, t.rect.y as i32),
                PhysicalSize::new(t.rect.w.max(1.0) as u32, t.rect.h.max(1.0) as u32),
            );
        }
        None => window.set_ime_allowed(false),
    }
    *last = target;
}
