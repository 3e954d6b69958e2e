//! Ambient values read during composition and paint: theme colors, screen
//! density and the user's text scale.
//!
//! `with_theme`, `with_density` and `with_text_scale` override one value
//! for the duration of a closure; the previous value comes back when it
//! returns or unwinds.

use std::cell::Cell;

use crate::Color;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Theme {
    /// Window clear color.
    pub background: Color,
    pub surface: Color,
    pub on_surface: Color,
    /// Accent for text buttons.
    pub primary: Color,
    /// Focus rings and caret.
    pub focus: Color,
    pub button_bg: Color,
    pub button_bg_pressed: Color,
    pub field_bg: Color,
    pub on_field: Color,
    /// Resting and floating label color of text fields.
    pub field_label: Color,
    pub selection: Color,
    pub toast_bg: Color,
    pub on_toast: Color,
}

impl Default for Theme {
    fn default() -> Self {
        let accent = Color::from_hex("#6200EE");
        Self {
            background: Color::from_hex("#121212"),
            surface: Color::from_hex("#1E1E1E"),
            on_surface: Color::from_hex("#DDDDDD"),
            primary: accent,
            focus: accent,
            button_bg: accent,
            button_bg_pressed: Color::from_hex("#3700B3"),
            field_bg: Color::WHITE,
            on_field: Color::from_hex("#212121"),
            field_label: Color::from_hex("#757575"),
            selection: Color::from_hex("#3B7BFF55"),
            toast_bg: Color::from_hex("#323232E6"),
            on_toast: Color::WHITE,
        }
    }
}

/// Physical pixels per dp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Density {
    pub scale: f32,
}

impl Default for Density {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

/// Extra multiplier applied to font sizes only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextScale(pub f32);

impl Default for TextScale {
    fn default() -> Self {
        Self(1.0)
    }
}

/// A length in density-independent pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dp(pub f32);

impl Dp {
    pub fn to_px(self) -> f32 {
        self.0 * density().scale
    }
}

pub fn dp_to_px(dp: f32) -> f32 {
    Dp(dp).to_px()
}

#[derive(Clone, Copy, Default)]
struct Locals {
    theme: Theme,
    density: Density,
    text_scale: TextScale,
}

thread_local! {
    static CURRENT: Cell<Option<Locals>> = const { Cell::new(None) };
}

fn current() -> Locals {
    CURRENT.with(|c| c.get()).unwrap_or_default()
}

fn provide<R>(change: impl FnOnce(&mut Locals), f: impl FnOnce() -> R) -> R {
    struct Restore(Option<Locals>);
    impl Drop for Restore {
        fn drop(&mut self) {
            CURRENT.with(|c| c.set(self.0));
        }
    }

    let mut next = current();
    change(&mut next);
    let _restore = Restore(CURRENT.with(|c| c.replace(Some(next))));
    f()
}

pub fn with_theme<R>(theme: Theme, f: impl FnOnce() -> R) -> R {
    provide(|l| l.theme = theme, f)
}

pub fn with_density<R>(density: Density, f: impl FnOnce() -> R) -> R {
    provide(|l| l.density = density, f)
}

pub fn with_text_scale<R>(ts: TextScale, f: impl FnOnce() -> R) -> R {
    provide(|l| l.text_scale = ts, f)
}

pub fn theme() -> Theme {
    current().theme
}

pub fn density() -> Density {
    current().density
}

pub fn text_scale() -> TextScale {
    current().text_scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_overrides_unwind_in_order() {
        with_density(Density { scale: 2.0 }, || {
            assert_eq!(dp_to_px(10.0), 20.0);
            with_text_scale(TextScale(1.5), || {
                assert_eq!(density().scale, 2.0);
                assert_eq!(text_scale().0, 1.5);
            });
            assert_eq!(text_scale().0, 1.0);
        });
        assert_eq!(dp_to_px(10.0), 10.0);
    }
}
