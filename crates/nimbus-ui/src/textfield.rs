//! Single-line text field: the widget description and the editing state the
//! platform keeps for it between frames.

use std::ops::Range;
use std::rc::Rc;
use std::time::{Duration, Instant};

use nimbus_core::*;
pub use nimbus_text::TextMetrics;
use unicode_segmentation::GraphemeCursor;

pub const TF_FONT_DP: f32 = 16.0;
pub const TF_LABEL_FLOAT_DP: f32 = 12.0;
pub const TF_HEIGHT_DP: f32 = 56.0;
pub const TF_PADDING_X_DP: f32 = 16.0;
pub const TF_ICON_DP: f32 = 24.0;
/// Text start when a leading icon is present.
pub const TF_ICON_TEXT_X_DP: f32 = 52.0;

const BLINK: Duration = Duration::from_millis(500);
// Keeps the caret off the clip edge when scrolling.
const CARET_MARGIN: f32 = 2.0;

pub fn measure_text(text: &str, px: f32) -> TextMetrics {
    nimbus_text::metrics_for_textfield(text, px)
}

/// Control characters, newlines included, never enter a field.
pub fn sanitize_single_line(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

fn floor_char_boundary(s: &str, i: usize) -> usize {
    let mut i = i.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn grapheme_step(text: &str, from: usize, forward: bool) -> usize {
    let mut cursor = GraphemeCursor::new(floor_char_boundary(text, from), text.len(), true);
    let next = if forward {
        cursor.next_boundary(text, 0)
    } else {
        cursor.prev_boundary(text, 0)
    };
    match next {
        Ok(Some(b)) => b,
        _ if forward => text.len(),
        _ => 0,
    }
}

fn char_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

/// Editing state of one field. All indices are byte offsets into `text`.
///
/// `selection.start` is the anchor and `selection.end` the caret, so the
/// range can run backwards.
#[derive(Clone, Debug)]
pub struct TextFieldState {
    pub text: String,
    pub selection: Range<usize>,
    /// Range of `text` still owned by the input method.
    pub composition: Option<Range<usize>>,
    /// Horizontal scroll of the content, in px.
    pub scroll_offset: f32,
    pub drag_anchor: Option<usize>,
    pub blink_start: Instant,
}

impl Default for TextFieldState {
    fn default() -> Self {
        Self::new()
    }
}

impl TextFieldState {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            selection: 0..0,
            composition: None,
            scroll_offset: 0.0,
            drag_anchor: None,
            blink_start: Instant::now(),
        }
    }

    /// State showing `text` with the caret at its end.
    pub fn with_text(text: &str) -> Self {
        let mut st = Self::new();
        st.set_text(text);
        st
    }

    /// Replaces everything, e.g. when the bound value changed outside of
    /// editing. Drops any composition.
    pub fn set_text(&mut self, text: &str) {
        self.text = sanitize_single_line(text);
        self.composition = None;
        self.drag_anchor = None;
        self.collapse_to(self.text.len());
    }

    fn clamp(&self, r: &Range<usize>) -> Range<usize> {
        let a = floor_char_boundary(&self.text, r.start);
        let b = floor_char_boundary(&self.text, r.end);
        a.min(b)..a.max(b)
    }

    fn collapse_to(&mut self, at: usize) {
        self.selection = at..at;
        self.reset_caret_blink();
    }

    /// Swaps `range` for already sanitized `with` and returns where the
    /// inserted text starts.
    fn splice(&mut self, range: Range<usize>, with: &str) -> usize {
        let range = self.clamp(&range);
        let start = range.start;
        self.text.replace_range(range, with);
        start
    }

    /// Ordered byte range of the selection.
    pub fn selection_range(&self) -> Range<usize> {
        self.clamp(&self.selection)
    }

    pub fn selected_text(&self) -> &str {
        self.text.get(self.selection_range()).unwrap_or_default()
    }

    pub fn caret_index(&self) -> usize {
        self.selection.end.min(self.text.len())
    }

    /// Typing: replaces the selection and leaves the caret after the input.
    pub fn insert_text(&mut self, text: &str) {
        let text = sanitize_single_line(text);
        let at = self.splice(self.selection.clone(), &text);
        self.collapse_to(at + text.len());
    }

    pub fn delete_backward(&mut self) {
        let sel = self.selection_range();
        let range = if sel.is_empty() {
            grapheme_step(&self.text, sel.start, false)..sel.start
        } else {
            sel
        };
        let at = self.splice(range, "");
        self.collapse_to(at);
    }

    pub fn delete_forward(&mut self) {
        let sel = self.selection_range();
        let range = if sel.is_empty() {
            sel.start..grapheme_step(&self.text, sel.start, true)
        } else {
            sel
        };
        let at = self.splice(range, "");
        self.collapse_to(at);
    }

    /// Moves the caret by `delta` graphemes.
    pub fn move_cursor(&mut self, delta: isize, extend_selection: bool) {
        let mut pos = self.caret_index();
        for _ in 0..delta.unsigned_abs() {
            pos = grapheme_step(&self.text, pos, delta > 0);
        }
        self.place_caret(pos, extend_selection);
    }

    pub fn move_home(&mut self, extend_selection: bool) {
        self.place_caret(0, extend_selection);
    }

    pub fn move_end(&mut self, extend_selection: bool) {
        self.place_caret(self.text.len(), extend_selection);
    }

    fn place_caret(&mut self, pos: usize, extend: bool) {
        if extend {
            self.selection.end = pos;
            self.reset_caret_blink();
        } else {
            self.collapse_to(pos);
        }
    }

    pub fn select_all(&mut self) {
        self.selection = 0..self.text.len();
        self.reset_caret_blink();
    }

    /// Shows preedit `text` in place of the current composition, or of the
    /// selection when none is active. `cursor` is in chars of `text`.
    pub fn set_composition(&mut self, text: String, cursor: Option<(usize, usize)>) {
        let text = sanitize_single_line(&text);
        if text.is_empty() {
            self.cancel_composition();
            return;
        }
        let target = self.composition.take().unwrap_or(self.selection.clone());
        let at = self.splice(target, &text);
        self.composition = Some(at..at + text.len());
        self.selection = match cursor {
            Some((c0, c1)) => at + char_offset(&text, c0)..at + char_offset(&text, c1),
            None => at + text.len()..at + text.len(),
        };
        self.reset_caret_blink();
    }

    pub fn commit_composition(&mut self, text: String) {
        match self.composition.take() {
            Some(r) => {
                let text = sanitize_single_line(&text);
                let at = self.splice(r, &text);
                self.collapse_to(at + text.len());
            }
            None => self.insert_text(&text),
        }
    }

    /// Removes the preedit text again.
    pub fn cancel_composition(&mut self) {
        if let Some(r) = self.composition.take() {
            let at = self.splice(r, "");
            self.collapse_to(at);
        }
    }

    /// Pointer press at `idx`. With `extend` the old anchor is kept.
    pub fn begin_drag(&mut self, idx: usize, extend: bool) {
        let idx = idx.min(self.text.len());
        let anchor = if extend { self.selection.start } else { idx };
        self.drag_anchor = Some(anchor);
        self.selection = anchor.min(idx)..anchor.max(idx);
        self.reset_caret_blink();
    }

    pub fn drag_to(&mut self, idx: usize) {
        if let Some(anchor) = self.drag_anchor {
            let idx = idx.min(self.text.len());
            self.selection = anchor.min(idx)..anchor.max(idx);
        }
        self.reset_caret_blink();
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    /// Scrolls just enough for `caret_x` (content px) to sit inside a
    /// viewport `inner_width` wide.
    pub fn ensure_caret_visible(&mut self, caret_x: f32, inner_width: f32) {
        let lo = self.scroll_offset + CARET_MARGIN;
        let hi = self.scroll_offset + inner_width - CARET_MARGIN;
        if caret_x < lo {
            self.scroll_offset = (caret_x - CARET_MARGIN).max(0.0);
        } else if caret_x > hi {
            self.scroll_offset = (caret_x - inner_width + CARET_MARGIN).max(0.0);
        }
    }

    pub fn reset_caret_blink(&mut self) {
        self.blink_start = Instant::now();
    }

    pub fn caret_visible(&self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.blink_start);
        (elapsed.as_millis() / BLINK.as_millis()) % 2 == 0
    }
}

/// Single-line filled text field. `value` is the text to show; edits made by
/// the platform are reported through `on_change` and must be fed back as the
/// next `value`.
pub fn TextField(
    label: impl Into<String>,
    value: impl Into<String>,
    modifier: Modifier,
    on_change: impl Fn(String) + 'static,
) -> View {
    let label = label.into();
    View::new(
        0,
        ViewKind::TextField {
            state_key: 0,
            value: value.into(),
            label: label.clone(),
            leading_icon: None,
            visual_transformation: VisualTransformation::None,
            keyboard_options: KeyboardOptions::default(),
            keyboard_actions: KeyboardActions::default(),
            on_change: Some(Rc::new(on_change)),
        },
    )
    .modifier(modifier)
    .semantics(Semantics::new(Role::TextField).label(label))
}

/// Field-only builders; they leave other views untouched.
pub trait TextFieldExt: Sized {
    fn leading_icon(self, glyph: IconGlyph) -> View;
    fn visual_transformation(self, vt: VisualTransformation) -> View;
    fn keyboard_options(self, opts: KeyboardOptions) -> View;
    fn keyboard_actions(self, actions: KeyboardActions) -> View;
    /// Persistent key for the platform-managed editing state.
    fn state_key(self, key: u64) -> View;
}

macro_rules! field_setter {
    ($name:ident, $field:ident, $ty:ty, $wrap:expr) => {
        fn $name(mut self, value: $ty) -> View {
            if let ViewKind::TextField { $field, .. } = &mut self.kind {
                *$field = $wrap(value);
            }
            self
        }
    };
}

impl TextFieldExt for View {
    field_setter!(leading_icon, leading_icon, IconGlyph, Some);
    field_setter!(visual_transformation, visual_transformation, VisualTransformation, |v| v);
    field_setter!(keyboard_options, keyboard_options, KeyboardOptions, |v| v);
    field_setter!(keyboard_actions, keyboard_actions, KeyboardActions, |v| v);
    field_setter!(state_key, state_key, u64, |v| v);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> TextFieldState {
        let mut st = TextFieldState::new();
        st.insert_text(text);
        st
    }

    #[test]
    fn typing_and_backspace() {
        let mut st = typed("alice");
        assert_eq!(st.selection, 5..5);
        st.delete_backward();
        assert_eq!((st.text.as_str(), st.selection.clone()), ("alic", 4..4));
        st.move_home(false);
        st.delete_backward();
        assert_eq!(st.text, "alic");
    }

    #[test]
    fn typing_replaces_selection() {
        let mut st = typed("Hello World");
        st.selection = 0..5;
        st.insert_text("Hi");
        assert_eq!(st.text, "Hi World");
        assert_eq!(st.selection, 2..2);

        st.select_all();
        assert_eq!(st.selected_text(), "Hi World");
        st.delete_forward();
        assert_eq!(st.text, "");
    }

    #[test]
    fn reversed_selection_is_ordered() {
        let mut st = typed("abcd");
        st.move_cursor(-3, true);
        assert_eq!(st.selection, 4..1);
        assert_eq!(st.selection_range(), 1..4);
        st.delete_backward();
        assert_eq!(st.text, "a");
    }

    #[test]
    fn preedit_then_commit() {
        let mut st = typed("Test ");
        st.set_composition("日本".into(), Some((0, 2)));
        assert_eq!(st.text, "Test 日本");
        assert_eq!(st.composition, Some(5..11));
        assert_eq!(st.selection, 5..11);

        st.set_composition("日本語".into(), None);
        assert_eq!(st.text, "Test 日本語");
        st.commit_composition("日本語".into());
        assert_eq!(st.text, "Test 日本語");
        assert!(st.composition.is_none());
        assert_eq!(st.caret_index(), st.text.len());
    }

    #[test]
    fn cancelled_preedit_leaves_no_trace() {
        let mut st = TextFieldState::with_text("ab");
        st.set_composition("xy".into(), None);
        assert_eq!(st.text, "abxy");
        st.cancel_composition();
        assert_eq!(st.text, "ab");
        assert_eq!(st.selection, 2..2);

        // An empty preedit also cancels.
        st.set_composition("z".into(), None);
        st.set_composition(String::new(), None);
        assert_eq!(st.text, "ab");
    }

    #[test]
    fn caret_moves_by_grapheme() {
        let mut st = typed("A👍🏽B");
        st.move_cursor(-1, false);
        assert_eq!(st.caret_index(), "A👍🏽".len());
        st.delete_backward();
        assert_eq!(st.text, "AB");
        assert_eq!(st.selection, 1..1);
        st.move_home(false);
        st.delete_forward();
        assert_eq!(st.text, "B");
        st.move_cursor(10, false);
        assert_eq!(st.caret_index(), 1);
    }

    #[test]
    fn control_chars_are_dropped() {
        let mut st = typed("a\nb\tc\u{7f}");
        assert_eq!(st.text, "abc");
        st.commit_composition("\r".into());
        assert_eq!(st.text, "abc");
    }

    #[test]
    fn drag_extends_from_anchor() {
        let mut st = TextFieldState::with_text("hello");
        st.begin_drag(1, false);
        st.drag_to(4);
        assert_eq!(st.selected_text(), "ell");
        st.end_drag();
        st.drag_to(0);
        assert_eq!(st.selected_text(), "ell");
    }

    #[test]
    fn caret_scrolls_into_view() {
        let mut st = TextFieldState::new();
        st.ensure_caret_visible(150.0, 100.0);
        assert_eq!(st.scroll_offset, 52.0);
        st.ensure_caret_visible(20.0, 100.0);
        assert_eq!(st.scroll_offset, 18.0);
    }

    #[test]
    fn caret_blinks_on_given_clock() {
        let st = TextFieldState::new();
        assert!(st.caret_visible(st.blink_start));
        assert!(!st.caret_visible(st.blink_start + Duration::from_millis(600)));
        assert!(st.caret_visible(st.blink_start + Duration::from_millis(1100)));
    }

    #[test]
    fn setters_ignore_other_views() {
        let v = View::new(0, ViewKind::Box).leading_icon(IconGlyph::Lock);
        assert!(matches!(v.kind, ViewKind::Box));
        let f = TextField("pw", "", Modifier::new(), |_| {}).state_key(7);
        assert!(matches!(f.kind, ViewKind::TextField { state_key: 7, .. }));
    }
}
