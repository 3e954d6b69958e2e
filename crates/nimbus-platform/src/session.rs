//! Event dispatch shared by every runner.
//!
//! A [`Session`] owns the scheduler, the platform-managed text field states
//! and the last composed [`Frame`]. Runners translate their native events
//! into calls on it; tests drive it directly, without a window or a GPU.
//!
//! Events always act on the last composed frame. Call
//! [`frame_at`](Session::frame_at) after dispatching to see their effect.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Instant;

use nimbus_core::*;
use nimbus_ui::textfield::{TF_FONT_DP, measure_text};
use nimbus_ui::{Interactions, TextFieldState, TextFieldStates, layout_and_paint, toast};

/// Portrait phone, in px at density 1.
pub const DEFAULT_SIZE: (u32, u32) = (412, 915);

/// Where and how the soft keyboard should attach to the focused field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImeTarget {
    pub rect: Rect,
    pub keyboard_type: KeyboardType,
}

pub struct Session {
    root: Box<dyn FnMut(&mut Scheduler) -> View>,
    sched: Scheduler,
    density: Density,
    text_scale: TextScale,
    textfield_states: TextFieldStates,
    frame: Option<Frame>,
    pressed: HashSet<ViewId>,
    capture: Option<ViewId>,
    composing: bool,
}

impl Session {
    pub fn new(root: impl FnMut(&mut Scheduler) -> View + 'static) -> Self {
        let mut sched = Scheduler::new();
        sched.size = DEFAULT_SIZE;
        Self {
            root: Box::new(root),
            sched,
            density: Density::default(),
            text_scale: TextScale::default(),
            textfield_states: TextFieldStates::new(),
            frame: None,
            pressed: HashSet::new(),
            capture: None,
            composing: false,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.set_size(width, height);
        self
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.sched.size = (width.max(1), height.max(1));
    }

    pub fn size(&self) -> (u32, u32) {
        self.sched.size
    }

    /// dp→px factor, the window scale factor on every platform we run on.
    pub fn set_density(&mut self, scale: f32) {
        if scale.is_finite() && scale > 0.0 {
            self.density = Density { scale };
        }
    }

    pub fn set_text_scale(&mut self, scale: f32) {
        if scale.is_finite() && scale > 0.0 {
            self.text_scale = TextScale(scale);
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.sched
    }

    pub fn focus_manager(&self) -> &FocusManager {
        self.sched.focus_manager()
    }

    pub fn is_mounted(&self) -> bool {
        self.sched.is_mounted()
    }

    pub fn mount(&mut self) {
        self.sched.mount();
    }

    /// Disposes the screen: disposers run, remembered state and editing
    /// state are dropped. The next frame mounts a fresh screen.
    pub fn unmount(&mut self) {
        self.sched.unmount();
        self.textfield_states.clear();
        self.frame = None;
        self.pressed.clear();
        self.capture = None;
        self.composing = false;
    }

    /// Composes, lays out and paints one frame at `now`.
    pub fn frame_at(&mut self, now: Instant) -> &Frame {
        toast::prune(now);
        let interactions = Interactions {
            hover: None,
            pressed: self.pressed.clone(),
        };
        let root = &mut self.root;
        let states = &mut self.textfield_states;
        let sched = &mut self.sched;
        let frame = with_density(self.density, || {
            with_text_scale(self.text_scale, || {
                sched.compose(
                    now,
                    |s| root(s),
                    |view, size, focus| layout_and_paint(view, size, states, &interactions, focus),
                )
            })
        });
        self.frame.insert(frame)
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn semantics(&self) -> &[SemNode] {
        self.frame
            .as_ref()
            .map(|f| f.semantics_nodes.as_slice())
            .unwrap_or(&[])
    }

    pub fn find(&self, role: Role, label: &str) -> Option<&SemNode> {
        self.semantics()
            .iter()
            .find(|n| n.role == role && n.label.as_deref() == Some(label))
    }

    fn hit(&self, id: ViewId) -> Option<&HitRegion> {
        self.frame.as_ref()?.hit_regions.iter().find(|h| h.id == id)
    }

    fn top_hit(&self, pos: Vec2) -> Option<&HitRegion> {
        self.frame
            .as_ref()?
            .hit_regions
            .iter()
            .rev()
            .find(|h| h.rect.contains(pos))
    }

    fn focused_field(&self) -> Option<HitRegion> {
        let id = self.focused()?;
        self.hit(id).filter(|h| h.is_text_field()).cloned()
    }

    fn state_for(&mut self, hit: &HitRegion) -> Rc<RefCell<TextFieldState>> {
        let key = hit.tf_state_key.unwrap_or(hit.id);
        self.textfield_states
            .entry(key)
            .or_insert_with(|| Rc::new(RefCell::new(TextFieldState::new())))
            .clone()
    }

    fn font_px(&self) -> f32 {
        TF_FONT_DP * self.density.scale * self.text_scale.0
    }

    fn caret_into_view(&self, st: &mut TextFieldState, hit: &HitRegion) {
        let Some(inner) = hit.text_rect else {
            return;
        };
        let vt = hit.transformation;
        let display = vt.filter(&st.text);
        let caret = vt.original_to_transformed(&st.text, st.selection.end);
        let x = measure_text(&display, self.font_px()).x_at(caret);
        st.ensure_caret_visible(x, inner.w);
    }

    /// Byte index in the field's text nearest to the pointer at `x`.
    fn caret_index_at(&self, st: &TextFieldState, hit: &HitRegion, x: f32) -> usize {
        let inner_x = hit.text_rect.map_or(hit.rect.x, |r| r.x);
        let vt = hit.transformation;
        let display = vt.filter(&st.text);
        let content_x = (x - inner_x + st.scroll_offset).max(0.0);
        let idx = measure_text(&display, self.font_px()).byte_near(content_x);
        vt.transformed_to_original(&st.text, idx)
    }

    /// Applies `f` to the focused field and reports a changed text through
    /// the field's change callback.
    fn edit(&mut self, f: impl FnOnce(&mut TextFieldState)) -> bool {
        let Some(hit) = self.focused_field() else {
            return false;
        };
        let state = self.state_for(&hit);
        let changed = {
            let mut st = state.borrow_mut();
            let before = st.text.clone();
            f(&mut st);
            st.reset_caret_blink();
            self.caret_into_view(&mut st, &hit);
            (st.text != before).then(|| st.text.clone())
        };
        if let Some(text) = changed
            && let Some(cb) = &hit.on_text_change
        {
            cb(text);
        }
        true
    }

    // Focus

    pub fn focused(&self) -> Option<ViewId> {
        self.sched.focused()
    }

    pub fn focused_node(&self) -> Option<&SemNode> {
        let id = self.focused()?;
        self.semantics().iter().find(|n| n.id == id)
    }

    pub fn focused_label(&self) -> Option<&str> {
        self.focused_node()?.label.as_deref()
    }

    pub fn focus(&mut self, role: Role, label: &str) -> bool {
        let Some(id) = self.find(role, label).map(|n| n.id) else {
            log::warn!("focus: no {role:?} labelled {label:?}");
            return false;
        };
        self.end_composition();
        self.focus_manager().request(id);
        true
    }

    pub fn focus_next(&mut self) -> bool {
        self.end_composition();
        self.focus_manager().move_focus(FocusDirection::Next)
    }

    pub fn focus_previous(&mut self) -> bool {
        self.end_composition();
        self.focus_manager().move_focus(FocusDirection::Previous)
    }

    pub fn clear_focus(&mut self) {
        self.end_composition();
        self.focus_manager().clear_focus();
    }

    fn end_composition(&mut self) {
        if self.composing {
            self.ime_cancel();
        }
    }

    /// Where the soft keyboard belongs, if a text field has focus.
    pub fn ime_target(&self) -> Option<ImeTarget> {
        self.focused_field().map(|h| ImeTarget {
            rect: h.rect,
            keyboard_type: h.keyboard_type,
        })
    }

    // Pointer

    /// Press at `pos`. Text fields take focus and place the caret; a press
    /// outside every region clears focus.
    pub fn pointer_down(&mut self, pos: Vec2, extend_selection: bool) -> bool {
        let Some(hit) = self.top_hit(pos).cloned() else {
            self.clear_focus();
            return false;
        };
        self.capture = Some(hit.id);
        self.pressed.insert(hit.id);

        if hit.is_text_field() {
            if self.focused() != Some(hit.id) {
                self.end_composition();
            }
            self.focus_manager().request(hit.id);
            let state = self.state_for(&hit);
            let mut st = state.borrow_mut();
            let idx = self.caret_index_at(&st, &hit, pos.x);
            st.begin_drag(idx, extend_selection);
            self.caret_into_view(&mut st, &hit);
        }
        true
    }

    pub fn pointer_move(&mut self, pos: Vec2) {
        let Some(hit) = self
            .capture
            .and_then(|id| self.hit(id))
            .filter(|h| h.is_text_field())
            .cloned()
        else {
            return;
        };
        let state = self.state_for(&hit);
        let mut st = state.borrow_mut();
        let idx = self.caret_index_at(&st, &hit, pos.x);
        st.drag_to(idx);
        self.caret_into_view(&mut st, &hit);
    }

    /// Release at `pos`. Clicks the captured region if the pointer is still
    /// inside it; returns whether a click callback ran.
    pub fn pointer_up(&mut self, pos: Vec2) -> bool {
        let Some(id) = self.capture.take() else {
            return false;
        };
        self.pressed.remove(&id);
        let Some(hit) = self.hit(id).cloned() else {
            return false;
        };
        if hit.is_text_field() {
            self.state_for(&hit).borrow_mut().end_drag();
        }
        if hit.rect.contains(pos)
            && let Some(cb) = &hit.on_click
        {
            cb();
            return true;
        }
        false
    }

    /// Touch cancelled or pointer left the window mid-press.
    pub fn cancel_pointer(&mut self) {
        self.capture = None;
        self.pressed.clear();
    }

    pub fn tap_at(&mut self, pos: Vec2) -> bool {
        let hit = self.pointer_down(pos, false);
        let clicked = self.pointer_up(pos);
        hit || clicked
    }

    /// Taps the center of the node with `role` and `label`.
    pub fn click(&mut self, role: Role, label: &str) -> bool {
        let Some(center) = self.find(role, label).map(|n| n.rect.center()) else {
            log::warn!("click: no {role:?} labelled {label:?}");
            return false;
        };
        self.tap_at(center)
    }

    // Keyboard

    pub fn type_text(&mut self, text: &str) -> bool {
        self.edit(|st| st.insert_text(text))
    }

    pub fn backspace(&mut self) -> bool {
        self.edit(TextFieldState::delete_backward)
    }

    pub fn delete(&mut self) -> bool {
        self.edit(TextFieldState::delete_forward)
    }

    pub fn move_cursor(&mut self, delta: isize, extend_selection: bool) -> bool {
        self.edit(|st| st.move_cursor(delta, extend_selection))
    }

    pub fn home(&mut self, extend_selection: bool) -> bool {
        self.edit(|st| st.move_home(extend_selection))
    }

    pub fn end(&mut self, extend_selection: bool) -> bool {
        self.edit(|st| st.move_end(extend_selection))
    }

    pub fn select_all(&mut self) -> bool {
        self.edit(TextFieldState::select_all)
    }

    /// Enter: the IME action of a focused field, or a click on a focused
    /// button.
    pub fn press_enter(&mut self) -> bool {
        let Some(hit) = self.focused().and_then(|id| self.hit(id)).cloned() else {
            return false;
        };
        if hit.is_text_field() {
            return self.perform_ime_action(hit.ime_action);
        }
        if let Some(cb) = &hit.on_click {
            cb();
            return true;
        }
        false
    }

    // IME

    pub fn is_composing(&self) -> bool {
        self.composing
    }

    /// Preedit text; `cursor` is a char range inside `text`.
    pub fn ime_preedit(&mut self, text: &str, cursor: Option<(usize, usize)>) -> bool {
        let composing = !text.is_empty();
        let applied = self.edit(|st| st.set_composition(text.to_string(), cursor));
        self.composing = applied && composing;
        applied
    }

    pub fn ime_commit(&mut self, text: &str) -> bool {
        self.composing = false;
        self.edit(|st| st.commit_composition(text.to_string()))
    }

    pub fn ime_cancel(&mut self) -> bool {
        self.composing = false;
        self.edit(|st| {
            if st.composition.is_some() {
                st.cancel_composition();
            }
        })
    }

    /// The focused field's own IME action key.
    pub fn ime_action(&mut self) -> bool {
        match self.focused_field() {
            Some(hit) => self.perform_ime_action(hit.ime_action),
            None => false,
        }
    }

    /// Runs the field's keyboard action for `action`. Without one, Next and
    /// Previous move focus along the chain and other actions do nothing.
    pub fn perform_ime_action(&mut self, action: ImeAction) -> bool {
        let Some(hit) = self.focused_field() else {
            return false;
        };
        if self.composing {
            // Keep what the keyboard was composing.
            let state = self.state_for(&hit);
            let pending = {
                let st = state.borrow();
                st.composition
                    .clone()
                    .and_then(|r| st.text.get(r).map(str::to_string))
            };
            self.ime_commit(&pending.unwrap_or_default());
        }
        log::debug!("ime action {action:?} on {}", hit.id);
        if hit.on_ime_action.as_ref().is_some_and(|f| f(action)) {
            return true;
        }
        match action {
            ImeAction::Next => self.focus_manager().move_focus(FocusDirection::Next),
            ImeAction::Previous => self.focus_manager().move_focus(FocusDirection::Previous),
            _ => false,
        }
    }

    // Queries

    /// Raw text of the field labelled `label`.
    pub fn field_text(&self, label: &str) -> Option<String> {
        let node = self.find(Role::TextField, label)?;
        let hit = self.hit(node.id)?;
        let key = hit.tf_state_key.unwrap_or(hit.id);
        self.textfield_states
            .get(&key)
            .map(|st| st.borrow().text.clone())
    }

    /// What the field labelled `label` shows, after its visual transformation.
    pub fn display_text(&self, label: &str) -> Option<String> {
        self.find(Role::TextField, label)?.value.clone()
    }

    /// True while something on screen changes without input: a toast is
    /// up or a caret is blinking.
    pub fn wants_redraw(&self, now: Instant) -> bool {
        !toast::active(now).is_empty() || self.focused_field().is_some()
    }
}

/// Converts a preedit cursor given in bytes of `text` (as winit reports it)
/// into the char range `Session::ime_preedit` takes.
pub fn preedit_cursor_chars(text: &str, cursor: Option<(usize, usize)>) -> Option<(usize, usize)> {
    let to_char = |byte: usize| {
        text.char_indices()
            .take_while(|(i, _)| *i < byte.min(text.len()))
            .count()
    };
    cursor.map(|(a, b)| (to_char(a), to_char(b)))
}

impl Drop for Session {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_ui::*;
    use std::cell::Cell;
    use std::time::Duration;

    struct Probe {
        clicks: Rc<Cell<u32>>,
        done: Rc<Cell<u32>>,
        disposed: Rc<Cell<u32>>,
    }

    fn form() -> (Session, Probe) {
        let clicks = Rc::new(Cell::new(0));
        let done = Rc::new(Cell::new(0));
        let disposed = Rc::new(Cell::new(0));
        let probe = Probe {
            clicks: clicks.clone(),
            done: done.clone(),
            disposed: disposed.clone(),
        };
        let session = Session::new(move |_s| {
            let name = remember_state(String::new);
            let code = remember_state(String::new);
            let d = disposed.clone();
            disposable_effect((), move || {
                let d = d.clone();
                Dispose::new(move || d.set(d.get() + 1))
            });
            let (n1, c1, clicks, done) = (name.clone(), code.clone(), clicks.clone(), done.clone());
            Column(Modifier::new().fill_max_size().padding(16.0).gap(8.0)).child((
                TextField(
                    "name",
                    name.borrow().as_str(),
                    Modifier::new().fill_max_width(),
                    move |t| *n1.borrow_mut() = t,
                )
                .keyboard_options(KeyboardOptions::new().ime_action(ImeAction::Next)),
                TextField(
                    "code",
                    code.borrow().as_str(),
                    Modifier::new().fill_max_width(),
                    move |t| *c1.borrow_mut() = t,
                )
                .visual_transformation(VisualTransformation::password())
                .keyboard_options(
                    KeyboardOptions::new()
                        .keyboard_type(KeyboardType::Password)
                        .ime_action(ImeAction::Done),
                )
                .keyboard_actions(KeyboardActions::new().on_done(move || done.set(done.get() + 1))),
                Button("GO", move || clicks.set(clicks.get() + 1))
                    .modifier(Modifier::new().fill_max_width()),
            ))
        });
        (session, probe)
    }

    #[test]
    fn typing_updates_the_composed_value() {
        let (mut s, _) = form();
        let t0 = Instant::now();
        s.frame_at(t0);
        assert!(s.click(Role::TextField, "name"));
        assert_eq!(s.focused_label(), Some("name"));
        s.type_text("ab");
        s.type_text("c\n");
        s.frame_at(t0);
        assert_eq!(s.display_text("name").as_deref(), Some("abc"));
        s.backspace();
        s.frame_at(t0);
        assert_eq!(s.field_text("name").as_deref(), Some("ab"));
    }

    #[test]
    fn default_next_moves_along_the_chain() {
        let (mut s, probe) = form();
        let t0 = Instant::now();
        s.frame_at(t0);
        s.focus(Role::TextField, "name");
        assert!(s.ime_action());
        assert_eq!(s.focused_label(), Some("code"));
        assert_eq!(
            s.ime_target().map(|t| t.keyboard_type),
            Some(KeyboardType::Password)
        );
        assert!(s.press_enter());
        assert_eq!(probe.done.get(), 1);
    }

    #[test]
    fn password_field_shows_mask() {
        let (mut s, _) = form();
        let t0 = Instant::now();
        s.frame_at(t0);
        s.focus(Role::TextField, "code");
        s.type_text("pa ss");
        s.frame_at(t0);
        assert_eq!(s.display_text("code").as_deref(), Some("•••••"));
        assert_eq!(s.field_text("code").as_deref(), Some("pa ss"));
    }

    #[test]
    fn ime_composition_commits_into_the_field() {
        let (mut s, _) = form();
        let t0 = Instant::now();
        s.frame_at(t0);
        s.focus(Role::TextField, "name");
        s.type_text("x");
        s.ime_preedit("ka", None);
        s.frame_at(t0);
        assert_eq!(s.display_text("name").as_deref(), Some("xka"));
        s.ime_commit("か");
        s.frame_at(t0);
        assert_eq!(s.display_text("name").as_deref(), Some("xか"));
        s.ime_preedit("zz", None);
        s.ime_cancel();
        s.frame_at(t0);
        assert_eq!(s.display_text("name").as_deref(), Some("xか"));
    }

    #[test]
    fn button_click_keeps_field_focus_and_tap_outside_clears_it() {
        let (mut s, probe) = form();
        let t0 = Instant::now();
        s.frame_at(t0);
        s.click(Role::TextField, "name");
        assert!(s.click(Role::Button, "GO"));
        assert_eq!(probe.clicks.get(), 1);
        assert_eq!(s.focused_label(), Some("name"));

        let (w, h) = s.size();
        assert!(!s.tap_at(Vec2::new(w as f32 - 1.0, h as f32 - 1.0)));
        assert_eq!(s.focused(), None);
    }

    #[test]
    fn release_outside_does_not_click() {
        let (mut s, probe) = form();
        s.frame_at(Instant::now());
        let center = s.find(Role::Button, "GO").unwrap().rect.center();
        s.pointer_down(center, false);
        assert!(!s.pointer_up(Vec2::new(center.x, 5000.0)));
        assert_eq!(probe.clicks.get(), 0);
    }

    #[test]
    fn unmount_disposes_and_resets_fields() {
        let (mut s, probe) = form();
        let t0 = Instant::now();
        s.frame_at(t0);
        s.focus(Role::TextField, "name");
        s.type_text("kept?");
        s.frame_at(t0);
        s.unmount();
        assert_eq!(probe.disposed.get(), 1);
        assert_eq!(s.focused(), None);
        s.unmount();
        assert_eq!(probe.disposed.get(), 1);

        s.frame_at(t0 + Duration::from_millis(16));
        assert_eq!(s.display_text("name").as_deref(), Some(""));
        drop(s);
        assert_eq!(probe.disposed.get(), 2);
    }

    #[test]
    fn preedit_cursor_counts_chars() {
        assert_eq!(preedit_cursor_chars("かな", Some((3, 6))), Some((1, 2)));
        assert_eq!(preedit_cursor_chars("ab", Some((9, 9))), Some((2, 2)));
        assert_eq!(preedit_cursor_chars("ab", None), None);
    }

    #[test]
    fn redraw_is_wanted_while_toast_is_up() {
        let (mut s, _) = form();
        let t0 = Instant::now();
        s.frame_at(t0);
        assert!(!s.wants_redraw(t0));
        toast::Toast::make_text("hi", toast::ToastDuration::Short).show();
        assert!(s.wants_redraw(t0));
        assert!(!s.wants_redraw(t0 + Duration::from_secs(3)));
    }
}
