use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use crate::focus::{FocusManager, with_focus_manager};
use crate::scope::Scope;
use crate::semantics::SemNode;
use crate::{ImeAction, KeyboardType, Rect, Scene, View, ViewId, VisualTransformation};

thread_local! {
    pub static COMPOSER: RefCell<Composer> = RefCell::new(Composer::default());
    static FRAME_TIME: Cell<Option<Instant>> = const { Cell::new(None) };
}

#[derive(Default)]
pub struct Composer {
    pub slots: Vec<Box<dyn Any>>,
    pub cursor: usize,
    pub keyed_slots: HashMap<String, Box<dyn Any>>,
}

impl Composer {
    /// Forgets every remembered value. Values are dropped after the composer
    /// is released, so their destructors may compose or remember again.
    pub fn reset() {
        let old = COMPOSER.with(|c| std::mem::take(&mut *c.borrow_mut()));
        drop(old);
    }

    pub fn slot_count() -> usize {
        COMPOSER.with(|c| {
            let c = c.borrow();
            c.slots.len() + c.keyed_slots.len()
        })
    }
}

/// Slot-based remember (sequential composition only)
pub fn remember<T: 'static>(init: impl FnOnce() -> T) -> Rc<T> {
    let cursor = COMPOSER.with(|c| {
        let mut c = c.borrow_mut();
        let cursor = c.cursor;
        c.cursor += 1;
        cursor
    });

    let existing = COMPOSER.with(|c| {
        let c = c.borrow();
        c.slots.get(cursor).map(|slot| slot.downcast_ref::<Rc<T>>().cloned())
    });

    match existing {
        Some(Some(rc)) => rc,
        Some(None) => {
            log::warn!(
                "remember: slot {} type changed; replacing. \
                 If this is due to conditional composition, prefer remember_with_key.",
                cursor
            );
            // `init` may remember too, so it runs without the composer borrowed.
            let rc: Rc<T> = Rc::new(init());
            COMPOSER.with(|c| c.borrow_mut().slots[cursor] = Box::new(rc.clone()));
            rc
        }
        None => {
            let rc: Rc<T> = Rc::new(init());
            COMPOSER.with(|c| {
                let mut c = c.borrow_mut();
                if cursor < c.slots.len() {
                    c.slots[cursor] = Box::new(rc.clone());
                } else {
                    c.slots.push(Box::new(rc.clone()));
                }
            });
            rc
        }
    }
}

/// Key-based remember
pub fn remember_with_key<T: 'static>(key: impl Into<String>, init: impl FnOnce() -> T) -> Rc<T> {
    let key = key.into();
    let existing = COMPOSER.with(|c| {
        c.borrow()
            .keyed_slots
            .get(&key)
            .map(|slot| slot.downcast_ref::<Rc<T>>().cloned())
    });
    match existing {
        Some(Some(rc)) => return rc,
        Some(None) => log::warn!(
            "remember_with_key: key '{}' reused with a different type; replacing.",
            key
        ),
        None => {}
    }

    let rc: Rc<T> = Rc::new(init());
    COMPOSER.with(|c| c.borrow_mut().keyed_slots.insert(key, Box::new(rc.clone())));
    rc
}

pub fn remember_state<T: 'static>(init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
    remember(|| RefCell::new(init()))
}

pub fn remember_state_with_key<T: 'static>(
    key: impl Into<String>,
    init: impl FnOnce() -> T,
) -> Rc<RefCell<T>> {
    remember_with_key(key, || RefCell::new(init()))
}

/// Time of the frame being composed, or of the last composed frame while
/// input is dispatched between frames. `Instant::now()` before the first frame.
pub fn frame_time() -> Instant {
    FRAME_TIME.with(|t| t.get()).unwrap_or_else(Instant::now)
}

pub fn set_frame_time(now: Instant) {
    FRAME_TIME.with(|t| t.set(Some(now)));
}

/// Output of one composition: scene, input regions and semantics.
pub struct Frame {
    pub scene: Scene,
    pub hit_regions: Vec<HitRegion>,
    pub semantics_nodes: Vec<SemNode>,
    pub focus_chain: Vec<ViewId>,
}

#[derive(Clone, Default)]
pub struct HitRegion {
    pub id: ViewId,
    pub rect: Rect,
    pub on_click: Option<Rc<dyn Fn()>>,
    pub focusable: bool,
    pub on_text_change: Option<Rc<dyn Fn(String)>>,
    /// Runs the field's keyboard action; false when it has none for the action.
    pub on_ime_action: Option<Rc<dyn Fn(ImeAction) -> bool>>,
    pub ime_action: ImeAction,
    pub keyboard_type: KeyboardType,
    /// If this hit region belongs to a TextField, this persistent key is used
    /// for looking up platform-managed TextFieldState. Falls back to `id` if None.
    pub tf_state_key: Option<u64>,
    /// Where the text of a field starts, for placing the caret on click.
    pub text_rect: Option<Rect>,
    pub transformation: VisualTransformation,
}

impl HitRegion {
    pub fn is_text_field(&self) -> bool {
        self.on_text_change.is_some()
    }
}

impl std::fmt::Debug for HitRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HitRegion")
            .field("id", &self.id)
            .field("rect", &self.rect)
            .field("focusable", &self.focusable)
            .field("ime_action", &self.ime_action)
            .field("tf_state_key", &self.tf_state_key)
            .finish()
    }
}

/// Drives composition for one root.
///
/// Remembered slots and effect cleanups belong to the current mount. The
/// mount scope is created by `mount` (or lazily by the first `compose`) and
/// is disposed exactly once by `unmount` or on drop.
pub struct Scheduler {
    pub size: (u32, u32),
    focus: FocusManager,
    mount: Option<Scope>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            size: (1280, 800),
            focus: FocusManager::new(),
            mount: None,
        }
    }

    pub fn focus_manager(&self) -> &FocusManager {
        &self.focus
    }

    pub fn focused(&self) -> Option<ViewId> {
        self.focus.focused()
    }

    pub fn is_mounted(&self) -> bool {
        self.mount.is_some()
    }

    pub fn mount(&mut self) {
        if self.mount.is_none() {
            log::debug!("mount");
            self.mount = Some(Scope::new());
        }
    }

    /// Disposes the mount scope, forgets all slots and drops focus.
    pub fn unmount(&mut self) {
        let Some(scope) = self.mount.take() else {
            return;
        };
        log::debug!("unmount ({} disposers)", scope.disposer_count());
        scope.dispose();
        Composer::reset();
        self.focus.reset();
    }

    pub fn compose<F>(
        &mut self,
        now: Instant,
        mut build_root: F,
        layout_paint: impl FnOnce(&View, (u32, u32), &FocusManager) -> (Scene, Vec<HitRegion>, Vec<SemNode>),
    ) -> Frame
    where
        F: FnMut(&mut Scheduler) -> View,
    {
        let scope = self.mount.get_or_insert_with(Scope::new).clone();

        COMPOSER.with(|c| c.borrow_mut().cursor = 0);
        set_frame_time(now);

        let focus = self.focus.clone();
        let root = with_focus_manager(&focus, || scope.run(|| build_root(self)));
        let (scene, hits, sem) =
            with_focus_manager(&focus, || layout_paint(&root, self.size, &focus));

        let focus_chain: Vec<ViewId> =
            hits.iter().filter(|h| h.focusable).map(|h| h.id).collect();
        self.focus.set_chain(focus_chain.clone());

        Frame {
            scene,
            hit_regions: hits,
            semantics_nodes: sem,
            focus_chain,
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.unmount();
    }
}
