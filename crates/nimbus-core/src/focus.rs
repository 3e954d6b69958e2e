//! Keyboard focus.
//!
//! The `Scheduler` owns one [`FocusManager`] per mount. During composition it
//! is reachable through [`local_focus_manager`], so callbacks built by a
//! widget can capture it and clear or move focus later. A [`FocusRequester`]
//! is a handle that a field binds to itself with
//! `Modifier::focus_requester`; anyone holding a clone can then focus that
//! field.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ViewId;

thread_local! {
    static CURRENT_FOCUS: RefCell<Option<FocusManager>> = const { RefCell::new(None) };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusDirection {
    Next,
    Previous,
}

#[derive(Default)]
struct FocusInner {
    focused: Option<ViewId>,
    chain: Vec<ViewId>,
}

/// Shared handle to the focus state of one mounted tree.
#[derive(Clone, Default)]
pub struct FocusManager(Rc<RefCell<FocusInner>>);

impl FocusManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> Option<ViewId> {
        self.0.borrow().focused
    }

    pub fn is_focused(&self, id: ViewId) -> bool {
        self.focused() == Some(id)
    }

    pub fn request(&self, id: ViewId) {
        self.0.borrow_mut().focused = Some(id);
    }

    pub fn clear_focus(&self) {
        self.0.borrow_mut().focused = None;
    }

    /// Moves along the focus chain, wrapping at both ends. With nothing
    /// focused, `Next` lands on the first entry and `Previous` on the last.
    /// Returns false when the chain is empty.
    pub fn move_focus(&self, direction: FocusDirection) -> bool {
        let mut inner = self.0.borrow_mut();
        let n = inner.chain.len();
        if n == 0 {
            return false;
        }
        let pos = inner
            .focused
            .and_then(|id| inner.chain.iter().position(|&c| c == id));
        let idx = match (direction, pos) {
            (FocusDirection::Next, Some(i)) => (i + 1) % n,
            (FocusDirection::Previous, Some(i)) => (i + n - 1) % n,
            (FocusDirection::Next, None) => 0,
            (FocusDirection::Previous, None) => n - 1,
        };
        let id = inner.chain[idx];
        inner.focused = Some(id);
        true
    }

    pub fn focus_chain(&self) -> Vec<ViewId> {
        self.0.borrow().chain.clone()
    }

    /// Installs the chain of the latest frame. Focus on an id that no longer
    /// exists is dropped.
    pub fn set_chain(&self, chain: Vec<ViewId>) {
        let mut inner = self.0.borrow_mut();
        if let Some(f) = inner.focused
            && !chain.contains(&f)
        {
            log::debug!("focused view {f} left the tree; clearing focus");
            inner.focused = None;
        }
        inner.chain = chain;
    }

    pub fn reset(&self) {
        let mut inner = self.0.borrow_mut();
        inner.focused = None;
        inner.chain.clear();
    }

    pub fn ptr_eq(&self, other: &FocusManager) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for FocusManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("FocusManager")
            .field("focused", &inner.focused)
            .field("chain", &inner.chain)
            .finish()
    }
}

pub fn with_focus_manager<R>(fm: &FocusManager, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<FocusManager>);
    impl Drop for Restore {
        fn drop(&mut self) {
            let prev = self.0.take();
            CURRENT_FOCUS.with(|c| *c.borrow_mut() = prev);
        }
    }
    let prev = CURRENT_FOCUS.with(|c| c.borrow_mut().replace(fm.clone()));
    let _restore = Restore(prev);
    f()
}

/// The focus manager of the tree being composed. Outside of a composition a
/// detached manager is returned, and changes to it affect nothing.
pub fn local_focus_manager() -> FocusManager {
    CURRENT_FOCUS.with(|c| c.borrow().clone()).unwrap_or_else(|| {
        log::warn!("local_focus_manager() called outside of composition");
        FocusManager::new()
    })
}

#[derive(Default)]
struct RequesterInner {
    target: Option<ViewId>,
    manager: Option<FocusManager>,
}

/// Handle that focuses the view it is attached to.
#[derive(Clone, Default)]
pub struct FocusRequester(Rc<RefCell<RequesterInner>>);

impl FocusRequester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by layout for the view carrying this requester.
    pub fn attach(&self, id: ViewId, manager: &FocusManager) {
        let mut inner = self.0.borrow_mut();
        inner.target = Some(id);
        inner.manager = Some(manager.clone());
    }

    pub fn target(&self) -> Option<ViewId> {
        self.0.borrow().target
    }

    /// Focuses the attached view. Before the first layout pass there is
    /// nothing to focus and the request is dropped.
    pub fn request_focus(&self) -> bool {
        let inner = self.0.borrow();
        match (inner.target, inner.manager.as_ref()) {
            (Some(id), Some(fm)) => {
                fm.request(id);
                true
            }
            _ => {
                log::warn!("request_focus() on a FocusRequester that is not attached to a view");
                false
            }
        }
    }
}

impl PartialEq for FocusRequester {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for FocusRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusRequester")
            .field("target", &self.target())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_focus_wraps() {
        let fm = FocusManager::new();
        fm.set_chain(vec![3, 7, 9]);
        assert!(fm.move_focus(FocusDirection::Next));
        assert_eq!(fm.focused(), Some(3));
        fm.request(9);
        fm.move_focus(FocusDirection::Next);
        assert_eq!(fm.focused(), Some(3));
        fm.move_focus(FocusDirection::Previous);
        assert_eq!(fm.focused(), Some(9));
    }

    #[test]
    fn empty_chain_does_nothing() {
        let fm = FocusManager::new();
        assert!(!fm.move_focus(FocusDirection::Next));
        assert_eq!(fm.focused(), None);
    }

    #[test]
    fn stale_focus_is_dropped_with_new_chain() {
        let fm = FocusManager::new();
        fm.set_chain(vec![1, 2]);
        fm.request(2);
        fm.set_chain(vec![1]);
        assert_eq!(fm.focused(), None);
    }

    #[test]
    fn unattached_requester_is_a_noop() {
        let r = FocusRequester::new();
        assert!(!r.request_focus());

        let fm = FocusManager::new();
        r.attach(5, &fm);
        assert!(r.request_focus());
        assert_eq!(fm.focused(), Some(5));
        assert_eq!(r.clone(), r);
    }
}
