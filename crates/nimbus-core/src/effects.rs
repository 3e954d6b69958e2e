use std::cell::RefCell;
use std::rc::Rc;

use crate::{remember, scoped_effect};

#[derive(Clone)]
pub struct Dispose(Rc<RefCell<Option<Box<dyn FnOnce()>>>>);

impl Dispose {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    pub fn noop() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }

    /// Runs at most once (safe to call multiple times).
    pub fn run(&self) {
        let f = self.0.borrow_mut().take();
        if let Some(f) = f {
            f()
        }
    }

    pub fn is_spent(&self) -> bool {
        self.0.borrow().is_none()
    }
}

impl std::fmt::Debug for Dispose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Dispose").field(&self.is_spent()).finish()
    }
}

/// Runs `f()` immediately and returns its `Dispose`, also registered with the
/// current scope when there is one.
pub fn effect<F>(f: F) -> Dispose
where
    F: FnOnce() -> Dispose,
{
    scoped_effect(f)
}

/// Helper to register cleanup inside effect.
pub fn on_unmount(f: impl FnOnce() + 'static) -> Dispose {
    Dispose::new(f)
}

/// Runs `effect` the first time and again whenever `key` changes; the previous
/// cleanup runs before each re-run and once more when the scope is disposed.
pub fn disposable_effect<K: PartialEq + Clone + 'static>(
    key: K,
    effect: impl FnOnce() -> Dispose,
) {
    let last_key = remember(|| RefCell::new(None::<K>));
    let cleanup_slot = remember(|| RefCell::new(None::<Dispose>));
    let installed = remember(|| RefCell::new(false));

    // One unmount hook per call site.
    if !*installed.borrow() {
        *installed.borrow_mut() = true;
        let cleanup_slot = cleanup_slot.clone();
        scoped_effect(move || {
            on_unmount(move || {
                let d = cleanup_slot.borrow_mut().take();
                if let Some(d) = d {
                    d.run();
                }
            })
        });
    }

    let changed = last_key.borrow().as_ref() != Some(&key);
    if changed {
        *last_key.borrow_mut() = Some(key);

        let previous = cleanup_slot.borrow_mut().take();
        if let Some(d) = previous {
            d.run();
        }

        let d = effect();
        *cleanup_slot.borrow_mut() = Some(d);
    }
}

/// Runs on every recomposition.
pub fn side_effect(effect: impl FnOnce()) {
    effect();
}
