use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::Dispose;

thread_local! {
    static CURRENT_SCOPE: RefCell<Option<Weak<ScopeInner>>> = const { RefCell::new(None) };
}

/// Owner of the cleanups registered while composing one mount.
///
/// A scope is disposed at most once: `dispose` runs child scopes first, then
/// this scope's disposers in registration order. Disposers registered after
/// disposal run immediately.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

struct ScopeInner {
    disposers: RefCell<Vec<Box<dyn FnOnce()>>>,
    children: RefCell<Vec<Scope>>,
    disposed: Cell<bool>,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                disposers: RefCell::new(Vec::new()),
                children: RefCell::new(Vec::new()),
                disposed: Cell::new(false),
            }),
        }
    }

    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        struct Restore(Option<Weak<ScopeInner>>);
        impl Drop for Restore {
            fn drop(&mut self) {
                let prev = self.0.take();
                CURRENT_SCOPE.with(|current| *current.borrow_mut() = prev);
            }
        }

        let prev = CURRENT_SCOPE.with(|current| {
            current
                .borrow_mut()
                .replace(Rc::downgrade(&self.inner))
        });
        let _restore = Restore(prev);
        f()
    }

    pub fn add_disposer(&self, disposer: impl FnOnce() + 'static) {
        if self.inner.disposed.get() {
            log::warn!("disposer registered on a disposed scope; running it now");
            disposer();
            return;
        }
        self.inner.disposers.borrow_mut().push(Box::new(disposer));
    }

    pub fn child(&self) -> Scope {
        let child = Scope::new();
        self.inner.children.borrow_mut().push(child.clone());
        child
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    pub fn disposer_count(&self) -> usize {
        self.inner.disposers.borrow().len()
    }

    pub fn dispose(self) {
        self.inner.run_disposers();
    }
}

impl ScopeInner {
    fn run_disposers(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children {
            child.dispose();
        }
        let disposers = std::mem::take(&mut *self.disposers.borrow_mut());
        for disposer in disposers {
            disposer();
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

pub fn current_scope() -> Option<Scope> {
    let inner = CURRENT_SCOPE.with(|current| current.borrow().as_ref()?.upgrade())?;
    Some(Scope { inner })
}

/// Runs `f` now and ties the returned cleanup to the current scope.
///
/// Outside of a composition there is nobody to run the cleanup, so it is
/// handed back to the caller instead.
pub fn scoped_effect(f: impl FnOnce() -> Dispose) -> Dispose {
    let cleanup = f();
    match current_scope() {
        Some(scope) => {
            let d = cleanup.clone();
            scope.add_disposer(move || d.run());
        }
        None => log::debug!("scoped_effect outside of a scope; caller owns the cleanup"),
    }
    cleanup
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.run_disposers();
    }
}
