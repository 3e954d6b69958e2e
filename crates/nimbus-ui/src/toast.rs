//! Short-lived notifications painted over the whole tree.
//!
//! ```rust
//! use nimbus_ui::toast::{Toast, ToastDuration};
//!
//! Toast::make_text("Saved", ToastDuration::Short).show();
//! assert_eq!(nimbus_ui::toast::shown_count(), 1);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use nimbus_core::frame_time;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastDuration {
    Short,
    Long,
}

impl ToastDuration {
    pub fn as_duration(self) -> Duration {
        match self {
            ToastDuration::Short => Duration::from_millis(2000),
            ToastDuration::Long => Duration::from_millis(3500),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Toast {
    pub message: String,
    pub duration: ToastDuration,
    pub shown_at: Option<Instant>,
}

thread_local! {
    static TOASTS: RefCell<Vec<Toast>> = const { RefCell::new(Vec::new()) };
    static SHOWN: Cell<usize> = const { Cell::new(0) };
    static OBSERVERS: RefCell<Vec<Rc<dyn Fn(&Toast)>>> = const { RefCell::new(Vec::new()) };
}

impl Toast {
    pub fn make_text(message: impl Into<String>, duration: ToastDuration) -> Self {
        Self {
            message: message.into(),
            duration,
            shown_at: None,
        }
    }

    /// Queues the toast, stamped with the current frame time.
    pub fn show(mut self) {
        let now = frame_time();
        self.shown_at = Some(now);
        log::debug!("toast: {}", self.message);
        let observers = OBSERVERS.with(|o| o.borrow().clone());
        for f in observers {
            f(&self);
        }
        TOASTS.with(|t| t.borrow_mut().push(self));
        SHOWN.with(|c| c.set(c.get() + 1));
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.shown_at.map(|t| t + self.duration.as_duration())
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.expires_at().is_some_and(|end| now < end)
    }
}

/// Toasts still visible at `now`, oldest first.
pub fn active(now: Instant) -> Vec<Toast> {
    TOASTS.with(|t| {
        t.borrow()
            .iter()
            .filter(|toast| toast.is_active(now))
            .cloned()
            .collect()
    })
}

/// Drops expired toasts; returns how many remain.
pub fn prune(now: Instant) -> usize {
    TOASTS.with(|t| {
        let mut t = t.borrow_mut();
        t.retain(|toast| toast.is_active(now));
        t.len()
    })
}

/// Number of toasts shown on this thread since start (or the last `reset`).
pub fn shown_count() -> usize {
    SHOWN.with(|c| c.get())
}

/// Calls `f` synchronously from every later `show`, until `reset`.
pub fn on_show(f: impl Fn(&Toast) + 'static) {
    OBSERVERS.with(|o| o.borrow_mut().push(Rc::new(f)));
}

pub fn reset() {
    TOASTS.with(|t| t.borrow_mut().clear());
    SHOWN.with(|c| c.set(0));
    OBSERVERS.with(|o| o.borrow_mut().clear());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toasts_expire_after_their_duration() {
        reset();
        let t0 = Instant::now();
        nimbus_core::set_frame_time(t0);
        Toast::make_text("short", ToastDuration::Short).show();
        Toast::make_text("long", ToastDuration::Long).show();
        assert_eq!(shown_count(), 2);

        assert_eq!(active(t0 + Duration::from_millis(1999)).len(), 2);
        let later = active(t0 + Duration::from_millis(2500));
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].message, "long");

        assert_eq!(prune(t0 + Duration::from_millis(3500)), 0);
        assert_eq!(shown_count(), 2);
    }

    #[test]
    fn observers_see_each_toast_until_reset() {
        reset();
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            on_show(move |t| seen.borrow_mut().push(t.message.clone()));
        }
        Toast::make_text("one", ToastDuration::Short).show();
        reset();
        Toast::make_text("two", ToastDuration::Short).show();
        assert_eq!(*seen.borrow(), vec!["one".to_string()]);
    }
}
