//! # State, slots and effects
//!
//! Nimbus views are plain functions that return a `View` tree every frame.
//! State that must outlive one frame lives in composition slots, and side
//! effects register their cleanup with the mount scope:
//!
//! - `Signal<T>`: observable value with subscribers.
//! - `remember*`: storage bound to the current mount.
//! - `effect` / `scoped_effect` / `disposable_effect`: side effects with
//!   cleanup, run when the tree is unmounted.
//!
//! ## Remembered state
//!
//! ```rust
//! use nimbus_core::*;
//!
//! let mut sched = Scheduler::new();
//! let mut seen = Vec::new();
//! for _ in 0..2 {
//!     sched.compose(
//!         std::time::Instant::now(),
//!         |_| {
//!             let count = remember_state(|| 0);
//!             *count.borrow_mut() += 1;
//!             seen.push(*count.borrow());
//!             View::new(0, ViewKind::Box)
//!         },
//!         |_, _, _| (Scene::default(), vec![], vec![]),
//!     );
//! }
//! assert_eq!(seen, vec![1, 2]);
//! ```
//!
//! - `remember` and `remember_state` are order‑based: the Nth call in a
//!   composition always refers to the Nth stored value.
//! - `remember_with_key` and `remember_state_with_key` are key‑based and more
//!   stable across conditional branches.
//! - `Scheduler::unmount` forgets every slot; the next composition starts
//!   from fresh state.
//!
//! ## Effects and cleanup
//!
//! ```rust
//! use nimbus_core::*;
//!
//! fn Example(resource: u32) -> View {
//!     disposable_effect(resource, || {
//!         log::info!("acquire {resource}");
//!         on_unmount(move || log::info!("release {resource}"))
//!     });
//!     View::new(0, ViewKind::Box)
//! }
//! # let _ = Example;
//! ```
//!
//! - `scoped_effect` runs immediately and ties its `Dispose` to the mount
//!   scope.
//! - `disposable_effect` runs once per key; the previous cleanup runs before
//!   a re-run and once more at unmount.
//! - `Dispose::run` is idempotent.
#![allow(non_snake_case)]

pub mod color;
pub mod effects;
pub mod focus;
pub mod geometry;
pub mod image;
pub mod locals;
pub mod modifier;
pub mod prelude;
pub mod render_api;
pub mod runtime;
pub mod scope;
pub mod semantics;
pub mod signal;
pub mod text_input;
pub mod view;

#[cfg(test)]
mod tests;

pub use color::*;
pub use effects::*;
pub use focus::*;
pub use geometry::*;
pub use image::*;
pub use locals::*;
pub use modifier::*;
pub use prelude::*;
pub use render_api::*;
pub use runtime::*;
pub use scope::*;
pub use semantics::*;
pub use signal::*;
pub use text_input::*;
pub use view::*;
