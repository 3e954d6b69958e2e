//! Per-thread bookkeeping of player resources.
//!
//! Players live on the UI thread, so the counters are thread-local. Tests
//! running on separate threads therefore see independent numbers.

use std::cell::Cell;
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerHandle(u64);

impl PlayerHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerStats {
    pub acquired: usize,
    pub released: usize,
    /// Dropped without `release()`.
    pub leaked: usize,
    /// `release()` called on an already released player.
    pub double_release: usize,
}

impl PlayerStats {
    /// Players created and not yet released or dropped.
    pub fn live(&self) -> usize {
        self.acquired.saturating_sub(self.released + self.leaked)
    }
}

thread_local! {
    static STATS: Cell<PlayerStats> = Cell::new(PlayerStats::default());
    static NEXT_HANDLE: Cell<u64> = const { Cell::new(1) };
}

pub fn stats() -> PlayerStats {
    STATS.with(Cell::get)
}

pub fn reset_stats() {
    STATS.with(|s| s.set(PlayerStats::default()));
}

fn update(f: impl FnOnce(&mut PlayerStats)) {
    STATS.with(|s| {
        let mut v = s.get();
        f(&mut v);
        s.set(v);
    });
}

pub(crate) fn acquire() -> PlayerHandle {
    let id = NEXT_HANDLE.with(|n| {
        let id = n.get();
        n.set(id + 1);
        id
    });
    update(|s| s.acquired += 1);
    PlayerHandle(id)
}

pub(crate) fn note_released() {
    update(|s| s.released += 1);
}

pub(crate) fn note_leaked() {
    update(|s| s.leaked += 1);
}

pub(crate) fn note_double_release() {
    update(|s| s.double_release += 1);
}
