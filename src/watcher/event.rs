use crate::runtime::{Shared, Signal};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The posted flag of an event watcher.
///
/// Posting is a store, not an increment: posts that arrive before the
/// dispatcher consumes the flag collapse into one delivery.
#[derive(Debug, Default)]
pub(crate) struct EventCell {
    posted: AtomicBool,
}

impl EventCell {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn post(&self) {
        self.posted.store(true, Ordering::Release);
    }

    /// Consumes the flag. Returns `true` at most once per post cycle.
    pub(crate) fn take(&self) -> bool {
        self.posted.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn clear(&self) {
        self.posted.store(false, Ordering::Release);
    }
}

/// Cross-thread handle used to post an event watcher.
///
/// [`post`](Self::post) is lock-free and allocation-free, so it may be
/// called from signal handlers and other contexts that must not block.
#[derive(Clone)]
pub struct EventPoster {
    pub(crate) cell: Arc<EventCell>,
    pub(crate) shared: Arc<Shared>,
}

impl EventPoster {
    /// Marks the event as posted and wakes the dispatcher.
    pub fn post(&self) {
        self.cell.post();
        self.shared.signal.set(Signal::EVENT);
    }
}
