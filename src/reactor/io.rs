use crate::runtime::{FlagGroup, Signal};
use crate::watcher::Events;
use crate::watcher::io::Pending;

use std::os::fd::RawFd;
use std::sync::Arc;

/// An I/O watcher as seen by the poller thread.
///
/// Entries are added when an I/O watcher starts and removed when it stops.
/// The readiness cell and the flag group are shared with the owning context.
#[derive(Clone)]
pub(crate) struct PollEntry {
    /// Unique per watcher start; identifies the entry across list updates.
    pub(crate) token: u64,

    pub(crate) fd: RawFd,

    pub(crate) interest: Events,

    pub(crate) pending: Arc<Pending>,

    /// Flag group of the context that owns the watcher.
    pub(crate) signal: Arc<FlagGroup>,
}

impl PollEntry {
    /// Whether the dispatcher has already drained earlier readiness.
    ///
    /// Entries holding unconsumed readiness are left out of the next poll.
    pub(crate) fn is_idle(&self) -> bool {
        !self.pending.is_set()
    }

    /// Stores readiness and wakes the owning dispatcher.
    pub(crate) fn deliver(&self, events: Events) {
        if events.is_empty() {
            return;
        }

        self.pending.raise(events);
        self.signal.set(Signal::IO);
    }
}
