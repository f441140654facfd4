use super::Events;

use std::os::fd::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Readiness bits shared between the poller thread (producer) and the
/// dispatcher (consumer).
///
/// The poller ORs observed events in; the dispatcher swaps the cell back to
/// zero when it serves the watcher. While the cell is non-zero the poller
/// leaves the descriptor out of its next poll.
#[derive(Debug, Default)]
pub(crate) struct Pending(AtomicU32);

impl Pending {
    pub(crate) fn raise(&self, events: Events) {
        self.0.fetch_or(events.bits(), Ordering::AcqRel);
    }

    pub(crate) fn take(&self) -> Events {
        Events::from_bits_truncate(self.0.swap(0, Ordering::AcqRel))
    }

    pub(crate) fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire) != 0
    }
}

/// Payload of an I/O watcher.
pub(crate) struct IoWatcher {
    /// Descriptor watched by the poller. Not owned.
    pub(crate) fd: RawFd,

    /// Requested events, a subset of [`Events::REQUESTABLE`].
    pub(crate) interest: Events,

    pub(crate) pending: Arc<Pending>,

    /// Identifies this watcher in the poller's watch list.
    pub(crate) token: u64,
}

impl IoWatcher {
    pub(crate) fn new(fd: RawFd, interest: Events, token: u64) -> Self {
        Self {
            fd,
            interest,
            pending: Arc::new(Pending::default()),
            token,
        }
    }
}
