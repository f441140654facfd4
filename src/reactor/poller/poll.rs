//! Bounded readiness multiplex over `poll(2)`.
//!
//! The descriptor set is rebuilt on every iteration of the poller thread.
//! Slot 0 always holds the loopback descriptor used to interrupt the wait.

use super::common::{interest_to_poll, revents_to_events};
use super::platform::sys_poll;
use crate::reactor::io::PollEntry;
use crate::watcher::Events;

use libc::{POLLIN, c_short, pollfd};
use std::io;
use std::os::fd::RawFd;

/// Reusable `poll(2)` descriptor set.
pub(crate) struct PollSet {
    /// Descriptor array handed to the kernel.
    fds: Vec<pollfd>,

    /// Entries matching `fds[1..]`.
    entries: Vec<PollEntry>,
}

impl PollSet {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            fds: Vec::with_capacity(capacity + 1),
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Clears the set, keeping only the loopback descriptor.
    pub(crate) fn reset(&mut self, wake_fd: RawFd) {
        self.fds.clear();
        self.entries.clear();

        self.fds.push(pollfd {
            fd: wake_fd,
            events: POLLIN,
            revents: 0,
        });
    }

    /// Adds an entry to the next poll.
    pub(crate) fn push(&mut self, entry: &PollEntry) {
        self.fds.push(pollfd {
            fd: entry.fd,
            events: interest_to_poll(entry.interest),
            revents: 0,
        });
        self.entries.push(entry.clone());
    }

    /// Number of watcher descriptors in the set.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Blocks until at least one descriptor is ready.
    pub(crate) fn wait(&mut self) -> io::Result<usize> {
        sys_poll(&mut self.fds, -1)
    }

    /// Readiness reported for the loopback descriptor.
    pub(crate) fn wake_revents(&self) -> c_short {
        self.fds[0].revents
    }

    /// Entries with readiness, paired with the events to deliver.
    pub(crate) fn ready(&self) -> impl Iterator<Item = (&PollEntry, Events)> {
        self.fds[1..]
            .iter()
            .zip(&self.entries)
            .filter(|(fd, _)| fd.revents != 0)
            .map(|(fd, entry)| (entry, revents_to_events(fd.revents, entry.interest)))
            .filter(|(_, events)| !events.is_empty())
    }
}
