//! Platform layer of the I/O poller.
//!
//! This module wraps the bounded readiness multiplex (`poll(2)`) and the raw
//! socket calls behind the poller thread's loopback channel.
//!
//! The poller is used by the I/O thread to:
//! - wait for readiness of every registered descriptor at once,
//! - be woken early when watchers are added, removed or served,
//! - translate readiness into watcher [`Events`](crate::Events).

pub(crate) mod common;
pub(crate) mod poll;

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;

pub(crate) use poll::PollSet;
