//! I/O poller thread.
//!
//! This module implements the only component that runs on its own thread.
//! The poller is responsible for:
//! - blocking in the readiness multiplex over all started I/O watchers,
//! - storing readiness in each watcher's pending bits,
//! - waking the owning dispatcher through its flag group.
//!
//! It never runs callbacks. Other threads interrupt its wait by writing to a
//! private loopback channel.

mod core;

pub(crate) mod io;
pub(crate) mod poller;

pub use core::{IoThread, IoThreadBuilder};
