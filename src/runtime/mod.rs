//! The dispatcher: contexts, the run loop and their configuration.
//!
//! A [`Context`] owns watchers and runs their callbacks on the thread that
//! calls [`Context::run`]. The dispatcher sleeps on a flag-group signal that
//! the I/O poller thread, event posters and timer handles raise from any
//! thread.

mod builder;
mod core;
mod flags;
mod registry;

pub use builder::ContextBuilder;
pub use core::{Context, LoopHandle, RunFlags};

pub(crate) use core::Shared;
pub(crate) use flags::{FlagGroup, Signal};
