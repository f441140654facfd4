//! # microev
//!
//! **microev** is a small event loop for embedded-style and systems programs.
//! One dispatcher thread runs every callback; a dedicated poller thread
//! watches file descriptors and hands readiness over through a lock-free
//! flag group.
//!
//! A [`Context`] manages four kinds of watchers:
//!
//! - **I/O watchers** for read/write readiness of a file descriptor
//! - **Timers**, one-shot or periodic, with millisecond resolution
//! - **Thread-safe timers** that other threads re-arm through a [`TimerHandle`]
//! - **Events**, software interrupts posted from any thread through an [`EventPoster`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use microev::{Context, RunFlags};
//!
//! fn main() -> microev::Result<()> {
//!     let mut ctx = Context::new()?;
//!
//!     ctx.timer_init(|_ctx, _w, _events| println!("tick"), 0, 500)?;
//!     ctx.timer_init(|ctx, _w, _events| ctx.exit(), 2_000, 0)?;
//!
//!     ctx.run(RunFlags::empty())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`time`] — The monotonic clock used for timer deadlines
//!
//! ## Threading
//!
//! Watcher operations on [`Context`] belong to the dispatcher thread. From
//! other threads use [`LoopHandle::exit`], [`EventPoster::post`] and
//! [`TimerHandle::set`].

mod error;
mod reactor;
mod runtime;
mod utils;
mod watcher;

pub mod time;

pub use error::{Error, Result};
pub use reactor::{IoThread, IoThreadBuilder};
pub use runtime::{Context, ContextBuilder, LoopHandle, RunFlags};
pub use watcher::event::EventPoster;
pub use watcher::timer::TimerHandle;
pub use watcher::{Callback, Events, Watcher};
