//! Watchers: registered interests paired with a callback.
//!
//! A watcher is one of four kinds:
//! - **I/O**: readiness of a file descriptor, reported by the poller thread,
//! - **timer**: one-shot or periodic deadline, owned by the dispatcher,
//! - **thread-safe timer**: a timer that other threads may re-arm,
//! - **event**: a one-bit software interrupt that any thread may post.
//!
//! Watchers are stored inside their [`Context`](crate::Context) and addressed
//! through the copyable [`Watcher`] handle.

pub(crate) mod event;
pub(crate) mod io;
pub(crate) mod timer;

use crate::runtime::Context;

use bitflags::bitflags;

use event::EventCell;
use io::IoWatcher;
use timer::{SafeTimer, TimerState};

use std::sync::Arc;

bitflags! {
    /// Event mask passed to callbacks and requested by I/O watchers.
    ///
    /// Timers and events always report [`Events::READ`]. I/O callbacks see
    /// READ and WRITE only when requested, and [`Events::ERROR`] always.
    ///
    /// [`Events::HUP`] goes beyond the READ/WRITE/ERROR callback mask: a
    /// hang-up is delivered as HUP, together with READ for readers, so a
    /// callback can tell end-of-stream from plain readability.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Events: u32 {
        const ERROR = 1;
        const READ = 2;
        const WRITE = 4;
        /// Reported on hang-up; never requested.
        const HUP = 8;
    }
}

impl Events {
    /// Bits an I/O watcher may request.
    pub const REQUESTABLE: Events = Events::ERROR.union(Events::READ).union(Events::WRITE);
}

/// Handle to a watcher owned by a [`Context`].
///
/// Handles are plain keys: copying one does not extend the watcher's
/// lifetime, and a handle stops resolving once the watcher is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Watcher {
    pub(crate) owner: u64,
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

/// Watcher callback.
///
/// Receives the context that owns the watcher, the watcher's handle and the
/// observed events. Any state the callback needs is captured by the closure.
pub type Callback = Box<dyn FnMut(&mut Context, Watcher, Events) + Send + 'static>;

/// Per-kind payload.
pub(crate) enum Kind {
    Io(IoWatcher),
    Timer(TimerState),
    TimerSafe(Arc<SafeTimer>),
    Event(Arc<EventCell>),
}

impl Kind {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Kind::Io(_) => "I/O",
            Kind::Timer(_) => "timer",
            Kind::TimerSafe(_) => "thread-safe timer",
            Kind::Event(_) => "event",
        }
    }
}

/// A watcher slot in the context arena.
pub(crate) struct Entry {
    /// Whether the watcher takes part in dispatch.
    ///
    /// Thread-safe timers keep their active flag inside [`SafeTimer`]
    /// instead, since other threads toggle it.
    pub(crate) active: bool,

    /// `None` while the callback is being invoked.
    pub(crate) callback: Option<Callback>,

    pub(crate) kind: Kind,
}

impl Entry {
    pub(crate) fn new(kind: Kind, callback: Callback) -> Self {
        Self {
            active: false,
            callback: Some(callback),
            kind,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        match &self.kind {
            Kind::TimerSafe(timer) => timer.is_active(),
            _ => self.active,
        }
    }
}
