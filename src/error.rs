//! Error types returned by event loop operations.
//!
//! Every public operation reports failure synchronously through [`Error`].
//! Caller errors never mutate state; resource errors only occur while
//! creating a context or a poller thread.

use std::io;
use std::os::fd::RawFd;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The handle is stale (released slot) or belongs to another context.
    #[error("watcher handle is stale or owned by another context")]
    InvalidWatcher,

    /// The operation does not apply to this kind of watcher.
    #[error("operation requires a {expected} watcher")]
    WrongKind { expected: &'static str },

    /// I/O watchers need a non-negative descriptor.
    #[error("invalid file descriptor {0}")]
    InvalidDescriptor(RawFd),

    /// Requested events may only contain READ, WRITE and ERROR.
    #[error("unsupported event mask {0:#x}")]
    InvalidEvents(u32),

    /// Negative timeout or period.
    #[error("timer value out of range (timeout={timeout}, period={period})")]
    OutOfRange { timeout: i64, period: i64 },

    /// The context was built without an I/O poller.
    #[error("no I/O poller attached to this context")]
    NoPoller,

    /// The poller worker exited after its loopback channel failed.
    #[error("I/O poller thread has terminated")]
    PollerTerminated,

    /// `run` was called from inside one of this context's callbacks.
    #[error("event loop is already running")]
    Reentrant,

    /// Resource exhaustion while creating the signal channel or worker thread.
    #[error(transparent)]
    Io(#[from] io::Error),
}
