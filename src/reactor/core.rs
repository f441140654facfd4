use super::io::PollEntry;
use super::poller::PollSet;
use super::poller::platform::{sys_close, sys_recv, sys_send, sys_socketpair};
use crate::error::{Error, Result};

use libc::{POLLERR, POLLHUP, POLLIN};
use parking_lot::Mutex;
use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, trace, warn};

const DEFAULT_NAME: &str = "microev-io";
const DEFAULT_STACK_SIZE: usize = 128 * 1024;
const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Builder for configuring and spawning an [`IoThread`].
///
/// # Examples
///
/// ```rust,ignore
/// let poller = IoThread::builder()
///     .name("net-poller")
///     .stack_size(64 * 1024)
///     .spawn()?;
/// ```
#[derive(Debug, Clone)]
pub struct IoThreadBuilder {
    name: String,
    stack_size: usize,
    error_backoff: Duration,
}

impl IoThreadBuilder {
    /// Creates a builder with the default thread name, stack size and
    /// poll-error backoff (one second).
    pub fn new() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            stack_size: DEFAULT_STACK_SIZE,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }

    /// Sets the worker thread's name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the worker thread's stack size in bytes.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Sets how long the worker pauses after a failed poll before retrying.
    pub fn error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Creates the loopback channel and starts the worker thread.
    pub fn spawn(self) -> Result<IoThread> {
        let (wake_rx, wake_tx) = sys_socketpair()?;

        let list = Arc::new(Mutex::new(Vec::new()));
        let state = Arc::new(WorkerState {
            alive: AtomicBool::new(true),
            shutdown: AtomicBool::new(false),
        });

        let worker = Worker {
            list: list.clone(),
            wake_rx,
            state: state.clone(),
            error_backoff: self.error_backoff,
            set: PollSet::with_capacity(8),
        };

        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .stack_size(self.stack_size)
            .spawn(move || worker.run());

        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                sys_close(wake_rx);
                sys_close(wake_tx);
                return Err(Error::Io(e));
            }
        };

        debug!(name = %self.name, "spawned I/O poller thread");

        Ok(IoThread {
            inner: Arc::new(Inner {
                list,
                wake_tx,
                state,
                thread: Some(thread),
                next_token: AtomicU64::new(1),
            }),
        })
    }
}

impl Default for IoThreadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a dedicated I/O polling thread.
///
/// The thread blocks in `poll(2)` over every started I/O watcher plus one
/// loopback descriptor. Readiness is ORed into the watcher's pending bits and
/// announced to the owning context through its flag group; callbacks always
/// run on the dispatcher thread.
///
/// Handles are cheap to clone and may be shared by several contexts. The
/// thread stops once the last handle is dropped.
#[derive(Clone)]
pub struct IoThread {
    inner: Arc<Inner>,
}

struct Inner {
    /// Watch list shared with the worker; guarded by a short critical section.
    list: Arc<Mutex<Vec<PollEntry>>>,

    /// Sending end of the loopback channel.
    wake_tx: RawFd,

    state: Arc<WorkerState>,

    thread: Option<JoinHandle<()>>,

    next_token: AtomicU64,
}

struct WorkerState {
    alive: AtomicBool,

    /// Set before an orderly shutdown closes the loopback channel.
    shutdown: AtomicBool,
}

impl IoThread {
    /// Spawns a poller thread with the default configuration.
    pub fn spawn() -> Result<Self> {
        IoThreadBuilder::new().spawn()
    }

    pub fn builder() -> IoThreadBuilder {
        IoThreadBuilder::new()
    }

    /// Wakes the worker so it rebuilds its descriptor set.
    ///
    /// Best effort and non-blocking: if the channel is full the worker is
    /// already due to wake up.
    pub fn interrupt(&self) {
        let _ = sys_send(self.inner.wake_tx, &[1]);
    }

    /// Returns `false` once the worker has exited after its loopback channel
    /// failed. I/O watchers can no longer be started on this poller.
    pub fn is_alive(&self) -> bool {
        self.inner.state.alive.load(Ordering::Acquire)
    }

    /// Number of descriptors currently watched.
    pub fn watched(&self) -> usize {
        self.inner.list.lock().len()
    }

    pub(crate) fn next_token(&self) -> u64 {
        self.inner.next_token.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn add(&self, entry: PollEntry) -> Result<()> {
        if !self.is_alive() {
            return Err(Error::PollerTerminated);
        }

        trace!(fd = entry.fd, token = entry.token, "watching descriptor");
        self.inner.list.lock().push(entry);

        self.interrupt();
        Ok(())
    }

    pub(crate) fn remove(&self, token: u64) {
        self.inner.list.lock().retain(|entry| entry.token != token);

        self.interrupt();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.state.shutdown.store(true, Ordering::Release);
        sys_close(self.wake_tx);

        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

enum Drain {
    Empty,
    Closed,
    Failed(io::Error),
}

/// State owned by the worker thread.
struct Worker {
    list: Arc<Mutex<Vec<PollEntry>>>,

    /// Receiving end of the loopback channel.
    wake_rx: RawFd,

    state: Arc<WorkerState>,

    error_backoff: Duration,

    set: PollSet,
}

impl Worker {
    fn run(mut self) {
        debug!("I/O poller running");

        loop {
            {
                let list = self.list.lock();
                self.set.reset(self.wake_rx);
                for entry in list.iter().filter(|entry| entry.is_idle()) {
                    self.set.push(entry);
                }
            }

            match self.set.wait() {
                Ok(0) => continue,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, watched = self.set.len(), "poll failed");
                    thread::sleep(self.error_backoff);
                    continue;
                }
            }

            let wake = self.set.wake_revents();
            if wake & POLLERR != 0 {
                error!("loopback channel reported an error");
            }

            if wake & (POLLIN | POLLHUP | POLLERR) != 0 {
                match self.drain() {
                    Drain::Empty => {}
                    Drain::Closed => {
                        if self.state.shutdown.load(Ordering::Acquire) {
                            debug!("I/O poller shutting down");
                        } else {
                            error!("loopback channel closed, I/O poller exiting");
                        }
                        break;
                    }
                    Drain::Failed(e) => {
                        error!(error = %e, "loopback channel failed, I/O poller exiting");
                        break;
                    }
                }
            }

            let list = self.list.lock();
            for (entry, events) in self.set.ready() {
                // Removed while we were blocked.
                if !list.iter().any(|e| e.token == entry.token) {
                    continue;
                }

                trace!(fd = entry.fd, events = ?events, "descriptor ready");
                entry.deliver(events);
            }
        }

        self.state.alive.store(false, Ordering::Release);
        sys_close(self.wake_rx);
    }

    fn drain(&self) -> Drain {
        let mut buffer = [0u8; 64];

        loop {
            let n = sys_recv(self.wake_rx, &mut buffer);

            if n > 0 {
                continue;
            }

            if n == 0 {
                return Drain::Closed;
            }

            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::Interrupted => continue,
                io::ErrorKind::WouldBlock => return Drain::Empty,
                _ => return Drain::Failed(err),
            }
        }
    }
}
