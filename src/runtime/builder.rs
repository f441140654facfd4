use super::Context;
use crate::error::Result;
use crate::reactor::{IoThread, IoThreadBuilder};
use crate::time::{Clock, MonotonicClock};

use std::sync::Arc;
use tracing::debug;

/// How the context obtains its I/O poller.
enum PollerSetup {
    Spawn(IoThreadBuilder),
    Attach(IoThread),
    Disabled,
}

/// Builder for configuring a [`Context`].
///
/// By default the context spawns its own poller thread and reads time from
/// [`MonotonicClock`].
///
/// # Examples
///
/// ```rust,ignore
/// // Timers and events only: no poller thread is spawned.
/// let mut ctx = Context::builder().without_io().build()?;
///
/// // Two contexts sharing one poller thread.
/// let poller = IoThread::spawn()?;
/// let a = Context::builder().poller(poller.clone()).build()?;
/// let b = Context::builder().poller(poller).build()?;
/// ```
pub struct ContextBuilder {
    clock: Arc<dyn Clock>,
    poller: PollerSetup,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(MonotonicClock),
            poller: PollerSetup::Spawn(IoThreadBuilder::new()),
        }
    }

    /// Replaces the time source used for timer deadlines.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Spawns the context's poller thread with this configuration.
    pub fn io_thread(mut self, builder: IoThreadBuilder) -> Self {
        self.poller = PollerSetup::Spawn(builder);
        self
    }

    /// Attaches an existing poller thread instead of spawning one.
    pub fn poller(mut self, poller: IoThread) -> Self {
        self.poller = PollerSetup::Attach(poller);
        self
    }

    /// Builds the context without a poller. I/O watchers then fail with
    /// [`Error::NoPoller`](crate::Error::NoPoller).
    pub fn without_io(mut self) -> Self {
        self.poller = PollerSetup::Disabled;
        self
    }

    pub fn build(self) -> Result<Context> {
        let poller = match self.poller {
            PollerSetup::Spawn(builder) => Some(builder.spawn()?),
            PollerSetup::Attach(poller) => Some(poller),
            PollerSetup::Disabled => None,
        };

        debug!(io = poller.is_some(), "building event loop context");

        Ok(Context::from_parts(self.clock, poller))
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
