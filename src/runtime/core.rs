use super::builder::ContextBuilder;
use super::flags::{FlagGroup, Signal};
use super::registry::Registry;
use crate::error::{Error, Result};
use crate::reactor::IoThread;
use crate::reactor::io::PollEntry;
use crate::time::Clock;
use crate::utils::Slab;
use crate::watcher::event::{EventCell, EventPoster};
use crate::watcher::io::IoWatcher;
use crate::watcher::timer::{self, Fire, SafeTimer, TimerHandle, TimerState};
use crate::watcher::{Callback, Entry, Events, Kind, Watcher};

use bitflags::bitflags;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

bitflags! {
    /// Flags controlling [`Context::run`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RunFlags: u32 {
        /// Return after the first pass that served at least one watcher.
        const ONCE = 1;
        /// Never block: every wait has a zero timeout. Combined with
        /// [`RunFlags::ONCE`], returns after a single pass even if nothing
        /// was ready.
        const NONBLOCK = 2;
    }
}

/// State of a context reachable from other threads.
pub(crate) struct Shared {
    pub(crate) id: u64,
    pub(crate) signal: Arc<FlagGroup>,
    pub(crate) running: AtomicBool,
    pub(crate) exit_requested: AtomicBool,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Shared {
    pub(crate) fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Current time if the loop has started, for arming timers.
    pub(crate) fn now_if_running(&self) -> Option<u64> {
        self.running
            .load(Ordering::Acquire)
            .then(|| self.clock.now_ms())
    }
}

/// An event loop context.
///
/// A context owns its watchers, the registry of watchers taking part in
/// dispatch, and the flag-group signal the dispatcher sleeps on. All
/// callbacks run on the thread that calls [`run`](Self::run).
///
/// Other threads interact with a context only through [`LoopHandle`],
/// [`EventPoster`] and [`TimerHandle`].
///
/// # Examples
///
/// ```rust,ignore
/// let mut ctx = Context::new()?;
///
/// ctx.timer_init(|ctx, _w, _events| ctx.exit(), 100, 0)?;
/// ctx.run(RunFlags::empty())?;
/// ```
pub struct Context {
    shared: Arc<Shared>,

    watchers: Slab<Entry>,

    registry: Registry,

    poller: Option<IoThread>,

    /// Set while `run` is on the stack.
    dispatching: bool,
}

impl Context {
    /// Creates a context with its own I/O poller thread.
    pub fn new() -> Result<Self> {
        ContextBuilder::new().build()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    pub(crate) fn from_parts(clock: Arc<dyn Clock>, poller: Option<IoThread>) -> Self {
        let shared = Arc::new(Shared {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            signal: Arc::new(FlagGroup::new()),
            running: AtomicBool::new(false),
            exit_requested: AtomicBool::new(false),
            clock,
        });

        Self {
            shared,
            watchers: Slab::new(16),
            registry: Registry::new(),
            poller,
            dispatching: false,
        }
    }

    /// Returns a handle that other threads can use to stop the loop.
    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            shared: self.shared.clone(),
        }
    }

    /// The I/O poller serving this context, if any.
    pub fn poller(&self) -> Option<&IoThread> {
        self.poller.as_ref()
    }

    /// Whether the loop has been started and not exited since.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Number of watchers in the registry.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Runs the event loop on the calling thread.
    ///
    /// Dormant timers are armed on entry. Each pass waits on the flag group,
    /// bounded by the nearest timer deadline, then serves every ready
    /// watcher once, in registry order.
    ///
    /// Without flags the loop returns once [`exit`](Self::exit) is called or
    /// no watcher is left in the registry.
    ///
    /// # Arguments
    ///
    /// * `flags` - [`RunFlags::ONCE`] returns after the first pass that ran a
    ///   callback; [`RunFlags::NONBLOCK`] never waits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Reentrant`] when called from one of this context's
    /// callbacks.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// // Poll once without blocking, e.g. from an existing main loop.
    /// ctx.run(RunFlags::ONCE | RunFlags::NONBLOCK)?;
    ///
    /// // Run until a callback calls `ctx.exit()`.
    /// ctx.run(RunFlags::empty())?;
    /// ```
    pub fn run(&mut self, flags: RunFlags) -> Result<()> {
        if self.dispatching {
            return Err(Error::Reentrant);
        }

        self.dispatching = true;
        self.shared.running.store(true, Ordering::Release);

        let mut next_deadline = self.arm_timers();
        trace!(
            context = self.shared.id,
            ?flags,
            ?next_deadline,
            "entering run loop"
        );

        loop {
            if !self.is_running() || self.registry.is_empty() {
                break;
            }

            let timeout = if flags.contains(RunFlags::NONBLOCK) {
                Some(Duration::ZERO)
            } else {
                self.wait_budget(next_deadline)
            };

            let bits = self.shared.signal.wait(Signal::all(), timeout);

            let exit_requested = self.shared.exit_requested.load(Ordering::Acquire);
            if bits.contains(Signal::EXIT) && exit_requested {
                self.exit();
                break;
            }

            let (served, next) = self.dispatch(bits);
            next_deadline = next;

            trace!(
                context = self.shared.id,
                ?bits,
                served,
                ?next_deadline,
                "pass done"
            );

            if flags.contains(RunFlags::ONCE)
                && (served > 0 || flags.contains(RunFlags::NONBLOCK))
            {
                break;
            }
        }

        self.shared.signal.release_waiter();
        self.dispatching = false;

        Ok(())
    }

    /// Stops every watcher, empties the registry and ends the loop.
    ///
    /// Thread-safe timers are stopped but stay registered, so a
    /// [`TimerHandle`] may arm them again for the next [`run`](Self::run).
    /// Watcher handles stay valid; other watchers can be started again
    /// before the next run.
    pub fn exit(&mut self) {
        for index in self.registry.indices() {
            self.deactivate(index, false);
        }

        self.shared.running.store(false, Ordering::Release);
        self.shared.exit_requested.store(false, Ordering::Release);
        self.shared.signal.release_waiter();

        debug!(context = self.shared.id, "event loop exited");
    }

    /// Whether the watcher is started. Stale handles are reported inactive.
    pub fn is_active(&self, watcher: Watcher) -> bool {
        self.lookup(watcher).is_ok_and(Entry::is_active)
    }

    /// Stops the watcher and frees its slot. The handle becomes stale.
    pub fn release(&mut self, watcher: Watcher) -> Result<()> {
        self.lookup(watcher)?;

        self.deactivate(watcher.index, true);
        self.watchers.remove(watcher.index, watcher.generation);

        trace!(context = self.shared.id, index = watcher.index, "watcher released");
        Ok(())
    }

    /// Creates an I/O watcher on `fd` and starts it.
    ///
    /// # Arguments
    ///
    /// * `callback` - Runs on the dispatcher thread with the observed events.
    /// * `fd` - Descriptor to watch. It is not owned by the watcher.
    /// * `events` - Any of [`Events::READ`], [`Events::WRITE`] and
    ///   [`Events::ERROR`].
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let (peer, stream) = UnixStream::pair()?;
    /// let fd = stream.as_raw_fd();
    ///
    /// ctx.io_init(
    ///     move |ctx, w, events| {
    ///         if events.contains(Events::HUP) {
    ///             ctx.release(w).ok();
    ///         }
    ///     },
    ///     fd,
    ///     Events::READ,
    /// )?;
    /// ```
    pub fn io_init<F>(&mut self, callback: F, fd: RawFd, events: Events) -> Result<Watcher>
    where
        F: FnMut(&mut Context, Watcher, Events) + Send + 'static,
    {
        check_interest(events)?;
        if fd < 0 {
            return Err(Error::InvalidDescriptor(fd));
        }

        let watcher = self.insert(Kind::Io(IoWatcher::new(fd, events, 0)), Box::new(callback));

        if let Err(e) = self.io_start(watcher) {
            self.watchers.remove(watcher.index, watcher.generation);
            return Err(e);
        }

        Ok(watcher)
    }

    /// Changes the descriptor and events of an I/O watcher and restarts it.
    pub fn io_set(&mut self, watcher: Watcher, fd: RawFd, events: Events) -> Result<()> {
        check_interest(events)?;
        if fd < 0 {
            return Err(Error::InvalidDescriptor(fd));
        }

        self.io_stop(watcher)?;

        if let Kind::Io(io) = &mut self.lookup_mut(watcher)?.kind {
            io.fd = fd;
            io.interest = events;
        }

        self.io_start(watcher)
    }

    /// Starts an I/O watcher: hands its descriptor to the poller thread.
    pub fn io_start(&mut self, watcher: Watcher) -> Result<()> {
        let poller = self.poller.clone().ok_or(Error::NoPoller)?;
        let signal = self.shared.signal.clone();

        let entry = find_mut(&mut self.watchers, self.shared.id, watcher)?;
        let Kind::Io(io) = &mut entry.kind else {
            return Err(Error::WrongKind { expected: "I/O" });
        };

        if io.fd < 0 {
            return Err(Error::InvalidDescriptor(io.fd));
        }

        if entry.active {
            return Ok(());
        }

        io.pending.take();
        io.token = poller.next_token();

        poller.add(PollEntry {
            token: io.token,
            fd: io.fd,
            interest: io.interest,
            pending: io.pending.clone(),
            signal,
        })?;

        entry.active = true;
        self.registry.insert(watcher.index);

        Ok(())
    }

    /// Stops an I/O watcher and withdraws its descriptor from the poller.
    pub fn io_stop(&mut self, watcher: Watcher) -> Result<()> {
        match self.lookup(watcher)?.kind {
            Kind::Io(_) => {}
            _ => return Err(Error::WrongKind { expected: "I/O" }),
        }

        self.deactivate(watcher.index, false);
        Ok(())
    }

    /// Creates a timer and arms it.
    ///
    /// `timeout` is the delay in milliseconds before the first expiry and
    /// `period` the interval between later expiries, `0` for one-shot
    /// timers. A periodic timer with a zero timeout fires on the first pass.
    /// Before the loop runs, timers stay dormant and are armed by
    /// [`run`](Self::run).
    ///
    /// # Arguments
    ///
    /// * `callback` - Runs on the dispatcher thread at every expiry.
    /// * `timeout` - Milliseconds until the first expiry.
    /// * `period` - Milliseconds between later expiries, `0` for one-shot.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// // Every 100ms, starting right away.
    /// let ticker = ctx.timer_init(|_ctx, _w, _events| println!("tick"), 0, 100)?;
    ///
    /// // Stop ticking after one second.
    /// ctx.timer_init(move |ctx, _w, _events| ctx.timer_stop(ticker).unwrap(), 1_000, 0)?;
    /// ```
    pub fn timer_init<F>(&mut self, callback: F, timeout: i64, period: i64) -> Result<Watcher>
    where
        F: FnMut(&mut Context, Watcher, Events) + Send + 'static,
    {
        timer::checked(timeout, period)?;

        let watcher = self.insert(Kind::Timer(TimerState::default()), Box::new(callback));
        self.timer_set(watcher, timeout, period)?;

        Ok(watcher)
    }

    /// Creates a timer that other threads may re-arm through a
    /// [`TimerHandle`].
    ///
    /// The watcher stays registered even while stopped, so it can be armed
    /// from outside before or while the loop runs.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let watchdog = ctx.timer_init_threadsafe(|ctx, _w, _events| ctx.exit(), 0, 0)?;
    /// let handle = ctx.timer_handle(watchdog)?;
    ///
    /// thread::spawn(move || handle.set(500, 0));
    /// ```
    pub fn timer_init_threadsafe<F>(
        &mut self,
        callback: F,
        timeout: i64,
        period: i64,
    ) -> Result<Watcher>
    where
        F: FnMut(&mut Context, Watcher, Events) + Send + 'static,
    {
        timer::checked(timeout, period)?;

        let timer = Arc::new(SafeTimer::new());
        let watcher = self.insert(Kind::TimerSafe(timer), Box::new(callback));
        self.registry.insert(watcher.index);
        self.timer_set(watcher, timeout, period)?;

        Ok(watcher)
    }

    /// Re-arms a timer with a new timeout and period.
    ///
    /// A zero timeout and period disarms and stops the timer.
    pub fn timer_set(&mut self, watcher: Watcher, timeout: i64, period: i64) -> Result<()> {
        let (timeout, period) = timer::checked(timeout, period)?;
        let now = self.shared.now_if_running();

        let entry = find_mut(&mut self.watchers, self.shared.id, watcher)?;
        match &mut entry.kind {
            Kind::Timer(timer) => {
                entry.active = timer.configure(timeout, period, now);
                if entry.active {
                    self.registry.insert(watcher.index);
                } else {
                    self.registry.remove(watcher.index);
                }
            }
            Kind::TimerSafe(timer) => {
                timer.configure(timeout, period, now)?;
                self.registry.insert(watcher.index);
            }
            _ => return Err(Error::WrongKind { expected: "timer" }),
        }

        self.shared.signal.set(Signal::TIMER);
        Ok(())
    }

    /// Re-arms a timer with its stored timeout and period.
    pub fn timer_start(&mut self, watcher: Watcher) -> Result<()> {
        let (timeout, period) = match &self.lookup(watcher)?.kind {
            Kind::Timer(timer) => (timer.timeout, timer.period),
            Kind::TimerSafe(timer) => {
                let cell = timer.cell.lock();
                (cell.timer.timeout, cell.timer.period)
            }
            _ => return Err(Error::WrongKind { expected: "timer" }),
        };

        self.timer_set(watcher, timeout as i64, period as i64)
    }

    /// Stops a timer.
    pub fn timer_stop(&mut self, watcher: Watcher) -> Result<()> {
        match self.lookup(watcher)?.kind {
            Kind::Timer(_) | Kind::TimerSafe(_) => {}
            _ => return Err(Error::WrongKind { expected: "timer" }),
        }

        self.deactivate(watcher.index, false);
        Ok(())
    }

    /// Absolute deadline of a timer in monotonic milliseconds, `None` while
    /// dormant or disarmed.
    pub fn timer_deadline(&self, watcher: Watcher) -> Result<Option<u64>> {
        match &self.lookup(watcher)?.kind {
            Kind::Timer(timer) => Ok(timer.deadline),
            Kind::TimerSafe(timer) => Ok(timer.cell.lock().timer.deadline),
            _ => Err(Error::WrongKind { expected: "timer" }),
        }
    }

    /// Cross-thread handle to a thread-safe timer.
    pub fn timer_handle(&self, watcher: Watcher) -> Result<TimerHandle> {
        match &self.lookup(watcher)?.kind {
            Kind::TimerSafe(timer) => Ok(TimerHandle {
                timer: timer.clone(),
                shared: self.shared.clone(),
            }),
            _ => Err(Error::WrongKind {
                expected: "thread-safe timer",
            }),
        }
    }

    /// Creates an event watcher. Events are started on creation.
    pub fn event_init<F>(&mut self, callback: F) -> Result<Watcher>
    where
        F: FnMut(&mut Context, Watcher, Events) + Send + 'static,
    {
        let watcher = self.insert(Kind::Event(Arc::new(EventCell::new())), Box::new(callback));

        if let Some(entry) = self.watchers.get_mut(watcher.index, watcher.generation) {
            entry.active = true;
        }
        self.registry.insert(watcher.index);

        Ok(watcher)
    }

    /// Posts an event from the dispatcher thread.
    pub fn event_post(&self, watcher: Watcher) -> Result<()> {
        match &self.lookup(watcher)?.kind {
            Kind::Event(cell) => {
                cell.post();
                self.shared.signal.set(Signal::EVENT);
                Ok(())
            }
            _ => Err(Error::WrongKind { expected: "event" }),
        }
    }

    /// Stops an event watcher. A pending post is discarded.
    pub fn event_stop(&mut self, watcher: Watcher) -> Result<()> {
        match self.lookup(watcher)?.kind {
            Kind::Event(_) => {}
            _ => return Err(Error::WrongKind { expected: "event" }),
        }

        self.deactivate(watcher.index, false);
        Ok(())
    }

    /// Cross-thread handle used to post an event watcher.
    pub fn event_poster(&self, watcher: Watcher) -> Result<EventPoster> {
        match &self.lookup(watcher)?.kind {
            Kind::Event(cell) => Ok(EventPoster {
                cell: cell.clone(),
                shared: self.shared.clone(),
            }),
            _ => Err(Error::WrongKind { expected: "event" }),
        }
    }

    fn insert(&mut self, kind: Kind, callback: Callback) -> Watcher {
        let name = kind.name();
        let (index, generation) = self.watchers.insert(Entry::new(kind, callback));

        trace!(
            context = self.shared.id,
            kind = name,
            index,
            watchers = self.watchers.len(),
            "watcher created"
        );

        Watcher {
            owner: self.shared.id,
            index,
            generation,
        }
    }

    fn lookup(&self, watcher: Watcher) -> Result<&Entry> {
        if watcher.owner != self.shared.id {
            return Err(Error::InvalidWatcher);
        }

        self.watchers
            .get(watcher.index, watcher.generation)
            .ok_or(Error::InvalidWatcher)
    }

    fn lookup_mut(&mut self, watcher: Watcher) -> Result<&mut Entry> {
        find_mut(&mut self.watchers, self.shared.id, watcher)
    }

    /// Stops the watcher at `index` in the way its kind requires.
    ///
    /// `detach` permanently disconnects thread-safe timers from their
    /// handles, used when the slot is released.
    fn deactivate(&mut self, index: usize, detach: bool) {
        let Some((_, entry)) = self.watchers.at_mut(index) else {
            return;
        };

        match &entry.kind {
            Kind::Io(io) => {
                if entry.active {
                    if let Some(poller) = &self.poller {
                        poller.remove(io.token);
                    }
                }
            }
            Kind::TimerSafe(timer) => {
                if detach {
                    timer.detach();
                } else {
                    timer.stop();
                }
            }
            Kind::Event(cell) => cell.clear(),
            Kind::Timer(_) => {}
        }

        entry.active = false;

        // Thread-safe timers stay registered while stopped.
        if detach || !matches!(entry.kind, Kind::TimerSafe(_)) {
            self.registry.remove(index);
        }
    }

    /// Arms every dormant timer and returns the earliest deadline.
    fn arm_timers(&mut self) -> Option<u64> {
        let now = self.shared.now_ms();
        let mut next = None;

        for index in self.registry.indices() {
            let Some((_, entry)) = self.watchers.at_mut(index) else {
                continue;
            };

            match &mut entry.kind {
                Kind::Timer(timer) if entry.active => {
                    timer.arm_if_dormant(now);
                    next = earliest(next, timer.deadline);
                }
                Kind::TimerSafe(timer) => {
                    let mut cell = timer.cell.lock();
                    if cell.active {
                        cell.timer.arm_if_dormant(now);
                        next = earliest(next, cell.timer.deadline);
                    }
                }
                _ => {}
            }
        }

        next
    }

    /// How long to wait for a deadline in milliseconds.
    ///
    /// Timers fire once the clock is strictly past their deadline, so the
    /// wait runs until the start of the following millisecond.
    fn wait_budget(&self, deadline: Option<u64>) -> Option<Duration> {
        let deadline = deadline?;

        let now_us = self.shared.clock.now_us();
        let due_us = deadline.saturating_add(1).saturating_mul(1000);

        Some(Duration::from_micros(due_us.saturating_sub(now_us)))
    }

    /// One dispatcher pass: serves every ready watcher once.
    ///
    /// Returns the number of callbacks run and the earliest armed deadline.
    fn dispatch(&mut self, bits: Signal) -> (usize, Option<u64>) {
        let mut served = 0;
        let mut next = None;

        self.registry.begin_pass();

        while let Some(index) = self.registry.next_in_pass() {
            // A callback called `exit`.
            if !self.is_running() {
                break;
            }

            let Some((generation, entry)) = self.watchers.at_mut(index) else {
                continue;
            };

            let mut from_poller = false;

            let events = match &mut entry.kind {
                Kind::Event(cell) => {
                    let posted = entry.active && bits.contains(Signal::EVENT) && cell.take();
                    posted.then_some(Events::READ)
                }

                Kind::Timer(timer) => {
                    if !entry.active {
                        continue;
                    }

                    let now = self.shared.now_ms();
                    timer.arm_if_dormant(now);

                    let fire = timer.fire(now);
                    if fire == Fire::Expired {
                        entry.active = false;
                        self.registry.remove(index);
                    }

                    next = earliest(next, timer.deadline);
                    (fire != Fire::Idle).then_some(Events::READ)
                }

                Kind::TimerSafe(timer) => {
                    let mut cell = timer.cell.lock();
                    if !cell.active {
                        continue;
                    }

                    // Armed remotely while the loop was starting.
                    let now = self.shared.now_ms();
                    cell.timer.arm_if_dormant(now);

                    let fire = cell.timer.fire(now);
                    if fire == Fire::Expired {
                        cell.active = false;
                    }

                    next = earliest(next, cell.timer.deadline);
                    (fire != Fire::Idle).then_some(Events::READ)
                }

                Kind::Io(io) => {
                    if !entry.active || !bits.contains(Signal::IO) {
                        continue;
                    }

                    from_poller = true;
                    Some(io.pending.take()).filter(|events| !events.is_empty())
                }
            };

            let Some(events) = events else {
                continue;
            };

            let watcher = Watcher {
                owner: self.shared.id,
                index,
                generation,
            };
            self.invoke(watcher, events);
            served += 1;

            // The descriptor was left out of the poll set while pending.
            if from_poller {
                if let Some(poller) = &self.poller {
                    poller.interrupt();
                }
            }
        }

        (served, next)
    }

    /// Runs a watcher's callback on the dispatcher thread.
    ///
    /// The callback is moved out of its slot for the duration of the call,
    /// so it may freely mutate the context, including its own watcher.
    fn invoke(&mut self, watcher: Watcher, events: Events) {
        let Some(entry) = self.watchers.get_mut(watcher.index, watcher.generation) else {
            return;
        };

        let Some(mut callback) = entry.callback.take() else {
            return;
        };

        callback(self, watcher, events);

        // Released during the callback: the closure is dropped here.
        if let Some(entry) = self.watchers.get_mut(watcher.index, watcher.generation) {
            if entry.callback.is_none() {
                entry.callback = Some(callback);
            }
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.exit();

        // Outstanding timer handles must not re-arm a dead context.
        for entry in self.watchers.values_mut() {
            if let Kind::TimerSafe(timer) = &entry.kind {
                timer.detach();
            }
        }
    }
}

/// Handle used by other threads to stop a running loop.
///
/// The dispatcher performs the teardown itself when it wakes up.
#[derive(Clone)]
pub struct LoopHandle {
    shared: Arc<Shared>,
}

impl LoopHandle {
    /// Asks the loop to exit. Not for use from signal handlers.
    pub fn exit(&self) {
        self.shared.exit_requested.store(true, Ordering::Release);
        self.shared.signal.set(Signal::EXIT);
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

fn find_mut(watchers: &mut Slab<Entry>, owner: u64, watcher: Watcher) -> Result<&mut Entry> {
    if watcher.owner != owner {
        return Err(Error::InvalidWatcher);
    }

    watchers
        .get_mut(watcher.index, watcher.generation)
        .ok_or(Error::InvalidWatcher)
}

fn check_interest(events: Events) -> Result<()> {
    if events.is_empty() || !Events::REQUESTABLE.contains(events) {
        return Err(Error::InvalidEvents(events.bits()));
    }

    Ok(())
}

fn earliest(current: Option<u64>, candidate: Option<u64>) -> Option<u64> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
