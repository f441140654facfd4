use crate::error::{Error, Result};
use crate::runtime::{Shared, Signal};

use parking_lot::Mutex;
use std::sync::Arc;

/// Deadline arithmetic for one timer, in monotonic milliseconds.
///
/// A deadline of `None` means the timer is dormant: it is either disarmed or
/// waiting for the loop to start before it is armed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TimerState {
    /// Milliseconds until the first expiry.
    pub(crate) timeout: u64,

    /// Milliseconds between expiries, `0` for one-shot timers.
    pub(crate) period: u64,

    /// Absolute expiry time.
    pub(crate) deadline: Option<u64>,
}

/// Outcome of evaluating a timer during a dispatcher pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fire {
    /// Not due.
    Idle,
    /// Fired and re-armed one period after `now`.
    Rearmed,
    /// Fired for the last time; the watcher must be stopped.
    Expired,
}

impl TimerState {
    /// Stores a new timeout and period.
    ///
    /// `now` is the current time if the loop is running, in which case the
    /// timer is armed immediately; otherwise it stays dormant until the loop
    /// arms it. Returns `false` when the values disarm the timer.
    pub(crate) fn configure(&mut self, timeout: u64, period: u64, now: Option<u64>) -> bool {
        self.timeout = timeout;
        self.period = period;
        self.deadline = now.and_then(|now| self.arm_at(now));

        self.is_armable()
    }

    pub(crate) fn is_armable(&self) -> bool {
        self.timeout > 0 || self.period > 0
    }

    /// Arms a dormant timer. Armed timers are left untouched.
    pub(crate) fn arm_if_dormant(&mut self, now: u64) {
        if self.deadline.is_none() {
            self.deadline = self.arm_at(now);
        }
    }

    fn arm_at(&self, now: u64) -> Option<u64> {
        if self.timeout > 0 {
            Some(now + self.timeout)
        } else if self.period > 0 {
            Some(now)
        } else {
            None
        }
    }

    /// Evaluates the firing policy at `now`.
    ///
    /// A timer fires only once `now` is strictly past its deadline. Periodic
    /// timers are re-armed relative to `now`, not to the missed deadline.
    pub(crate) fn fire(&mut self, now: u64) -> Fire {
        if now == 0 {
            return Fire::Idle;
        }

        match self.deadline {
            Some(deadline) if now > deadline => {
                if self.period == 0 {
                    self.timeout = 0;
                    self.deadline = None;
                    Fire::Expired
                } else {
                    self.deadline = Some(now + self.period);
                    Fire::Rearmed
                }
            }
            _ => Fire::Idle,
        }
    }
}

/// Validates caller-supplied millisecond values.
pub(crate) fn checked(timeout: i64, period: i64) -> Result<(u64, u64)> {
    if timeout < 0 || period < 0 {
        return Err(Error::OutOfRange { timeout, period });
    }

    Ok((timeout as u64, period as u64))
}

/// State of a thread-safe timer, guarded by [`SafeTimer`]'s lock.
#[derive(Debug, Default)]
pub(crate) struct TimerCell {
    pub(crate) timer: TimerState,
    pub(crate) active: bool,

    /// Cleared when the watcher leaves its context for good.
    pub(crate) attached: bool,
}

/// A timer whose fields may be read and written from any thread.
///
/// Every access goes through a short critical section. The flag-group signal
/// is always raised after the lock is released.
#[derive(Debug, Default)]
pub(crate) struct SafeTimer {
    pub(crate) cell: Mutex<TimerCell>,
}

impl SafeTimer {
    pub(crate) fn new() -> Self {
        Self {
            cell: Mutex::new(TimerCell {
                attached: true,
                ..TimerCell::default()
            }),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.cell.lock().active
    }

    /// Applies new values and returns whether the timer ended up active.
    pub(crate) fn configure(&self, timeout: u64, period: u64, now: Option<u64>) -> Result<bool> {
        let mut cell = self.cell.lock();
        if !cell.attached {
            return Err(Error::InvalidWatcher);
        }

        cell.active = cell.timer.configure(timeout, period, now);
        Ok(cell.active)
    }

    pub(crate) fn stop(&self) {
        self.cell.lock().active = false;
    }

    pub(crate) fn detach(&self) {
        let mut cell = self.cell.lock();
        cell.active = false;
        cell.attached = false;
    }
}

/// Cross-thread handle to a thread-safe timer.
///
/// Obtained from [`Context::timer_handle`](crate::Context::timer_handle).
/// Re-arming from another thread wakes the dispatcher so it recomputes its
/// next wake-up time instead of sleeping until an unrelated deadline.
#[derive(Clone)]
pub struct TimerHandle {
    pub(crate) timer: Arc<SafeTimer>,
    pub(crate) shared: Arc<Shared>,
}

impl TimerHandle {
    /// Re-arms the timer with a new timeout and period.
    ///
    /// A zero timeout and period disarms it.
    pub fn set(&self, timeout: i64, period: i64) -> Result<()> {
        let (timeout, period) = checked(timeout, period)?;

        let now = self.shared.now_if_running();
        self.timer.configure(timeout, period, now)?;

        self.shared.signal.set(Signal::TIMER);
        Ok(())
    }

    /// Re-arms the timer with its stored timeout and period.
    pub fn start(&self) -> Result<()> {
        let (timeout, period) = {
            let cell = self.timer.cell.lock();
            (cell.timer.timeout, cell.timer.period)
        };

        let now = self.shared.now_if_running();
        self.timer.configure(timeout, period, now)?;

        self.shared.signal.set(Signal::TIMER);
        Ok(())
    }

    /// Stops the timer. It stays registered and may be re-armed later.
    pub fn stop(&self) {
        self.timer.stop();
    }

    pub fn is_active(&self) -> bool {
        self.timer.is_active()
    }
}
