use crate::reactor::poller::platform::sys_monotonic_us;

/// A monotonic microsecond counter.
///
/// Implementations must never go backwards. A reading of `0` means the time
/// is unknown; timers do not fire on such a reading.
pub trait Clock: Send + Sync {
    /// Returns the current time in microseconds.
    fn now_us(&self) -> u64;

    /// Returns the current time in milliseconds.
    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }
}

/// The host's monotonic clock (`CLOCK_MONOTONIC`).
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now_us(&self) -> u64 {
        sys_monotonic_us()
    }
}
