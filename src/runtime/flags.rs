use arc_swap::ArcSwapOption;
use bitflags::bitflags;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

bitflags! {
    /// Wake-up bits of the flag-group signal.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Signal: u32 {
        /// The poller thread stored readiness for at least one I/O watcher.
        const IO = 1 << 0;
        /// An event watcher was posted.
        const EVENT = 1 << 1;
        /// A timer was (re)armed; the next deadline must be recomputed.
        const TIMER = 1 << 2;
        /// Another thread asked the loop to exit.
        const EXIT = 1 << 3;
    }
}

/// Sticky, multi-producer, single-consumer wake-up bits.
///
/// Any thread may [`set`](Self::set) bits; only the dispatcher thread
/// [`wait`](Self::wait)s on them. `set` is a single atomic OR followed by an
/// unpark of the published waiter: it takes no lock and performs no
/// allocation, so it is safe to call from signal handlers and other contexts
/// that must not block. Bits accumulate while nobody waits.
pub(crate) struct FlagGroup {
    bits: AtomicU32,

    /// Thread currently allowed to consume the bits.
    waiter: ArcSwapOption<Thread>,
}

impl FlagGroup {
    pub(crate) fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
            waiter: ArcSwapOption::empty(),
        }
    }

    /// Merges `bits` into the set and wakes the waiter, if any.
    pub(crate) fn set(&self, bits: Signal) {
        self.bits.fetch_or(bits.bits(), Ordering::AcqRel);

        if let Some(waiter) = &*self.waiter.load() {
            waiter.unpark();
        }
    }

    /// Blocks until at least one bit of `mask` is set or `timeout` elapses.
    ///
    /// Returns the requested bits that were set and clears them. An empty
    /// result means the wait timed out. `None` waits without bound.
    pub(crate) fn wait(&self, mask: Signal, timeout: Option<Duration>) -> Signal {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let unbounded = timeout.is_none() || deadline.is_none();

        self.register_current();

        loop {
            let taken = self.take(mask);
            if !taken.is_empty() {
                return taken;
            }

            if unbounded {
                thread::park();
                continue;
            }

            let now = Instant::now();
            match deadline {
                Some(deadline) if now < deadline => thread::park_timeout(deadline - now),
                _ => return Signal::empty(),
            }
        }
    }

    /// Forgets the waiter once the dispatcher leaves its loop.
    pub(crate) fn release_waiter(&self) {
        self.waiter.store(None);
    }

    fn take(&self, mask: Signal) -> Signal {
        let previous = self.bits.fetch_and(!mask.bits(), Ordering::AcqRel);
        Signal::from_bits_truncate(previous & mask.bits())
    }

    fn register_current(&self) {
        let current = thread::current();

        let registered = match &*self.waiter.load() {
            Some(waiter) => waiter.id() == current.id(),
            None => false,
        };

        if !registered {
            self.waiter.store(Some(Arc::new(current)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FlagGroup, Signal};

    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_bits_accumulate_without_waiter() {
        let flags = FlagGroup::new();
        flags.set(Signal::IO);
        flags.set(Signal::EVENT);

        let got = flags.wait(Signal::all(), Some(Duration::ZERO));
        assert_eq!(got, Signal::IO | Signal::EVENT);

        // Consumed.
        assert!(flags.wait(Signal::all(), Some(Duration::ZERO)).is_empty());
    }

    #[test]
    fn test_wait_only_clears_requested_bits() {
        let flags = FlagGroup::new();
        flags.set(Signal::IO | Signal::TIMER);

        assert_eq!(flags.wait(Signal::TIMER, Some(Duration::ZERO)), Signal::TIMER);
        assert_eq!(flags.wait(Signal::all(), Some(Duration::ZERO)), Signal::IO);
    }

    #[test]
    fn test_wait_times_out() {
        let flags = FlagGroup::new();
        let start = Instant::now();

        let got = flags.wait(Signal::all(), Some(Duration::from_millis(30)));

        assert!(got.is_empty());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_set_from_another_thread_wakes_waiter() {
        let flags = Arc::new(FlagGroup::new());
        let setter = flags.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            setter.set(Signal::EVENT);
        });

        let start = Instant::now();
        let got = flags.wait(Signal::all(), None);

        assert_eq!(got, Signal::EVENT);
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }
}
