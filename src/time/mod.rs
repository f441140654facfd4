//! Monotonic time source.
//!
//! The event loop never reads wall-clock time. Deadlines are computed from a
//! [`Clock`] that reports microseconds since an arbitrary, fixed origin.

mod clock;

#[doc(inline)]
pub use clock::{Clock, MonotonicClock};
