//! Monotonic time source. Every timestamp handled by the node (reception
//! times, session ages, heartbeat uptime) comes from it.

/// Microsecond clock that never goes backwards.
pub trait MonotonicClock {
    /// Microseconds elapsed since an arbitrary, fixed origin.
    fn now_usec(&self) -> u64;
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for &C {
    fn now_usec(&self) -> u64 {
        (**self).now_usec()
    }
}
