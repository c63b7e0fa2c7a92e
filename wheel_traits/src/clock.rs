//! Time source seam.
//!
//! Loop pacing and timeout arithmetic go through `Clock` so the control
//! and bridge loops can run against simulated time in tests. `now` must be
//! monotonic; `sleep` may block (real clock) or merely advance (test
//! clock).

use std::thread;
use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);
}

/// Production clock over `Instant::now` and `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, d: Duration) {
        if !d.is_zero() {
            thread::sleep(d);
        }
    }
}

/// Simulated time for tests. Lives outside `#[cfg(test)]` so integration
/// tests in dependent crates can drive loop timing.
pub mod test_clock {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{Duration, Instant};

    use super::Clock;

    /// A fixed origin plus a shared atomic nanosecond offset. Clones share
    /// the offset, so a test can hold one handle while the loop under test
    /// owns another. `sleep` advances time instead of blocking, which makes
    /// paced loops run instantly and deterministically.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset_ns: Arc<AtomicU64>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset_ns: Arc::new(AtomicU64::new(0)),
            }
        }

        pub fn advance(&self, d: Duration) {
            let ns = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
            self.offset_ns.fetch_add(ns, Ordering::Relaxed);
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + Duration::from_nanos(self.offset_ns.load(Ordering::Relaxed))
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::TestClock;
    use super::*;

    #[test]
    fn test_clock_only_moves_when_advanced() {
        let c = TestClock::new();
        let t0 = c.now();
        assert_eq!(c.now(), t0);
        c.advance(Duration::from_millis(10));
        assert_eq!(c.now() - t0, Duration::from_millis(10));
    }

    #[test]
    fn test_clock_clones_share_time() {
        let a = TestClock::new();
        let b = a.clone();
        b.sleep(Duration::from_secs(1));
        assert_eq!(a.now() - b.now(), Duration::ZERO);
    }
}
