use std::thread;
use std::time::{Duration, Instant};

/// Monotonic millisecond clock for live loops that have to produce their own
/// tick counter (the estimator itself only ever sees the counter value).
///
/// - now_ms(): milliseconds since the clock's epoch
/// - sleep(): sleeps for the provided duration (implementations may simulate)
pub trait Clock {
    fn now_ms(&self) -> u64;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since an earlier `now_ms()` reading, saturating at 0.
    fn ms_since(&self, earlier_ms: u64) -> u64 {
        self.now_ms().saturating_sub(earlier_ms)
    }
}

/// Real-time clock backed by std::time::Instant.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_ms(&self) -> u64 {
        let ms = self.epoch.elapsed().as_millis();
        ms.min(u128::from(u64::MAX)) as u64
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

pub mod test_clock {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Deterministic clock whose time only moves when told to.
    ///
    /// sleep(d) advances internal time by d without actually sleeping.
    #[derive(Debug, Clone, Default)]
    pub struct ManualClock {
        now: Arc<AtomicU64>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self::default()
        }

        /// Advance the clock by `ms` milliseconds.
        pub fn advance_ms(&self, ms: u64) {
            self.now.fetch_add(ms, Ordering::Relaxed);
        }

        /// Set the absolute time in milliseconds.
        pub fn set_ms(&self, ms: u64) {
            self.now.store(ms, Ordering::Relaxed);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u64 {
            self.now.load(Ordering::Relaxed)
        }

        fn sleep(&self, d: Duration) {
            let ms = d.as_millis().min(u128::from(u64::MAX)) as u64;
            self.advance_ms(ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::ManualClock;
    use super::*;

    #[test]
    fn manual_clock_moves_only_on_sleep() {
        let c = ManualClock::new();
        assert_eq!(c.now_ms(), 0);
        c.sleep(Duration::from_millis(250));
        assert_eq!(c.now_ms(), 250);
        assert_eq!(c.ms_since(100), 150);
        assert_eq!(c.ms_since(1_000), 0);
    }

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let c = MonotonicClock::new();
        let a = c.now_ms();
        c.sleep(Duration::from_millis(2));
        assert!(c.now_ms() >= a);
    }
}
