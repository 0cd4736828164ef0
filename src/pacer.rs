//! Transmit pacing.
//!
//! The [`Pacer`] enforces a minimum interval between the *starts* of two
//! consecutive transmissions. It never drops or reorders anything; the
//! transmit queue simply reports nothing to drain until the interval has
//! passed.
//!
//! Time comes from a [`quanta::Clock`], so tests can drive it with
//! [`quanta::Clock::mock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use quanta::{Clock, Instant};

use crate::protocol::MIN_TX_INTERVAL;

/// Marker for "nothing transmitted yet".
const NEVER: u64 = u64::MAX;

/// Minimum-interval gate for the transmit path.
#[derive(Debug)]
pub struct Pacer {
    clock: Clock,
    epoch: Instant,
    min_interval: Duration,
    /// Nanoseconds since `epoch` at which the last transmission started.
    last_start: AtomicU64,
}

impl Pacer {
    /// Create a pacer with the default interval on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Clock::new(), MIN_TX_INTERVAL)
    }

    /// Create a pacer on a specific clock.
    pub fn with_clock(clock: Clock, min_interval: Duration) -> Self {
        let epoch = clock.now();
        Self {
            clock,
            epoch,
            min_interval,
            last_start: AtomicU64::new(NEVER),
        }
    }

    /// Configured minimum interval.
    #[inline]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Check if a new transmission may start now.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Time left before a new transmission may start.
    pub fn remaining(&self) -> Duration {
        let last = self.last_start.load(Ordering::Acquire);
        if last == NEVER {
            return Duration::ZERO;
        }
        let elapsed = Duration::from_nanos(self.now_nanos().saturating_sub(last));
        self.min_interval.saturating_sub(elapsed)
    }

    /// Record that a transmission starts now.
    pub fn mark_started(&self) {
        self.last_start.store(self.now_nanos(), Ordering::Release);
    }

    /// Forget the last transmission.
    pub fn reset(&self) {
        self.last_start.store(NEVER, Ordering::Release);
    }

    fn now_nanos(&self) -> u64 {
        let nanos = self
            .clock
            .now()
            .saturating_duration_since(self.epoch)
            .as_nanos();
        // Stay clear of the sentinel.
        nanos.min((NEVER - 1) as u128) as u64
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_before_first_transmission() {
        let (clock, _mock) = Clock::mock();
        let pacer = Pacer::with_clock(clock, MIN_TX_INTERVAL);
        assert!(pacer.is_ready());
        assert_eq!(pacer.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_interval_enforced() {
        let (clock, mock) = Clock::mock();
        let pacer = Pacer::with_clock(clock, Duration::from_millis(100));

        pacer.mark_started();
        assert!(!pacer.is_ready());
        assert_eq!(pacer.remaining(), Duration::from_millis(100));

        mock.increment(Duration::from_millis(60));
        assert_eq!(pacer.remaining(), Duration::from_millis(40));

        mock.increment(Duration::from_millis(40));
        assert!(pacer.is_ready());
    }

    #[test]
    fn test_reset() {
        let (clock, _mock) = Clock::mock();
        let pacer = Pacer::with_clock(clock, Duration::from_millis(100));
        pacer.mark_started();
        assert!(!pacer.is_ready());
        pacer.reset();
        assert!(pacer.is_ready());
    }

    #[test]
    fn test_zero_interval() {
        let (clock, _mock) = Clock::mock();
        let pacer = Pacer::with_clock(clock, Duration::ZERO);
        pacer.mark_started();
        assert!(pacer.is_ready());
    }
}
