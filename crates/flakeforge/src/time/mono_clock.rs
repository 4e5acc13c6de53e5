use core::time::Duration;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::time::{TWITTER_EPOCH, TimeSource};

/// A monotonic time source aligned to a user-defined epoch.
///
/// The wall clock is sampled exactly once, at construction, to compute the
/// offset between the epoch and "now". Every later reading adds the
/// [`Instant`] elapsed since construction to that offset, so the clock never
/// goes backward even if the system clock is stepped by NTP or an operator.
///
/// The trade-off is drift: over a long-lived process the readings can
/// diverge from wall time by however much the system clock was adjusted.
///
/// Cloning is cheap and clones share the same anchor.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
    epoch_offset: u64, // in milliseconds
}

impl Default for MonotonicClock {
    /// Constructs a monotonic clock aligned to [`TWITTER_EPOCH`].
    ///
    /// Panics if system time is earlier than the epoch.
    fn default() -> Self {
        Self::with_epoch(TWITTER_EPOCH)
    }
}

impl MonotonicClock {
    /// Constructs a monotonic clock using `epoch` as the origin (t = 0),
    /// specified as a [`Duration`] since 1970-01-01 UTC.
    ///
    /// # Panics
    ///
    /// Panics if the current system time is earlier than the given epoch.
    ///
    /// # Example
    ///
    /// ```
    /// use flakeforge::{MonotonicClock, TimeSource, TWITTER_EPOCH};
    ///
    /// let clock = MonotonicClock::with_epoch(TWITTER_EPOCH);
    /// let a = clock.current_millis();
    /// let b = clock.current_millis();
    /// assert!(b >= a);
    /// ```
    #[allow(clippy::cast_possible_truncation)]
    pub fn with_epoch(epoch: Duration) -> Self {
        let start = Instant::now();
        let system_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("System clock before UNIX_EPOCH");
        let epoch_offset = system_now
            .checked_sub(epoch)
            .expect("System clock before custom epoch")
            .as_millis() as u64;

        Self {
            start,
            epoch_offset,
        }
    }
}

impl TimeSource for MonotonicClock {
    /// Returns the number of milliseconds since the configured epoch, based on
    /// the elapsed monotonic time since construction.
    #[allow(clippy::cast_possible_truncation)]
    fn current_millis(&self) -> u64 {
        self.epoch_offset + self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CUSTOM_EPOCH, SystemClock};

    #[test]
    fn never_goes_backwards() {
        let clock = MonotonicClock::with_epoch(CUSTOM_EPOCH);
        let mut last = clock.current_millis();
        for _ in 0..10_000 {
            let now = clock.current_millis();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn starts_near_wall_clock() {
        let mono = MonotonicClock::default();
        let wall = SystemClock::default();
        let diff = wall.current_millis().abs_diff(mono.current_millis());
        assert!(diff < 1_000, "monotonic and wall clocks differ by {diff}ms");
    }

    #[test]
    fn advances_with_real_time() {
        let clock = MonotonicClock::default();
        let before = clock.current_millis();
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.current_millis() >= before + 4);
    }

    #[test]
    #[should_panic(expected = "System clock before custom epoch")]
    fn panics_on_future_epoch() {
        let _ = MonotonicClock::with_epoch(Duration::from_secs(u64::from(u32::MAX) * 4));
    }
}
