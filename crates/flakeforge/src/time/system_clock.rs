use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::time::{TWITTER_EPOCH, TimeSource};

/// A wall-clock time source that reads [`SystemTime::now`] on every call.
///
/// Readings follow the operating system clock, including NTP steps backwards.
/// A generator driven by this clock reports such a step as
/// [`Error::ClockRegression`] rather than issuing a duplicate or decreasing ID.
/// Use [`MonotonicClock`] if the process should never observe a regression.
///
/// Times before the epoch read as `0`.
///
/// [`Error::ClockRegression`]: crate::Error::ClockRegression
/// [`MonotonicClock`]: crate::MonotonicClock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SystemClock {
    epoch: SystemTime,
}

impl Default for SystemClock {
    /// Constructs a wall clock aligned to [`TWITTER_EPOCH`].
    fn default() -> Self {
        Self::with_epoch(TWITTER_EPOCH)
    }
}

impl SystemClock {
    /// Constructs a wall clock whose zero point is `epoch`, given as a
    /// [`Duration`] since 1970-01-01 UTC.
    ///
    /// ```
    /// use flakeforge::{SystemClock, TimeSource, CUSTOM_EPOCH};
    ///
    /// let clock = SystemClock::with_epoch(CUSTOM_EPOCH);
    /// assert!(clock.current_millis() > 0);
    /// ```
    pub fn with_epoch(epoch: Duration) -> Self {
        Self {
            epoch: UNIX_EPOCH + epoch,
        }
    }

    /// Returns the configured epoch as a [`Duration`] since the Unix epoch.
    pub fn epoch(&self) -> Duration {
        self.epoch
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
    }
}

impl TimeSource for SystemClock {
    #[allow(clippy::cast_possible_truncation)]
    fn current_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.epoch)
            .map_or(0, |elapsed| elapsed.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_unix_time_minus_epoch() {
        let clock = SystemClock::with_epoch(TWITTER_EPOCH);
        let unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let ts = clock.current_millis();
        let expected = unix_ms - TWITTER_EPOCH.as_millis() as u64;
        assert!(ts >= expected && ts - expected < 1_000, "{ts} vs {expected}");
        assert_eq!(clock.epoch(), TWITTER_EPOCH);
    }

    #[test]
    fn future_epoch_reads_zero() {
        let far_future = Duration::from_secs(u64::from(u32::MAX) * 4);
        let clock = SystemClock::with_epoch(far_future);
        assert_eq!(clock.current_millis(), 0);
    }
}
