use core::time::Duration;
use std::sync::Arc;

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
///
/// The default for every clock in this crate.
pub const TWITTER_EPOCH: Duration = Duration::from_millis(1_288_834_974_657);

/// Discord epoch: Thursday, January 1, 2015 00:00:00 UTC
pub const DISCORD_EPOCH: Duration = Duration::from_millis(1_420_070_400_000);

/// Custom epoch: Wednesday, January 1, 2025 00:00:00 UTC
pub const CUSTOM_EPOCH: Duration = Duration::from_millis(1_735_689_600_000);

/// A source of millisecond timestamps relative to some epoch.
///
/// Generators read it once per attempt, inside their critical section. It may
/// return a value lower than a previous one (a wall clock being stepped back);
/// generators detect that and fail with [`Error::ClockRegression`] instead of
/// issuing an ID.
///
/// # Example
///
/// ```
/// use flakeforge::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
///
/// [`Error::ClockRegression`]: crate::Error::ClockRegression
pub trait TimeSource {
    /// Returns the current time in milliseconds since the configured epoch.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}
