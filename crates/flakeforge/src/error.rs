use core::{fmt, time::Duration};

#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Which half of a [`NodeId`] failed validation.
///
/// [`NodeId`]: crate::NodeId
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeField {
    /// The 5-bit datacenter identifier.
    Datacenter,
    /// The 5-bit worker identifier.
    Worker,
}

impl fmt::Display for NodeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Datacenter => f.write_str("datacenter id"),
            Self::Worker => f.write_str("worker id"),
        }
    }
}

/// All error variants that `flakeforge` can emit.
///
/// None of these are retried internally. Each one surfaces to the caller that
/// observed it, and the generator state is left exactly as it was before the
/// call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A worker or datacenter identifier is outside `0..=max`.
    ///
    /// The value is kept signed so that negative input to
    /// [`LazySnowflakeGenerator::next_id`] can be reported as given.
    ///
    /// [`LazySnowflakeGenerator::next_id`]: crate::LazySnowflakeGenerator::next_id
    #[error("{field} must be between 0 and {max}, got {value}")]
    InvalidNodeId {
        /// The offending field.
        field: NodeField,
        /// The rejected value.
        value: i64,
        /// The largest accepted value.
        max: u64,
    },

    /// The clock reported a time earlier than the last issued timestamp.
    ///
    /// No ID is produced until the clock catches up. `behind_ms` is the number
    /// of milliseconds the caller has to wait before a retry can succeed.
    #[error("clock moved backwards, refusing to generate ids for {behind_ms}ms")]
    ClockRegression {
        /// How far behind the last issued timestamp the clock is.
        behind_ms: u64,
    },

    /// The sequence for the current millisecond is used up and the clock did
    /// not advance within the configured [`SpinPolicy`] bound.
    ///
    /// Never returned with [`SpinPolicy::unbounded`].
    ///
    /// [`SpinPolicy`]: crate::SpinPolicy
    /// [`SpinPolicy::unbounded`]: crate::SpinPolicy::unbounded
    #[error("sequence exhausted, clock did not advance within {waited:?}")]
    SequenceExhausted {
        /// How long the generator spun before giving up.
        waited: Duration,
    },

    /// The elapsed time since the epoch no longer fits in the 41-bit
    /// timestamp field.
    #[error("timestamp {timestamp} does not fit in the 41-bit timestamp field")]
    TimestampOverflow {
        /// The rejected timestamp, in milliseconds since the epoch.
        timestamp: u64,
    },

    /// A raw value cannot be a [`SnowflakeId`]: it is negative, has the
    /// reserved sign bit set, or is not a decimal integer.
    ///
    /// [`SnowflakeId`]: crate::SnowflakeId
    #[error("invalid snowflake id: {value}")]
    InvalidId {
        /// The rejected input, as text.
        value: String,
    },

    /// A configuration value could not be parsed.
    #[error("invalid value for {key}: {reason}")]
    InvalidConfig {
        /// The configuration key (environment variable name).
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The operation failed because the lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, mutexes do **not** poison, so this
    /// variant is not available.
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

impl Error {
    /// For [`Error::ClockRegression`], the wait after which a retry can
    /// succeed. `None` for every other variant.
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::ClockRegression { behind_ms } => Some(Duration::from_millis(*behind_ms)),
            _ => None,
        }
    }
}

#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let err = Error::InvalidNodeId {
            field: NodeField::Worker,
            value: 32,
            max: 31,
        };
        assert_eq!(err.to_string(), "worker id must be between 0 and 31, got 32");

        let err = Error::ClockRegression { behind_ms: 7 };
        assert_eq!(
            err.to_string(),
            "clock moved backwards, refusing to generate ids for 7ms"
        );
    }

    #[test]
    fn retry_after_only_for_clock_regression() {
        let err = Error::ClockRegression { behind_ms: 15 };
        assert_eq!(err.retry_after(), Some(Duration::from_millis(15)));

        let err = Error::TimestampOverflow { timestamp: 1 << 41 };
        assert_eq!(err.retry_after(), None);
    }
}
