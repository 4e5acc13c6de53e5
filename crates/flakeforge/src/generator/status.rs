use crate::id::SnowflakeId;

/// Represents the result of attempting to generate a new Snowflake ID.
///
/// This type models the outcome of `try_poll_id()`:
///
/// - [`IdGenStatus::Ready`] indicates a new ID was successfully generated.
/// - [`IdGenStatus::Pending`] means the generator is throttled and cannot
///   produce a new ID until the clock advances to `yield_until`.
///
/// This allows non-blocking generation loops and clean backoff strategies.
///
/// # Example
///
/// ```
/// use flakeforge::{IdGenStatus, LockSnowflakeGenerator, NodeId, TimeSource};
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1
///     }
/// }
///
/// let generator = LockSnowflakeGenerator::new(NodeId::new(1, 1).unwrap(), FixedTime);
/// match generator.try_poll_id().unwrap() {
///     IdGenStatus::Ready { id } => println!("ID: {}", id.timestamp()),
///     IdGenStatus::Pending { yield_until } => println!("Back off until: {yield_until}"),
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated Snowflake ID.
        id: SnowflakeId,
    },
    /// No ID could be generated because the sequence has been exhausted for the
    /// current tick.
    ///
    /// You should wait until the clock reaches or exceeds `yield_until` before
    /// attempting to generate a new ID again.
    Pending {
        /// The next timestamp (inclusive) at which you may resume generating
        /// IDs.
        yield_until: u64,
    },
}

#[cfg(test)]
impl IdGenStatus {
    pub(crate) fn unwrap_ready(self) -> SnowflakeId {
        match self {
            Self::Ready { id } => id,
            Self::Pending { yield_until } => {
                panic!("unexpected pending (yield until: {yield_until})")
            }
        }
    }

    pub(crate) fn unwrap_pending(self) -> u64 {
        match self {
            Self::Ready { id } => panic!("unexpected ready ({id})"),
            Self::Pending { yield_until } => yield_until,
        }
    }
}
