use crate::{
    error::Result,
    generator::{IdGenStatus, SpinPolicy, block_on_poll},
    id::{NodeId, SnowflakeId},
};

/// A minimal interface for generating Snowflake IDs with a fixed node
/// identity.
///
/// Implementors provide the non-blocking [`try_poll_id`]; the blocking
/// [`next_id`] is derived from it.
///
/// [`try_poll_id`]: SnowflakeGenerator::try_poll_id
/// [`next_id`]: SnowflakeGenerator::next_id
pub trait SnowflakeGenerator {
    /// The identity embedded in every ID this generator issues.
    fn node_id(&self) -> NodeId;

    /// How [`SnowflakeGenerator::next_id`] waits out an exhausted sequence.
    fn spin_policy(&self) -> SpinPolicy;

    /// Attempts to generate the next ID without waiting.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRegression`] if the clock is behind the last issued ID
    /// - [`Error::TimestampOverflow`] if the clock is past the 41-bit range
    /// - [`Error::LockPoisoned`] for lock-based generators whose lock was
    ///   poisoned
    ///
    /// [`Error::ClockRegression`]: crate::Error::ClockRegression
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    /// [`Error::LockPoisoned`]: crate::Error::LockPoisoned
    fn try_poll_id(&self) -> Result<IdGenStatus>;

    /// Generates the next ID, spinning while the current millisecond's
    /// sequence is exhausted.
    ///
    /// # Errors
    ///
    /// Everything [`SnowflakeGenerator::try_poll_id`] returns, plus
    /// [`Error::SequenceExhausted`] when a bounded [`SpinPolicy`] runs out.
    ///
    /// The generators in this crate override this so that a clock lagging
    /// behind while they wait does not end the call. This default polls
    /// [`SnowflakeGenerator::try_poll_id`] unchanged.
    ///
    /// [`Error::SequenceExhausted`]: crate::Error::SequenceExhausted
    fn next_id(&self) -> Result<SnowflakeId> {
        block_on_poll(self.spin_policy(), |_| self.try_poll_id())
    }
}
