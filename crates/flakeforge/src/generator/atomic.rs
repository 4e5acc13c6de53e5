use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    error::Result,
    generator::{IdGenStatus, SnowflakeGenerator, SpinPolicy, block_on_poll, step_for},
    id::{NodeId, SnowflakeId},
    time::TimeSource,
};

/// A lock-free Snowflake ID generator suitable for multi-threaded environments.
///
/// The last issued ID is stored in a single [`AtomicU64`]. Because timestamp
/// and sequence live in the same word, one `compare_exchange` publishes both,
/// and a caller that loses the race simply recomputes from the winner's value.
///
/// Each attempt loads the state *before* reading the clock. A concurrent
/// winner therefore always stored a timestamp read earlier than ours, and is
/// never mistaken for a clock regression.
///
/// ## Features
/// - ✅ Thread-safe
/// - ❌ Fair access: under heavy contention a thread may lose several races
///
/// ## Recommended When
/// - You're in a multi-threaded environment
/// - Fair access is sacrificed for higher throughput
///
/// ## See Also
/// - [`LockSnowflakeGenerator`]
///
/// [`LockSnowflakeGenerator`]: crate::generator::LockSnowflakeGenerator
pub struct AtomicSnowflakeGenerator<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicU64,
    node: NodeId,
    time: T,
    spin: SpinPolicy,
}

impl<T> AtomicSnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new [`AtomicSnowflakeGenerator`] for the given node identity.
    ///
    /// # Example
    /// ```
    /// use flakeforge::{AtomicSnowflakeGenerator, MonotonicClock, NodeId};
    ///
    /// let generator = AtomicSnowflakeGenerator::new(NodeId::new(0, 7).unwrap(), MonotonicClock::default());
    ///
    /// let id = generator.next_id().unwrap();
    /// assert_eq!(id.worker_id(), 7);
    /// ```
    pub fn new(node: NodeId, time: T) -> Self {
        Self::with_state(SnowflakeId::unissued(node), node, time)
    }

    /// Creates a new ID generator from explicit component values.
    ///
    /// # Errors
    /// Same as [`LockSnowflakeGenerator::from_components`].
    ///
    /// # ⚠️ Note
    /// In typical use cases, you should prefer [`Self::new`].
    ///
    /// [`LockSnowflakeGenerator::from_components`]: crate::LockSnowflakeGenerator::from_components
    pub fn from_components(timestamp: u64, node: NodeId, sequence: u64, time: T) -> Result<Self> {
        let last = SnowflakeId::try_from_components(timestamp, node, sequence)?;
        Ok(Self::with_state(last, node, time))
    }

    fn with_state(last: SnowflakeId, node: NodeId, time: T) -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(AtomicU64::new(last.to_raw())),
            #[cfg(not(feature = "cache-padded"))]
            state: AtomicU64::new(last.to_raw()),
            node,
            time,
            spin: SpinPolicy::unbounded(),
        }
    }

    /// Replaces the policy used by [`Self::next_id`] when the sequence is
    /// exhausted.
    #[must_use]
    pub fn with_spin_policy(mut self, spin: SpinPolicy) -> Self {
        self.spin = spin;
        self
    }

    /// The identity embedded in every ID this generator issues.
    pub const fn node_id(&self) -> NodeId {
        self.node
    }

    /// Generates the next ID, spinning while the current millisecond's
    /// sequence is exhausted.
    ///
    /// # Errors
    /// See [`SnowflakeGenerator::next_id`]. This generator never returns
    /// `LockPoisoned`.
    pub fn next_id(&self) -> Result<SnowflakeId> {
        block_on_poll(self.spin, |waiting| self.poll(waiting))
    }

    /// Attempts to generate the next ID without waiting for the clock.
    ///
    /// Lost CAS races are retried internally; `Pending` is only returned
    /// when the sequence for the current millisecond is exhausted.
    ///
    /// # Errors
    /// - [`Error::ClockRegression`] if the clock is behind the last issued ID
    /// - [`Error::TimestampOverflow`] if the clock is past the 41-bit range
    ///
    /// [`Error::ClockRegression`]: crate::Error::ClockRegression
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    pub fn try_poll_id(&self) -> Result<IdGenStatus> {
        self.poll(false)
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    fn poll(&self, waiting: bool) -> Result<IdGenStatus> {
        let step = step_for(waiting);
        let mut current_raw = self.state.load(Ordering::Acquire);

        loop {
            let now = self.time.current_millis();
            let status = step(SnowflakeId::from_raw(current_raw), now)?;
            let IdGenStatus::Ready { id } = status else {
                return Ok(status);
            };

            match self.state.compare_exchange_weak(
                current_raw,
                id.to_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(status),
                Err(actual) => {
                    // Another thread won the race; recompute from its value.
                    current_raw = actual;
                    core::hint::spin_loop();
                }
            }
        }
    }
}

impl<T> SnowflakeGenerator for AtomicSnowflakeGenerator<T>
where
    T: TimeSource,
{
    fn node_id(&self) -> NodeId {
        self.node_id()
    }

    fn spin_policy(&self) -> SpinPolicy {
        self.spin
    }

    fn try_poll_id(&self) -> Result<IdGenStatus> {
        self.try_poll_id()
    }

    fn next_id(&self) -> Result<SnowflakeId> {
        self.next_id()
    }
}
