use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    error::Result,
    generator::{IdGenStatus, Mutex, SnowflakeGenerator, SpinPolicy, block_on_poll, step_for},
    id::{NodeId, SnowflakeId},
    time::TimeSource,
};

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The last issued ID (which carries both the last timestamp and the
/// sequence) lives behind an [`Arc<Mutex<_>>`]. Reading the clock, comparing
/// it against the last timestamp and storing the successor all happen while
/// the lock is held, so concurrent callers are fully serialized and can never
/// observe or reuse a stale timestamp.
///
/// Cloning the generator clones the handle: clones share state and keep
/// issuing from the same sequence.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Fair access across threads
///
/// ## See Also
/// - [`AtomicSnowflakeGenerator`]
/// - [`LazySnowflakeGenerator`]
///
/// [`AtomicSnowflakeGenerator`]: crate::generator::AtomicSnowflakeGenerator
/// [`LazySnowflakeGenerator`]: crate::generator::LazySnowflakeGenerator
pub struct LockSnowflakeGenerator<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    pub(crate) state: Arc<crossbeam_utils::CachePadded<Mutex<SnowflakeId>>>,
    #[cfg(not(feature = "cache-padded"))]
    pub(crate) state: Arc<Mutex<SnowflakeId>>,
    pub(crate) node: NodeId,
    pub(crate) time: T,
    pub(crate) spin: SpinPolicy,
}

impl<T> LockSnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new [`LockSnowflakeGenerator`] for the given node identity.
    ///
    /// Nothing has been issued yet: the first call always starts a fresh
    /// millisecond with sequence 0.
    ///
    /// # Parameters
    ///
    /// - `node`: The datacenter/worker identity, validated by
    ///   [`NodeId::new`]. Encoded into every generated ID.
    /// - `time`: A [`TimeSource`] implementation (e.g., [`SystemClock`] or
    ///   [`MonotonicClock`]) that determines how timestamps are generated.
    ///
    /// # Example
    /// ```
    /// use flakeforge::{LockSnowflakeGenerator, NodeId, SystemClock};
    ///
    /// let node = NodeId::new(1, 1).unwrap();
    /// let generator = LockSnowflakeGenerator::new(node, SystemClock::default());
    ///
    /// let a = generator.next_id().unwrap();
    /// let b = generator.next_id().unwrap();
    /// assert!(a < b);
    /// assert_eq!(a.node_id(), node);
    /// ```
    ///
    /// [`SystemClock`]: crate::time::SystemClock
    /// [`MonotonicClock`]: crate::time::MonotonicClock
    pub fn new(node: NodeId, time: T) -> Self {
        Self::with_state(SnowflakeId::unissued(node), node, time)
    }

    /// Creates a new ID generator from explicit component values.
    ///
    /// This constructor is primarily useful for advanced use cases such as
    /// resuming after a restart from a persisted high-water mark. The next ID
    /// will be strictly greater than the ID these components describe.
    ///
    /// # Errors
    /// - [`Error::TimestampOverflow`] if `timestamp` exceeds 41 bits
    /// - [`Error::InvalidId`] if `sequence` exceeds 4095
    ///
    /// # ⚠️ Note
    /// In typical use cases, you should prefer [`Self::new`].
    ///
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    /// [`Error::InvalidId`]: crate::Error::InvalidId
    pub fn from_components(timestamp: u64, node: NodeId, sequence: u64, time: T) -> Result<Self> {
        let last = SnowflakeId::try_from_components(timestamp, node, sequence)?;
        Ok(Self::with_state(last, node, time))
    }

    fn with_state(last: SnowflakeId, node: NodeId, time: T) -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            state: Arc::new(crossbeam_utils::CachePadded::new(Mutex::new(last))),
            #[cfg(not(feature = "cache-padded"))]
            state: Arc::new(Mutex::new(last)),
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
    /// - [`Error::ClockRegression`] if the clock is behind the last issued ID.
    ///   Nothing is recorded, so a retry after
    ///   [`Error::retry_after`] succeeds.
    /// - [`Error::TimestampOverflow`] once the epoch is more than 41 bits of
    ///   milliseconds in the past
    /// - [`Error::SequenceExhausted`] if a bounded [`SpinPolicy`] runs out
    /// - [`Error::LockPoisoned`] if the lock was poisoned
    ///
    /// [`Error::ClockRegression`]: crate::Error::ClockRegression
    /// [`Error::retry_after`]: crate::Error::retry_after
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    /// [`Error::SequenceExhausted`]: crate::Error::SequenceExhausted
    /// [`Error::LockPoisoned`]: crate::Error::LockPoisoned
    pub fn next_id(&self) -> Result<SnowflakeId> {
        block_on_poll(self.spin, |waiting| self.poll(waiting))
    }

    /// Attempts to generate the next ID without waiting.
    ///
    /// If the sequence for the current millisecond is used up, returns
    /// [`IdGenStatus::Pending`] with the millisecond to wait for; the lock is
    /// released before returning.
    ///
    /// # Returns
    /// - `Ok(IdGenStatus::Ready { id })`: A new ID is available
    /// - `Ok(IdGenStatus::Pending { yield_until })`: The timestamp to wait for
    ///   before trying again
    ///
    /// # Errors
    /// Same as [`Self::next_id`], except for `SequenceExhausted`.
    ///
    /// # Example
    /// ```
    /// use flakeforge::{IdGenStatus, LockSnowflakeGenerator, MonotonicClock, NodeId};
    ///
    /// let generator = LockSnowflakeGenerator::new(NodeId::default(), MonotonicClock::default());
    ///
    /// let id = loop {
    ///     match generator.try_poll_id() {
    ///         Ok(IdGenStatus::Ready { id }) => break id,
    ///         Ok(IdGenStatus::Pending { .. }) => std::thread::yield_now(),
    ///         Err(e) => panic!("Generator error: {e}"),
    ///     }
    /// };
    /// assert_eq!(id.sequence(), 0);
    /// ```
    pub fn try_poll_id(&self) -> Result<IdGenStatus> {
        self.poll(false)
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    fn poll(&self, waiting: bool) -> Result<IdGenStatus> {
        let mut id = {
            #[cfg(feature = "parking-lot")]
            {
                self.state.lock()
            }
            #[cfg(not(feature = "parking-lot"))]
            {
                self.state.lock()?
            }
        };

        let now = self.time.current_millis();
        let status = step_for(waiting)(*id, now)?;
        if let IdGenStatus::Ready { id: next } = status {
            *id = next;
        }
        Ok(status)
    }
}

impl<T> Clone for LockSnowflakeGenerator<T>
where
    T: TimeSource + Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            node: self.node,
            time: self.time.clone(),
            spin: self.spin,
        }
    }
}

impl<T> SnowflakeGenerator for LockSnowflakeGenerator<T>
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
