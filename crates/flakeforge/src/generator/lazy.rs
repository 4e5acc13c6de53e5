#[cfg(feature = "tracing")]
use tracing::{debug, info, instrument};

use crate::{
    error::Result,
    generator::{IdGenStatus, Mutex, MutexGuard, SpinPolicy, step_for},
    id::{NodeId, SnowflakeId},
    time::TimeSource,
};

struct LazyState {
    node: Option<NodeId>,
    last: SnowflakeId,
}

/// A generator whose node identity is fixed by its first successful call.
///
/// This reproduces the classic `NextId(workerId, datacenterId)` contract:
/// every call passes an identity, but only the first one that validates is
/// applied. Later arguments are ignored without being checked. If the first
/// call fails validation, the generator stays unconfigured and the next call
/// tries again with its own arguments.
///
/// Unlike [`LockSnowflakeGenerator`], the lock is held for the entire call,
/// including the wait for the clock when the sequence is exhausted.
///
/// Prefer [`LockSnowflakeGenerator`] for new code: it fixes the identity at
/// construction and has no misleading per-call parameters.
///
/// # Example
/// ```
/// use flakeforge::{LazySnowflakeGenerator, SystemClock};
///
/// let generator = LazySnowflakeGenerator::new(SystemClock::default());
///
/// let first = generator.next_id(3, 1).unwrap();
/// assert_eq!((first.worker_id(), first.datacenter_id()), (3, 1));
///
/// // The identity is already fixed, so these arguments are ignored.
/// let second = generator.next_id(9, 9).unwrap();
/// assert_eq!((second.worker_id(), second.datacenter_id()), (3, 1));
/// assert!(second > first);
/// ```
///
/// [`LockSnowflakeGenerator`]: crate::generator::LockSnowflakeGenerator
pub struct LazySnowflakeGenerator<T>
where
    T: TimeSource,
{
    state: Mutex<LazyState>,
    time: T,
    spin: SpinPolicy,
}

impl<T> LazySnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates an unconfigured generator.
    pub fn new(time: T) -> Self {
        Self {
            state: Mutex::new(LazyState {
                node: None,
                last: SnowflakeId::unissued(NodeId::default()),
            }),
            time,
            spin: SpinPolicy::unbounded(),
        }
    }

    /// Replaces the policy used when the sequence is exhausted.
    #[must_use]
    pub fn with_spin_policy(mut self, spin: SpinPolicy) -> Self {
        self.spin = spin;
        self
    }

    /// The fixed identity, or `None` if no call has succeeded in fixing one.
    ///
    /// # Errors
    /// Returns [`Error::LockPoisoned`] if the lock was poisoned.
    ///
    /// [`Error::LockPoisoned`]: crate::Error::LockPoisoned
    pub fn node_id(&self) -> Result<Option<NodeId>> {
        Ok(self.lock()?.node)
    }

    /// Generates the next ID.
    ///
    /// `worker_id` and `datacenter_id` are validated and applied only if the
    /// identity is not yet fixed; otherwise they are ignored.
    ///
    /// # Errors
    /// - [`Error::InvalidNodeId`] if the identity is not yet fixed and either
    ///   argument is outside `0..=31`. The generator stays unconfigured, as
    ///   it does after any other failed call.
    /// - [`Error::ClockRegression`] if the clock is behind the last issued ID.
    ///   The identity stays fixed and the last timestamp is unchanged.
    /// - [`Error::TimestampOverflow`] if the clock is past the 41-bit range
    /// - [`Error::SequenceExhausted`] if a bounded [`SpinPolicy`] runs out
    /// - [`Error::LockPoisoned`] if the lock was poisoned
    ///
    /// [`Error::InvalidNodeId`]: crate::Error::InvalidNodeId
    /// [`Error::ClockRegression`]: crate::Error::ClockRegression
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    /// [`Error::SequenceExhausted`]: crate::Error::SequenceExhausted
    /// [`Error::LockPoisoned`]: crate::Error::LockPoisoned
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self, worker_id: i64, datacenter_id: i64) -> Result<SnowflakeId> {
        let mut state = self.lock()?;

        // A new identity is only stored once an ID has been issued with it.
        let (node, last, fixing) = match state.node {
            None => {
                let node = NodeId::from_signed(datacenter_id, worker_id)?;
                (node, SnowflakeId::unissued(node), true)
            }
            Some(node) => {
                #[cfg(feature = "tracing")]
                log_ignored_identity(node, worker_id, datacenter_id);
                (node, state.last, false)
            }
        };

        let mut spinner = self.spin.spinner();
        let mut waiting = false;
        let id = loop {
            let now = self.time.current_millis();
            match step_for(waiting)(last, now)? {
                IdGenStatus::Ready { id } => break id,
                IdGenStatus::Pending { .. } => {
                    waiting = true;
                    spinner.wait()?;
                }
            }
        };

        if fixing {
            #[cfg(feature = "tracing")]
            info!(%node, "node identity fixed");
            state.node = Some(node);
        }
        state.last = id;
        Ok(id)
    }

    #[allow(clippy::unnecessary_wraps)]
    fn lock(&self) -> Result<MutexGuard<'_, LazyState>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            Ok(self.state.lock()?)
        }
    }
}

#[cfg(feature = "tracing")]
fn log_ignored_identity(node: NodeId, worker_id: i64, datacenter_id: i64) {
    if u64::try_from(worker_id) != Ok(node.worker_id())
        || u64::try_from(datacenter_id) != Ok(node.datacenter_id())
    {
        debug!(%node, worker_id, datacenter_id, "identity already fixed, ignoring arguments");
    }
}
