use core::time::Duration;
use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::{
    error::{Error, Result},
    generator::IdGenStatus,
    id::SnowflakeId,
};

/// Number of busy spins between each `yield_now`.
const SPINS_PER_YIELD: u32 = 64;

/// How a blocking `next_id` waits out an exhausted sequence.
///
/// When 4096 IDs have been issued within one millisecond, the generator has to
/// wait for the clock to tick. It polls the clock in a loop, hinting the CPU
/// with [`core::hint::spin_loop`] and giving up its time slice every
/// few iterations.
///
/// With [`SpinPolicy::unbounded`] (the default) the wait ends only when the
/// clock advances. [`SpinPolicy::bounded`] caps it and fails with
/// [`Error::SequenceExhausted`] once the cap is reached, which protects
/// callers from a clock that has stopped.
///
/// ```
/// use core::time::Duration;
/// use flakeforge::SpinPolicy;
///
/// let policy = SpinPolicy::bounded(Duration::from_millis(50));
/// assert_eq!(policy.max_wait(), Some(Duration::from_millis(50)));
/// assert_eq!(SpinPolicy::default(), SpinPolicy::unbounded());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpinPolicy {
    max_wait: Option<Duration>,
}

impl SpinPolicy {
    /// Wait for the clock as long as it takes.
    pub const fn unbounded() -> Self {
        Self { max_wait: None }
    }

    /// Wait at most `max_wait` for the clock, then fail.
    pub const fn bounded(max_wait: Duration) -> Self {
        Self {
            max_wait: Some(max_wait),
        }
    }

    /// The configured bound, if any.
    pub const fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    pub(crate) const fn spinner(self) -> Spinner {
        Spinner {
            policy: self,
            started: None,
            spins: 0,
        }
    }
}

/// Per-call wait state.
pub(crate) struct Spinner {
    policy: SpinPolicy,
    started: Option<Instant>,
    spins: u32,
}

impl Spinner {
    /// Waits one round. Fails once the policy's bound is exceeded.
    pub(crate) fn wait(&mut self) -> Result<()> {
        let started = match self.started {
            Some(started) => started,
            None => {
                #[cfg(feature = "tracing")]
                debug!("sequence exhausted, waiting for the clock to advance");
                *self.started.insert(Instant::now())
            }
        };

        if let Some(max_wait) = self.policy.max_wait {
            let waited = started.elapsed();
            if waited >= max_wait {
                return Err(Error::SequenceExhausted { waited });
            }
        }

        self.spins = self.spins.wrapping_add(1);
        if self.spins % SPINS_PER_YIELD == 0 {
            std::thread::yield_now();
        } else {
            core::hint::spin_loop();
        }
        Ok(())
    }
}

/// Drives a poll function until it yields an ID, waiting per `policy`.
///
/// `poll` is told whether the call is already waiting, i.e. whether an
/// earlier poll returned [`IdGenStatus::Pending`].
pub(crate) fn block_on_poll(
    policy: SpinPolicy,
    mut poll: impl FnMut(bool) -> Result<IdGenStatus>,
) -> Result<SnowflakeId> {
    let mut spinner = policy.spinner();
    let mut waiting = false;
    loop {
        match poll(waiting)? {
            IdGenStatus::Ready { id } => return Ok(id),
            IdGenStatus::Pending { .. } => {
                waiting = true;
                spinner.wait()?;
            }
        }
    }
}
