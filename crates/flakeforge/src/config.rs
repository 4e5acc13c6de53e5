//! Node identity and epoch configuration.
//!
//! The embedding application decides where these values come from: code,
//! environment variables, or any serde-compatible config file. Whatever the
//! source, the identity is validated once when it is turned into a
//! [`NodeId`], before any generator exists.
//!
//! ## Environment variables
//! - `FLAKEFORGE_DATACENTER_ID`: datacenter ID, `0..=31` (default `1`)
//! - `FLAKEFORGE_WORKER_ID`: worker ID, `0..=31` (default `1`)
//! - `FLAKEFORGE_EPOCH_MS`: epoch in milliseconds since the Unix epoch
//!   (default [`TWITTER_EPOCH`])

use core::time::Duration;

use crate::{
    error::{Error, Result},
    generator::{AtomicSnowflakeGenerator, LazySnowflakeGenerator, LockSnowflakeGenerator},
    id::NodeId,
    time::{MonotonicClock, SystemClock, TWITTER_EPOCH},
};

/// Environment variable holding the datacenter ID.
pub const ENV_DATACENTER_ID: &str = "FLAKEFORGE_DATACENTER_ID";

/// Environment variable holding the worker ID.
pub const ENV_WORKER_ID: &str = "FLAKEFORGE_WORKER_ID";

/// Environment variable holding the epoch in Unix milliseconds.
pub const ENV_EPOCH_MS: &str = "FLAKEFORGE_EPOCH_MS";

const DEFAULT_DATACENTER_ID: u64 = 1;
const DEFAULT_WORKER_ID: u64 = 1;

/// Settings needed to build a generator.
///
/// # Example
///
/// ```
/// use flakeforge::GeneratorConfig;
///
/// let config = GeneratorConfig {
///     datacenter_id: 2,
///     worker_id: 5,
///     ..GeneratorConfig::default()
/// };
/// let generator = config.build_lock().unwrap();
/// let id = generator.next_id().unwrap();
/// assert_eq!((id.datacenter_id(), id.worker_id()), (2, 5));
/// ```
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Datacenter ID, `0..=31`.
    pub datacenter_id: u64,
    /// Worker ID, `0..=31`.
    pub worker_id: u64,
    /// Epoch in milliseconds since the Unix epoch.
    pub epoch_ms: u64,
}

impl Default for GeneratorConfig {
    #[allow(clippy::cast_possible_truncation)]
    fn default() -> Self {
        Self {
            datacenter_id: DEFAULT_DATACENTER_ID,
            worker_id: DEFAULT_WORKER_ID,
            epoch_ms: TWITTER_EPOCH.as_millis() as u64,
        }
    }
}

impl GeneratorConfig {
    /// Reads the configuration from the process environment.
    ///
    /// Unset variables fall back to their defaults.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if a variable is set but is not an
    /// unsigned integer. Range checks happen in [`Self::node_id`].
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], but resolves variables through `lookup`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if a value is not an unsigned
    /// integer.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            datacenter_id: parse_var(&lookup, ENV_DATACENTER_ID, defaults.datacenter_id)?,
            worker_id: parse_var(&lookup, ENV_WORKER_ID, defaults.worker_id)?,
            epoch_ms: parse_var(&lookup, ENV_EPOCH_MS, defaults.epoch_ms)?,
        })
    }

    /// Validates the configured identity.
    ///
    /// # Errors
    /// Returns [`Error::InvalidNodeId`] if either ID exceeds 31.
    pub fn node_id(&self) -> Result<NodeId> {
        NodeId::new(self.datacenter_id, self.worker_id)
    }

    /// The configured epoch as a [`Duration`] since the Unix epoch.
    pub const fn epoch(&self) -> Duration {
        Duration::from_millis(self.epoch_ms)
    }

    /// A wall clock aligned to the configured epoch.
    pub fn system_clock(&self) -> SystemClock {
        SystemClock::with_epoch(self.epoch())
    }

    /// A monotonic clock aligned to the configured epoch.
    ///
    /// # Panics
    /// Panics if the system clock is earlier than the epoch.
    pub fn monotonic_clock(&self) -> MonotonicClock {
        MonotonicClock::with_epoch(self.epoch())
    }

    /// Builds a [`LockSnowflakeGenerator`] driven by the wall clock.
    ///
    /// # Errors
    /// Returns [`Error::InvalidNodeId`] if the identity is out of range.
    pub fn build_lock(&self) -> Result<LockSnowflakeGenerator<SystemClock>> {
        Ok(LockSnowflakeGenerator::new(
            self.node_id()?,
            self.system_clock(),
        ))
    }

    /// Builds an [`AtomicSnowflakeGenerator`] driven by the wall clock.
    ///
    /// # Errors
    /// Returns [`Error::InvalidNodeId`] if the identity is out of range.
    pub fn build_atomic(&self) -> Result<AtomicSnowflakeGenerator<SystemClock>> {
        Ok(AtomicSnowflakeGenerator::new(
            self.node_id()?,
            self.system_clock(),
        ))
    }

    /// Builds an unconfigured [`LazySnowflakeGenerator`] driven by the wall
    /// clock. Only the epoch is taken from this configuration.
    pub fn build_lazy(&self) -> LazySnowflakeGenerator<SystemClock> {
        LazySnowflakeGenerator::new(self.system_clock())
    }
}

fn parse_var(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| Error::InvalidConfig {
            key: key.to_owned(),
            reason: format!("{raw:?}: {e}"),
        }),
    }
}
