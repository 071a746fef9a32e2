//! Store configuration.

use crate::error::ConfigError;
use std::time::Duration;

/// How often the background sweep runs unless configured otherwise.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Configuration for an [`ExpiringStore`](crate::storage::ExpiringStore).
///
/// # Example
///
/// ```
/// use ttlkv::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::new(Duration::from_secs(10))
///     .with_sweep_interval(Duration::from_secs(30));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// TTL applied by `set` (entries inserted with `set_raw` carry their own)
    pub default_ttl: Duration,

    /// Interval between background sweeps (default: 5 minutes)
    pub sweep_interval: Duration,
}

impl StoreConfig {
    /// Creates a configuration with the given default TTL and the default
    /// sweep interval.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Sets the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Checks that the configuration can drive a store.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }
        if u64::try_from(self.default_ttl.as_millis()).is_err() {
            return Err(ConfigError::TtlOutOfRange(self.default_ttl));
        }
        Ok(())
    }

    /// The default TTL in whole milliseconds.
    pub(crate) fn default_ttl_ms(&self) -> u64 {
        u64::try_from(self.default_ttl.as_millis()).unwrap_or(u64::MAX)
    }
}
