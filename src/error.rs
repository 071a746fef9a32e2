//! Error types.
//!
//! Store operations never fail: a missing or expired key is reported as
//! `None`/`false`. The only fallible step is building a store from a
//! [`StoreConfig`](crate::config::StoreConfig).

use std::time::Duration;
use thiserror::Error;

/// Errors produced while validating a store configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The sweep interval must be non-zero (tokio intervals panic on zero)
    #[error("sweep interval must be greater than zero")]
    ZeroSweepInterval,

    /// The default TTL does not fit in a millisecond timestamp
    #[error("default ttl out of range: {0:?} (max: {max} ms)", max = u64::MAX)]
    TtlOutOfRange(Duration),
}
