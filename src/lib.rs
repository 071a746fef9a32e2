//! # ttlkv - An In-Memory Key-Value Store with Per-Entry Expiry
//!
//! ttlkv keeps values in memory, each with its own absolute expiry time. It
//! reclaims expired entries on its own: reads evict what they touch, and a
//! background sweep evicts the rest without anybody having to poll.
//!
//! ## Features
//!
//! - **Per-entry TTL**: `set` applies the store's default TTL, `set_raw`
//!   takes an absolute expiry timestamp
//! - **Lazy + Active Expiry**: expired entries disappear from every read at
//!   once and from memory on the next read or sweep
//! - **Self-managing sweep**: the sweep task starts with the first insert and
//!   stops as soon as the store is empty
//! - **Live views**: `keys()`, `values()` and `entries()` are lazy cursors in
//!   insertion order that see mutations made while they are drained
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               ttlkv                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐    │
//! │  │ StoreConfig │───>│              ExpiringStore                   │    │
//! │  │ (validated) │    │  ┌──────────────┐   ┌─────────────────────┐  │    │
//! │  └─────────────┘    │  │ HashMap      │   │ BTreeMap            │  │    │
//! │                     │  │ K -> Entry   │   │ seq -> K (order)    │  │    │
//! │  ┌─────────────┐    │  └──────────────┘   └─────────────────────┘  │    │
//! │  │   Clock     │───>│                                              │    │
//! │  └─────────────┘    └──────────────────────────────────────────────┘    │
//! │                          ▲                         │                    │
//! │                          │                         ▼                    │
//! │          ┌───────────────┴──────────┐   ┌──────────────────────┐        │
//! │          │       Sweep task         │   │  keys/values/entries │        │
//! │          │  (Background Tokio Task) │   │  (lazy cursors)      │        │
//! │          └──────────────────────────┘   └──────────────────────┘        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use ttlkv::ExpiringStore;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = ExpiringStore::new(Duration::from_secs(60));
//!
//!     store.set("user:1", "Ariz");
//!     assert_eq!(store.get("user:1"), Some("Ariz"));
//!     assert!(store.is_sweeping());
//!
//!     store.delete("user:1");
//!     assert!(!store.is_sweeping());
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: the store, its entries, views, clocks and sweep task
//! - [`config`]: store configuration
//! - [`error`]: configuration errors
//!
//! ## Design Highlights
//!
//! ### Liveness
//!
//! An entry is live while `now <= expire_at`. The expiry millisecond itself
//! still counts as live.
//!
//! ### No Error Channel
//!
//! Reads never fail. A missing key and an expired key both come back as
//! `None` (or `false` from `has`). Only building a store from a
//! [`StoreConfig`] can fail.

pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::{StoreConfig, DEFAULT_SWEEP_INTERVAL};
pub use error::ConfigError;
pub use storage::{Clock, Entry, ExpiringStore, ManualClock, StoreStats, SystemClock};

/// Version of ttlkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
