//! Storage Module
//!
//! This module provides the expiring key-value store and everything it is
//! built from.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ExpiringStore                           │
//! │   ordered map  K -> Entry { value, expire_at }              │
//! │   keys() / values() / entries()  ──> View (lazy cursor)     │
//! └─────────────────────────────────────────────────────────────┘
//!              ▲                                   │
//!              │                                   │ now_ms()
//!  ┌───────────┴───────────┐             ┌─────────▼─────────┐
//!  │      Sweep task       │             │      Clock        │
//!  │ (Background Tokio     │             │ System / Manual   │
//!  │  Task, self-stopping) │             └───────────────────┘
//!  └───────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Per-entry expiry**: absolute millisecond timestamps
//! - **Lazy Expiry**: expired entries are removed when reads touch them
//! - **Active Expiry**: a background sweep removes the rest, and stops itself
//!   once the store is empty
//! - **Live views**: traversal sees mutations made while it runs
//!
//! ## Example
//!
//! ```
//! use ttlkv::storage::{ExpiringStore, ManualClock};
//! use ttlkv::StoreConfig;
//! use std::time::Duration;
//!
//! let clock = ManualClock::new(1_000);
//! let store = ExpiringStore::with_clock(StoreConfig::new(Duration::from_millis(50)), clock.clone())
//!     .unwrap();
//!
//! store.set("session", "token123");
//! clock.advance(Duration::from_millis(50));
//! assert!(store.has("session"));
//!
//! clock.advance(Duration::from_millis(1));
//! assert_eq!(store.get("session"), None);
//! ```

pub mod clock;
pub mod cursor;
pub mod engine;
pub mod entry;
pub(crate) mod expiry;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use cursor::{Entries, Keys, RawEntries, Values, View};
pub use engine::{ExpiringStore, StoreStats};
pub use entry::Entry;
