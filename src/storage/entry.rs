//! Stored records.

/// A stored value paired with the absolute time (ms since the Unix epoch)
/// after which it is no longer visible.
///
/// Entries are never mutated in place; an update replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    value: V,
    expire_at: u64,
}

impl<V> Entry<V> {
    /// Creates a new entry.
    pub fn new(value: V, expire_at: u64) -> Self {
        Self { value, expire_at }
    }

    /// Creates an entry expiring `ttl_ms` after `now_ms`.
    pub fn with_ttl(value: V, now_ms: u64, ttl_ms: u64) -> Self {
        Self::new(value, now_ms.saturating_add(ttl_ms))
    }

    /// The stored value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Expiry timestamp in milliseconds since the Unix epoch.
    pub fn expire_at(&self) -> u64 {
        self.expire_at
    }

    /// Whether the entry is still visible at `now_ms`.
    ///
    /// An entry is live up to and including its expiry millisecond.
    #[inline]
    pub fn is_live_at(&self, now_ms: u64) -> bool {
        now_ms <= self.expire_at
    }

    /// Whether the entry has expired at `now_ms`.
    #[inline]
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        !self.is_live_at(now_ms)
    }

    /// Milliseconds left before expiry, or `None` once expired.
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.is_live_at(now_ms).then(|| self.expire_at - now_ms)
    }
}
