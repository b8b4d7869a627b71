//! Cache Entry Module
//!
//! Defines the persisted record for a single cache entry with TTL support.

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A cached payload together with its absolute expiry.
///
/// Written to disk as `{"data": ..., "expires_at": ...}`. A new entry is built
/// for every `set`; the expiry is never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    data: T,
    /// Expiration timestamp in seconds, None = no expiration
    expires_at: Option<f64>,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `data` - The value to store
    /// * `expires_at` - Absolute expiry in the cache clock's seconds, if any
    pub fn new(data: T, expires_at: Option<f64>) -> Self {
        Self { data, expires_at }
    }

    /// Returns the stored value.
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Consumes the entry, returning the stored value.
    pub fn into_data(self) -> T {
        self.data
    }

    /// Returns the expiry timestamp, or None if the entry never expires.
    pub fn expires_at(&self) -> Option<f64> {
        self.expires_at
    }

    // == Has Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// The entry is still valid at the exact expiry instant; it only expires
    /// once `now` is strictly past `expires_at`.
    pub fn has_expired(&self, now: f64) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in seconds at `now`, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0.0)` if the entry has expired
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL (never expires)
    pub fn ttl_remaining(&self, now: f64) -> Option<f64> {
        self.expires_at.map(|expires| (expires - now).max(0.0))
    }
}
