//! Cache Module
//!
//! Provides file-backed caching with lazy TTL expiration.

mod clock;
mod entry;
mod store;


// Re-export public types
pub use clock::Clock;
pub use entry::CacheEntry;
pub use store::FileCache;
