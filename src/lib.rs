//! File Cache - A durable file-backed key/value cache
//!
//! Stores one file per key under a base directory, with per-entry TTL
//! expiration checked lazily on read.

pub mod cache;
pub mod config;
pub mod error;
pub mod filesystem;

pub use cache::{CacheEntry, Clock, FileCache};
pub use config::{CacheConfig, ClockKind};
pub use error::{CacheError, Result};
pub use filesystem::{Filesystem, LocalFilesystem, Node, NodeKind, NodeStream};
