//! Error types for the file cache
//!
//! Provides unified error handling using thiserror.
//!
//! Only structural failures live here. Ordinary I/O failures (missing file,
//! permission denied) are absorbed by the cache and surface as `false` or the
//! caller's default instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the file cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key cannot be mapped onto a path under the base directory
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// The entry file exists but could not be read
    #[error("Failed to read cache file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Stored bytes are not a valid entry for the requested payload type
    #[error("Corrupt cache file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Payload could not be serialized
    #[error("Failed to encode cache entry: {0}")]
    Encode(#[source] serde_json::Error),

    /// Parent directory for a hierarchical key could not be created
    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Recursive listing of the base directory failed
    #[error("Failed to list {path}: {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file could not be removed while clearing the cache
    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// == Result Type Alias ==
/// Convenience Result type for the file cache.
pub type Result<T> = std::result::Result<T, CacheError>;
