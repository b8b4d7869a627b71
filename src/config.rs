//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::MAIN_SEPARATOR;

use crate::cache::Clock;

/// File cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Base directory for entry files, always ending with a path separator
    pub base_path: String,
    /// Clock used for writing and checking expiry timestamps
    pub clock: ClockKind,
}

/// Which clock strategy the cache is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockKind {
    /// High-resolution monotonic clock anchored to the wall clock
    #[default]
    Monotonic,
    /// Plain wall-clock time
    Wall,
}

impl ClockKind {
    /// Parses `monotonic` / `wall` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monotonic" | "hires" => Some(Self::Monotonic),
            "wall" | "system" => Some(Self::Wall),
            _ => None,
        }
    }

    /// Resolves the kind into a clock. Called once per cache instance.
    pub fn build(self) -> Clock {
        match self {
            Self::Monotonic => Clock::monotonic(),
            Self::Wall => Clock::Wall,
        }
    }
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FILE_CACHE_PATH` - Base directory (default: `<temp dir>/file-cache/`)
    /// - `FILE_CACHE_CLOCK` - `monotonic` or `wall` (default: monotonic)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_path: env::var("FILE_CACHE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(with_trailing_separator)
                .unwrap_or(defaults.base_path),
            clock: env::var("FILE_CACHE_CLOCK")
                .ok()
                .and_then(|v| ClockKind::parse(&v))
                .unwrap_or(defaults.clock),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let dir = env::temp_dir().join("file-cache");
        Self {
            base_path: with_trailing_separator(dir.to_string_lossy().into_owned()),
            clock: ClockKind::default(),
        }
    }
}

/// Keys are appended to the base path verbatim, so it has to end in a separator.
pub fn with_trailing_separator(mut path: String) -> String {
    if !path.ends_with(MAIN_SEPARATOR) {
        path.push(MAIN_SEPARATOR);
    }
    path
}
