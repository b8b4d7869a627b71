//! Filesystem Module
//!
//! The asynchronous filesystem primitives the cache is built on.
//!
//! # Contract
//! - Every primitive reports failure as `std::io::Error`
//! - `create_dir_all` may report an existing path as `ErrorKind::AlreadyExists`;
//!   callers treat that as success
//! - `list_recursive` yields every node below a directory and ends either
//!   when the walk completes or with a single `Err` item

mod local;

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::BoxStream;

pub use local::LocalFilesystem;

// == Node ==
/// A path reported by a recursive listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub path: PathBuf,
    pub kind: NodeKind,
}

/// What kind of filesystem object a [`Node`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// Push stream of nodes produced by [`Filesystem::list_recursive`].
pub type NodeStream = BoxStream<'static, io::Result<Node>>;

// == Filesystem Trait ==
/// Asynchronous filesystem primitives required by the cache.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Succeeds if something exists at `path` and can be stat'ed.
    async fn file_exists(&self, path: &Path) -> io::Result<()>;

    /// Reads the whole file.
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Writes `contents`, replacing any existing file.
    async fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    async fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Creates `path` and any missing parents.
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Lists everything below `path`, lazily.
    fn list_recursive(&self, path: &Path) -> NodeStream;
}
