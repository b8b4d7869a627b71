//! Local Filesystem
//!
//! `Filesystem` implementation backed by `tokio::fs`.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::fs::{self, ReadDir};

use super::{Filesystem, Node, NodeKind, NodeStream};

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn file_exists(&self, path: &Path) -> io::Result<()> {
        fs::metadata(path).await.map(|_| ())
    }

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path).await
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }

    fn list_recursive(&self, path: &Path) -> NodeStream {
        let walk = Walk {
            pending: vec![path.to_path_buf()],
            current: None,
        };
        stream::try_unfold(walk, Walk::next_node).boxed()
    }
}

// == Recursive Walk ==
/// Depth-first walk state. Only one directory handle is open at a time;
/// subdirectories wait in `pending` until the current one is exhausted.
struct Walk {
    pending: Vec<PathBuf>,
    current: Option<ReadDir>,
}

impl Walk {
    async fn next_node(mut self) -> io::Result<Option<(Node, Self)>> {
        loop {
            if let Some(dir) = self.current.as_mut() {
                match dir.next_entry().await? {
                    Some(entry) => {
                        let path = entry.path();
                        let kind = if entry.file_type().await?.is_dir() {
                            self.pending.push(path.clone());
                            NodeKind::Directory
                        } else {
                            NodeKind::File
                        };
                        return Ok(Some((Node { path, kind }, self)));
                    }
                    None => self.current = None,
                }
            } else if let Some(next) = self.pending.pop() {
                self.current = Some(fs::read_dir(&next).await?);
            } else {
                return Ok(None);
            }
        }
    }
}
