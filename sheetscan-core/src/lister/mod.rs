//! Folder listing: the boundary between the crawler and a storage backend.

mod dir;
mod manifest;
mod retry;

pub use dir::DirLister;
pub use manifest::ManifestLister;
pub use retry::{RetryConfig, RetryingLister};

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::item::{NodeId, TreeItem};

/// Failure to list a folder
#[derive(Error, Debug)]
pub enum ListError {
    #[error("Folder not found: {0}")]
    NotFound(NodeId),

    #[error("Access denied to folder {0}")]
    AccessDenied(NodeId),

    #[error("Rate limited by the storage service")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed listing: {0}")]
    Malformed(String),
}

impl ListError {
    /// Whether repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ListError::RateLimited { .. } | ListError::Transient(_) => true,
            ListError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            ),
            ListError::NotFound(_) | ListError::AccessDenied(_) | ListError::Malformed(_) => false,
        }
    }
}

/// Source of folder contents
///
/// `list` returns every direct child of a folder, in a stable order.
/// Implementations exhaust any pagination before returning.
pub trait FolderLister {
    fn list(&self, folder: &NodeId) -> Result<Vec<TreeItem>, ListError>;
}

impl<L: FolderLister + ?Sized> FolderLister for &L {
    fn list(&self, folder: &NodeId) -> Result<Vec<TreeItem>, ListError> {
        (**self).list(folder)
    }
}

impl<L: FolderLister + ?Sized> FolderLister for Box<L> {
    fn list(&self, folder: &NodeId) -> Result<Vec<TreeItem>, ListError> {
        (**self).list(folder)
    }
}
