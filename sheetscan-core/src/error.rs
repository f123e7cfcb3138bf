use thiserror::Error;

use crate::item::NodeId;
use crate::lister::ListError;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to list folder {folder}: {source}")]
    Listing {
        folder: NodeId,
        #[source]
        source: ListError,
    },

    #[error("Failed to record match {path}: {source}")]
    Sink {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Invalid manifest: {0}")]
    Manifest(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
