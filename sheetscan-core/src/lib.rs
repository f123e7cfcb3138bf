pub mod checkpoint;
pub mod crawler;
pub mod error;
pub mod format;
pub mod item;
pub mod lister;
pub mod matcher;
pub mod sink;

pub use checkpoint::{CheckpointState, CheckpointStore, checkpoint_path_for};
pub use crawler::{CrawlConfig, CrawlMessage, CrawlOutcome, CrawlStats, Crawler, ListErrorPolicy};
pub use error::{Result, ScanError};
pub use format::{format_count, format_optional_size, format_size};
pub use item::{FileMatch, ItemKind, NodeId, TreeItem};
pub use lister::{DirLister, FolderLister, ListError, ManifestLister, RetryConfig, RetryingLister};
pub use matcher::ExtensionMatcher;
pub use sink::{MatchSink, PathSink};
