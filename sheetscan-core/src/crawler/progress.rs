use crate::item::{FileMatch, ItemKind, NodeId};

/// Progress update during a crawl
///
/// Paths are `/`-joined names below the crawl root; the root itself has
/// an empty path.
#[derive(Debug, Clone)]
pub enum CrawlMessage {
    /// The root's children were fetched
    RootListed { total: usize, already_done: usize },
    /// Started processing a folder
    EnteredFolder { id: NodeId, path: String },
    /// Item recorded as processed by an earlier run
    Skipped {
        id: NodeId,
        path: String,
        kind: ItemKind,
    },
    /// A file was tested against the match predicate
    ExaminedFile { id: NodeId, path: String },
    /// A matching file; `newly_recorded` is false when an earlier,
    /// interrupted run had already written its path
    FoundMatch {
        file: FileMatch,
        newly_recorded: bool,
    },
    /// Every child of a folder has been processed
    FolderCompleted { id: NodeId, path: String },
    /// Listing failed and the folder's subtree was left for a later run
    FolderFailed {
        id: NodeId,
        path: String,
        error: String,
    },
    /// Checkpoint written
    CheckpointSaved { folders: usize, files: usize },
    /// Crawl finished
    Completed(CrawlStats),
    /// Crawl stopped on an error
    Failed(String),
}

/// Counters for a single run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Folders whose children were fetched
    pub folders_listed: u64,
    /// Folders marked processed during this run
    pub folders_completed: u64,
    /// Folders skipped because an earlier run completed them
    pub folders_skipped: u64,
    /// Files tested against the match predicate
    pub files_examined: u64,
    /// Files skipped because an earlier run processed them
    pub files_skipped: u64,
    /// Matches appended to the result sink
    pub matches_recorded: u64,
    /// Matches whose path an interrupted run had already written
    pub matches_already_recorded: u64,
    /// Checkpoint writes
    pub checkpoint_saves: u64,
    /// Folders that could not be listed (subtree skipped)
    pub failed_folders: Vec<NodeId>,
}

impl CrawlStats {
    /// Matches found this run, whether or not they had to be appended
    pub fn total_matches(&self) -> u64 {
        self.matches_recorded + self.matches_already_recorded
    }

    pub fn is_complete(&self) -> bool {
        self.failed_folders.is_empty()
    }
}
