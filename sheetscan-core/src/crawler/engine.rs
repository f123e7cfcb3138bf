use std::collections::HashSet;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, info_span, warn};

use super::progress::{CrawlMessage, CrawlStats};
use crate::checkpoint::{CheckpointState, CheckpointStore};
use crate::item::{FileMatch, ItemKind, NodeId, TreeItem};
use crate::lister::FolderLister;
use crate::matcher::ExtensionMatcher;
use crate::sink::MatchSink;
use crate::{Result, ScanError};

/// What to do when a folder below the root cannot be listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListErrorPolicy {
    /// Stop the run and return the error
    #[default]
    Abort,
    /// Leave the folder (and its ancestors) unmarked and carry on with siblings
    SkipSubtree,
}

/// Crawler configuration
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Save the checkpoint after this many processed files
    pub checkpoint_every: usize,
    pub on_list_error: ListErrorPolicy,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            checkpoint_every: 10,
            on_list_error: ListErrorPolicy::Abort,
        }
    }
}

impl CrawlConfig {
    pub fn with_checkpoint_every(mut self, files: usize) -> Self {
        self.checkpoint_every = files;
        self
    }

    pub fn with_list_error_policy(mut self, policy: ListErrorPolicy) -> Self {
        self.on_list_error = policy;
        self
    }
}

/// Result of a crawl
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Matches discovered during this run, in discovery order
    pub matches: Vec<FileMatch>,
    /// Checkpoint state covering this and all earlier runs
    pub state: CheckpointState,
    pub stats: CrawlStats,
}

/// A folder whose children are being processed
struct Frame {
    id: NodeId,
    /// Names from the crawl root down to this folder
    path: Vec<String>,
    children: std::vec::IntoIter<TreeItem>,
    /// Cleared when a descendant could not be listed
    complete: bool,
}

impl Frame {
    fn new(id: NodeId, path: Vec<String>, children: Vec<TreeItem>) -> Self {
        Self {
            id,
            path,
            children: children.into_iter(),
            complete: true,
        }
    }
}

/// Mutable bookkeeping of one run
struct Run {
    state: CheckpointState,
    matches: Vec<FileMatch>,
    stats: CrawlStats,
    /// Paths already in the sink, possibly from a run that died before checkpointing
    recorded: HashSet<String>,
    files_since_save: usize,
}

/// Checkpointed depth-first crawler
///
/// Walks a folder tree through a [`FolderLister`], appending matching file
/// paths to a [`MatchSink`] and recording progress in a checkpoint so an
/// interrupted crawl can resume without re-listing finished folders or
/// re-recording matches. A folder is only marked processed after all of its
/// children are.
pub struct Crawler<L, S> {
    lister: L,
    sink: S,
    store: CheckpointStore,
    matcher: ExtensionMatcher,
    config: CrawlConfig,
    progress: Option<Sender<CrawlMessage>>,
}

impl<L: FolderLister, S: MatchSink> Crawler<L, S> {
    pub fn new(lister: L, sink: S, store: CheckpointStore, matcher: ExtensionMatcher) -> Self {
        Self {
            lister,
            sink,
            store,
            matcher,
            config: CrawlConfig::default(),
            progress: None,
        }
    }

    pub fn with_config(mut self, config: CrawlConfig) -> Self {
        self.config = config;
        self
    }

    /// Send progress messages to `tx`; a disconnected receiver is ignored
    pub fn with_progress(mut self, tx: Sender<CrawlMessage>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Crawl the tree below `root`, resuming from `state`.
    ///
    /// On error the checkpoint is saved (best effort) before returning, so
    /// the next run resumes at the folder that failed.
    pub fn crawl(&mut self, root: &NodeId, state: CheckpointState) -> Result<CrawlOutcome> {
        let _span = info_span!("crawl", root = %root).entered();

        let recorded = self.sink.load_existing()?;
        let mut run = Run {
            state,
            matches: Vec::new(),
            stats: CrawlStats::default(),
            recorded,
            files_since_save: 0,
        };

        if let Err(e) = self.walk(root, &mut run) {
            if let Err(save_err) = self.store.save(&run.state) {
                warn!(error = %save_err, "Could not save checkpoint after failure");
            }
            return Err(e);
        }

        info!(
            folders_listed = run.stats.folders_listed,
            files_examined = run.stats.files_examined,
            matches = run.stats.total_matches(),
            total_matches = run.state.match_count(),
            "Crawl finished"
        );

        Ok(CrawlOutcome {
            matches: run.matches,
            state: run.state,
            stats: run.stats,
        })
    }

    fn walk(&mut self, root: &NodeId, run: &mut Run) -> Result<()> {
        if run.state.is_folder_done(root) {
            info!("Root already processed, nothing to do");
            run.stats.folders_skipped += 1;
            self.emit(CrawlMessage::Skipped {
                id: root.clone(),
                path: String::new(),
                kind: ItemKind::Folder,
            });
            return Ok(());
        }

        let children = self.list_folder(root, "", run)?;
        let already_done = children
            .iter()
            .filter(|item| is_done(&run.state, item))
            .count();
        self.emit(CrawlMessage::RootListed {
            total: children.len(),
            already_done,
        });

        let mut stack = vec![Frame::new(root.clone(), Vec::new(), children)];

        while let Some(frame) = stack.last_mut() {
            let Some(child) = frame.children.next() else {
                if let Some(finished) = stack.pop() {
                    self.finish_folder(finished, stack.last_mut(), run)?;
                }
                continue;
            };

            let mut path = frame.path.clone();
            path.push(child.name.clone());
            let shown_path = path.join("/");

            if is_done(&run.state, &child) {
                debug!(path = %shown_path, "Skipping already processed");
                match child.kind {
                    ItemKind::Folder => run.stats.folders_skipped += 1,
                    _ => run.stats.files_skipped += 1,
                }
                self.emit(CrawlMessage::Skipped {
                    id: child.id,
                    path: shown_path,
                    kind: child.kind,
                });
                continue;
            }

            match child.kind {
                ItemKind::Folder => match self.list_folder(&child.id, &shown_path, run) {
                    Ok(children) => stack.push(Frame::new(child.id, path, children)),
                    Err(e) if self.config.on_list_error == ListErrorPolicy::SkipSubtree => {
                        warn!(path = %shown_path, error = %e, "Skipping folder that could not be listed");
                        frame.complete = false;
                        run.stats.failed_folders.push(child.id.clone());
                        self.emit(CrawlMessage::FolderFailed {
                            id: child.id,
                            path: shown_path,
                            error: e.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                },
                ItemKind::File => self.process_file(child, path, shown_path, run)?,
                ItemKind::Other => {
                    debug!(path = %shown_path, "Ignoring item that is neither folder nor file");
                }
            }
        }

        if run.files_since_save > 0 {
            self.save_checkpoint(run)?;
        }

        Ok(())
    }

    fn list_folder(
        &mut self,
        id: &NodeId,
        shown_path: &str,
        run: &mut Run,
    ) -> Result<Vec<TreeItem>> {
        debug!(path = %shown_path, "Processing folder");
        self.emit(CrawlMessage::EnteredFolder {
            id: id.clone(),
            path: shown_path.to_string(),
        });

        let children = self
            .lister
            .list(id)
            .map_err(|source| ScanError::Listing {
                folder: id.clone(),
                source,
            })?;
        run.stats.folders_listed += 1;
        Ok(children)
    }

    fn process_file(
        &mut self,
        item: TreeItem,
        path: Vec<String>,
        shown_path: String,
        run: &mut Run,
    ) -> Result<()> {
        debug!(path = %shown_path, "Processing file");
        run.stats.files_examined += 1;
        self.emit(CrawlMessage::ExaminedFile {
            id: item.id.clone(),
            path: shown_path.clone(),
        });

        if self.matcher.matches(&item.name) {
            // The path must be durable before the file counts as processed
            let newly_recorded = !run.recorded.contains(&shown_path);
            if newly_recorded {
                self.sink
                    .append(&shown_path)
                    .map_err(|source| ScanError::Sink {
                        path: shown_path.clone(),
                        source,
                    })?;
                run.recorded.insert(shown_path.clone());
                run.stats.matches_recorded += 1;
            } else {
                run.stats.matches_already_recorded += 1;
            }
            info!(path = %shown_path, newly_recorded, "Found matching file");

            let file_match = FileMatch {
                path,
                id: item.id.clone(),
                name: item.name,
                size: item.size,
            };
            run.state.record_match(item.id);
            run.matches.push(file_match.clone());
            self.emit(CrawlMessage::FoundMatch {
                file: file_match,
                newly_recorded,
            });
        } else {
            run.state.mark_file_done(item.id);
        }

        run.files_since_save += 1;
        if run.files_since_save >= self.config.checkpoint_every.max(1) {
            self.save_checkpoint(run)?;
        }

        Ok(())
    }

    fn finish_folder(
        &mut self,
        frame: Frame,
        parent: Option<&mut Frame>,
        run: &mut Run,
    ) -> Result<()> {
        let shown_path = frame.path.join("/");

        if !frame.complete {
            warn!(path = %shown_path, "Folder left unfinished, will be revisited next run");
            if let Some(parent) = parent {
                parent.complete = false;
            }
            return Ok(());
        }

        run.state.mark_folder_done(frame.id.clone());
        run.stats.folders_completed += 1;
        self.save_checkpoint(run)?;
        info!(path = %shown_path, "Folder completed");
        self.emit(CrawlMessage::FolderCompleted {
            id: frame.id,
            path: shown_path,
        });

        Ok(())
    }

    fn save_checkpoint(&mut self, run: &mut Run) -> Result<()> {
        self.store.save(&run.state)?;
        run.files_since_save = 0;
        run.stats.checkpoint_saves += 1;
        self.emit(CrawlMessage::CheckpointSaved {
            folders: run.state.folder_count(),
            files: run.state.file_count(),
        });
        Ok(())
    }

    fn emit(&self, msg: CrawlMessage) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(msg);
        }
    }
}

impl<L, S> Crawler<L, S>
where
    L: FolderLister + Send + 'static,
    S: MatchSink + Send + 'static,
{
    /// Crawl on a background thread
    ///
    /// Returns a receiver for progress updates; the last message is either
    /// [`CrawlMessage::Completed`] or [`CrawlMessage::Failed`], after which
    /// the channel disconnects.
    pub fn spawn(
        mut self,
        root: NodeId,
        state: CheckpointState,
    ) -> (Receiver<CrawlMessage>, JoinHandle<Result<CrawlOutcome>>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.progress = Some(tx);

        let handle = std::thread::spawn(move || {
            let result = self.crawl(&root, state);
            match &result {
                Ok(outcome) => self.emit(CrawlMessage::Completed(outcome.stats.clone())),
                Err(e) => self.emit(CrawlMessage::Failed(e.to_string())),
            }
            result
        });

        (rx, handle)
    }
}

fn is_done(state: &CheckpointState, item: &TreeItem) -> bool {
    match item.kind {
        ItemKind::Folder => state.is_folder_done(&item.id),
        ItemKind::File => state.is_file_done(&item.id),
        ItemKind::Other => false,
    }
}
