use std::path::Path;

use sheetscan_core::{
    CheckpointState, CrawlMessage, CrawlOutcome, ItemKind, format_count, format_optional_size,
    format_size,
};

/// Print how much an earlier run already covered
pub fn print_resume_summary(state: &CheckpointState) {
    if state.is_empty() {
        println!("Starting fresh scan");
        return;
    }

    println!(
        "Resuming from checkpoint: {} folders and {} files already processed",
        format_count(state.folder_count() as u64),
        format_count(state.file_count() as u64)
    );
    println!(
        "Already found {} matching files",
        format_count(state.match_count())
    );
}

/// Turns crawl messages into progress lines on stderr
pub struct Reporter {
    quiet: bool,
}

impl Reporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn handle(&self, msg: &CrawlMessage) {
        match msg {
            CrawlMessage::RootListed {
                total,
                already_done,
            } => {
                println!("Found {} items in root folder", format_count(*total as u64));
                println!(
                    "Already processed {} of {} root items",
                    format_count(*already_done as u64),
                    format_count(*total as u64)
                );
            }
            CrawlMessage::FolderFailed { path, error, .. } => {
                eprintln!(
                    "Could not list {}: {} (will be retried next run)",
                    display_path(path),
                    error
                );
            }
            _ if self.quiet => {}
            CrawlMessage::EnteredFolder { path, .. } if !path.is_empty() => {
                eprintln!("Processing folder: {}", path);
            }
            CrawlMessage::ExaminedFile { path, .. } => {
                eprintln!("Processing file: {}", path);
            }
            CrawlMessage::Skipped { path, kind, .. } => {
                let what = match kind {
                    ItemKind::Folder => "folder",
                    _ => "file",
                };
                eprintln!("Skipping already processed {}: {}", what, display_path(path));
            }
            CrawlMessage::FoundMatch {
                file,
                newly_recorded,
            } => {
                let note = if *newly_recorded {
                    ""
                } else {
                    ", already recorded"
                };
                eprintln!(
                    "Found match: {} ({}{})",
                    file.display_path(),
                    format_optional_size(file.size),
                    note
                );
            }
            _ => {}
        }
    }
}

/// Print the end-of-run summary
pub fn print_summary(outcome: &CrawlOutcome, output: &Path) {
    let stats = &outcome.stats;
    let bytes: u64 = outcome.matches.iter().filter_map(|m| m.size).sum();

    println!();
    println!(
        "Found {} new matching files in this scan ({})",
        format_count(outcome.matches.len() as u64),
        format_size(bytes)
    );
    println!(
        "Total matching files found (including previous runs): {}",
        format_count(outcome.state.match_count())
    );
    println!(
        "Listed {} folders, examined {} files, skipped {} already processed items",
        format_count(stats.folders_listed),
        format_count(stats.files_examined),
        format_count(stats.folders_skipped + stats.files_skipped)
    );
    println!("Match paths have been saved to: {}", output.display());
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "Root" } else { path }
}
