mod logging;
mod report;

use std::path::{Path, PathBuf};

use clap::{ArgAction, ArgGroup, Parser};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use sheetscan_core::{
    CheckpointState, CheckpointStore, CrawlConfig, Crawler, DirLister, ExtensionMatcher,
    FolderLister, ListErrorPolicy, ManifestLister, NodeId, PathSink, RetryConfig, RetryingLister,
    checkpoint_path_for,
};
use tracing::info;

use report::Reporter;

/// Header written at the top of a new result file
const OUTPUT_TITLE: &str = "sheetscan spreadsheet file paths";

/// SHEETSCAN - resumable discovery of spreadsheet files in large folder trees
#[derive(Parser, Debug)]
#[command(name = "sheetscan")]
#[command(about = "Find spreadsheet files in a large folder tree, resumably")]
#[command(version)]
#[command(group(ArgGroup::new("source").required(true).args(["manifest", "dir"])))]
struct Args {
    /// JSON export of the folder tree to scan
    #[arg(long, env = "SHEETSCAN_MANIFEST")]
    manifest: Option<PathBuf>,

    /// Local directory tree to scan (e.g. a sync-client mount)
    #[arg(long, env = "SHEETSCAN_DIR")]
    dir: Option<PathBuf>,

    /// Folder id to start from (defaults to the source's root)
    #[arg(long, env = "SHEETSCAN_ROOT")]
    root: Option<String>,

    /// File that matching paths are appended to
    #[arg(short, long, env = "SHEETSCAN_OUTPUT", default_value = "sheetscan_matches.txt")]
    output: PathBuf,

    /// Checkpoint file (defaults to a per-root file in the user cache directory)
    #[arg(long, env = "SHEETSCAN_CHECKPOINT")]
    checkpoint: Option<PathBuf>,

    /// File extensions to match, case-insensitively
    #[arg(
        short,
        long = "ext",
        env = "SHEETSCAN_EXTENSIONS",
        value_delimiter = ',',
        default_value = ".xls,.xlsx"
    )]
    extensions: Vec<String>,

    /// Save the checkpoint after this many processed files
    #[arg(long, default_value_t = 10)]
    checkpoint_every: usize,

    /// Skip folders that cannot be listed instead of stopping
    #[arg(long)]
    skip_failed: bool,

    /// Retries for a failing folder listing
    #[arg(long, env = "SHEETSCAN_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Ignore any existing checkpoint (it is overwritten as the scan progresses)
    #[arg(long)]
    fresh: bool,

    /// More log output (repeat for more)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only print summaries and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    logging::init_logging(args.verbose, args.quiet)?;

    if let Some(manifest_path) = &args.manifest {
        let lister = ManifestLister::load(manifest_path)
            .wrap_err_with(|| format!("Failed to load manifest {}", manifest_path.display()))?;
        let root = args
            .root
            .clone()
            .map(NodeId::from)
            .unwrap_or_else(|| lister.root_id().clone());
        let key = root.to_string();
        return run_scan(lister, root, &key, &args);
    }

    if let Some(dir) = &args.dir {
        let dir = dir.canonicalize().unwrap_or_else(|_| dir.clone());
        if !dir.is_dir() {
            return Err(eyre!("Path is not a directory: {}", dir.display()));
        }
        let lister = DirLister::new(&dir);
        let root = args
            .root
            .clone()
            .map(NodeId::from)
            .unwrap_or_else(|| lister.root_id());
        // Relative ids are only unique within one directory tree
        let key = format!("{}#{}", dir.display(), root);
        return run_scan(lister, root, &key, &args);
    }

    Err(eyre!("Either --manifest or --dir is required"))
}

fn run_scan<L>(lister: L, root: NodeId, key: &str, args: &Args) -> Result<()>
where
    L: FolderLister + Send + 'static,
{
    let lister = RetryingLister::new(
        lister,
        RetryConfig::new().with_max_retries(args.max_retries),
    );

    let checkpoint_path = resolve_checkpoint_path(args.checkpoint.as_deref(), key);
    let store = CheckpointStore::new(&checkpoint_path);
    let state = if args.fresh {
        CheckpointState::new()
    } else {
        store.load()
    };
    info!(checkpoint = %checkpoint_path.display(), root = %root, "Starting scan");
    report::print_resume_summary(&state);

    let sink = PathSink::open(&args.output, OUTPUT_TITLE)
        .wrap_err_with(|| format!("Failed to open output file {}", args.output.display()))?;

    let policy = if args.skip_failed {
        ListErrorPolicy::SkipSubtree
    } else {
        ListErrorPolicy::Abort
    };
    let config = CrawlConfig::default()
        .with_checkpoint_every(args.checkpoint_every)
        .with_list_error_policy(policy);

    let crawler = Crawler::new(lister, sink, store, ExtensionMatcher::new(&args.extensions))
        .with_config(config);
    let (progress_rx, handle) = crawler.spawn(root, state);

    let reporter = Reporter::new(args.quiet);
    for msg in progress_rx {
        reporter.handle(&msg);
    }

    let outcome = handle
        .join()
        .map_err(|_| eyre!("Crawler thread panicked"))?
        .wrap_err("Scan stopped; rerun to resume from the last checkpoint")?;

    report::print_summary(&outcome, &args.output);

    if !outcome.stats.is_complete() {
        return Err(eyre!(
            "{} folders could not be listed; rerun to retry them",
            outcome.stats.failed_folders.len()
        ));
    }

    Ok(())
}

fn resolve_checkpoint_path(explicit: Option<&Path>, key: &str) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let state_dir = dirs::cache_dir()
        .map(|d| d.join("sheetscan"))
        .unwrap_or_else(|| PathBuf::from("."));
    checkpoint_path_for(key, &state_dir)
}
