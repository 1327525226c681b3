//! # CLI Module
//!
//! Command-line interface for the media catalog.
//!
//! ## Usage
//! ```bash
//! # Catalog a directory tree (images only)
//! mediatool catalog ~/Photos
//!
//! # Include videos, commit every 100 records
//! mediatool catalog ~/Photos --include-video --batch-size 100
//!
//! # List duplicate sets
//! mediatool dupes --output json
//!
//! # Preview, then collapse a duplicate set onto one path
//! mediatool consolidate --keep ~/Photos/a.jpg ~/Photos/a.jpg ~/Old/a.jpg --dry-run
//! mediatool consolidate --keep ~/Photos/a.jpg ~/Photos/a.jpg ~/Old/a.jpg
//!
//! # Capture time and canonical name of a photo
//! mediatool date ~/Photos/IMG_0001.JPG
//! mediatool name ~/Photos/IMG_0001.JPG --date-folders --root ~/Sorted
//! ```

mod output;

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use mediatool::core::catalog::{CatalogConfig, Cataloger, DEFAULT_BATCH_SIZE};
use mediatool::core::consolidate::{ConsolidationEngine, PromoteMode};
use mediatool::core::duplicates::DuplicateGrouper;
use mediatool::core::index::{FileIndex, SqliteIndex};
use mediatool::core::metadata::extract_capture_time;
use mediatool::core::naming::{recommended_filename, NamingOptions};
use mediatool::error::{MediaToolError, Result};
use mediatool::events::{CatalogEvent, ConsolidateEvent, Event, EventChannel};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// mediatool - catalog media by content and clean up exact duplicates
#[derive(Parser, Debug)]
#[command(name = "mediatool")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Catalog database path
    #[arg(long, global = true, env = "MEDIATOOL_DB")]
    db: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Catalog the media files under a directory
    Catalog {
        /// Directory to walk
        root: PathBuf,

        /// Records committed per index transaction
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Catalog videos as well as images
        #[arg(long)]
        include_video: bool,

        /// Include hidden files and directories
        #[arg(long)]
        include_hidden: bool,

        /// Follow symbolic links
        #[arg(long)]
        follow_symlinks: bool,

        /// Fingerprint on the calling thread only
        #[arg(long)]
        sequential: bool,
    },

    /// List sets of cataloged files with identical content
    Dupes {
        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Collapse a duplicate set onto one path
    Consolidate {
        /// Path that survives
        #[arg(long)]
        keep: PathBuf,

        /// Members of the duplicate set
        #[arg(required = true)]
        members: Vec<PathBuf>,

        /// Show what would be removed without touching anything
        #[arg(long)]
        dry_run: bool,

        /// Promote by verified copy instead of rename (for keepers on another volume)
        #[arg(long)]
        copy: bool,
    },

    /// Print the embedded capture time of a photo
    Date {
        path: PathBuf,
    },

    /// Print the canonical capture-time name for a photo
    Name {
        path: PathBuf,

        /// Place the name under YYYY/MM/DD folders
        #[arg(long)]
        date_folders: bool,

        /// Directory to build the name under (defaults to the photo's own directory)
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Show catalog statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Drop records whose files no longer exist
    Prune {
        /// List the records without deleting them
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (paths only)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    mediatool::init_tracing(if cli.verbose { "debug" } else { "warn" });

    let db = cli.db.clone();
    match cli.command {
        Commands::Catalog {
            root,
            batch_size,
            include_video,
            include_hidden,
            follow_symlinks,
            sequential,
        } => {
            let config = CatalogConfig::new()
                .batch_size(batch_size)
                .include_video(include_video)
                .include_hidden(include_hidden)
                .follow_symlinks(follow_symlinks)
                .parallel(!sequential);
            run_catalog(&open_index(db)?, &resolve(&root), config, cli.verbose)
        }
        Commands::Dupes { output } => run_dupes(&open_index(db)?, output),
        Commands::Consolidate {
            keep,
            members,
            dry_run,
            copy,
        } => {
            let members: Vec<PathBuf> = members.iter().map(|m| resolve(m)).collect();
            let mode = if copy {
                PromoteMode::CopyVerify
            } else {
                PromoteMode::Rename
            };
            run_consolidate(&open_index(db)?, &members, &resolve(&keep), dry_run, mode)
        }
        Commands::Date { path } => run_date(&path),
        Commands::Name {
            path,
            date_folders,
            root,
        } => {
            let mut options = NamingOptions::new().date_folders(date_folders);
            if let Some(root) = root {
                options = options.root(root);
            }
            run_name(&path, &options)
        }
        Commands::Stats { output } => run_stats(&open_index(db)?, output),
        Commands::Prune { dry_run } => run_prune(&open_index(db)?, dry_run),
    }
}

/// Default catalog location under the platform data directory
fn default_db_path() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("mediatool").join("catalog.db"))
        .ok_or_else(|| {
            MediaToolError::Config(
                "No data directory on this platform; pass --db or set MEDIATOOL_DB".to_string(),
            )
        })
}

fn open_index(db: Option<PathBuf>) -> Result<SqliteIndex> {
    let path = match db {
        Some(path) => path,
        None => default_db_path()?,
    };
    Ok(SqliteIndex::open(&path)?)
}

/// Absolute form of a user-supplied path; paths that don't exist are
/// passed through so the engine can report them
fn resolve(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn run_catalog(
    index: &dyn FileIndex,
    root: &Path,
    config: CatalogConfig,
    verbose: bool,
) -> Result<()> {
    let term = Term::stderr();
    let (sender, receiver) = EventChannel::new();

    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) =
        ProgressStyle::default_spinner().template("{spinner:.green} {pos} files {msg}")
    {
        spinner.set_style(spinner_style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));

    let spinner_clone = spinner.clone();
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Catalog(CatalogEvent::DirectoryEntered { path, files }) => {
                    spinner_clone.inc(files as u64);
                    spinner_clone.set_message(path.display().to_string());
                }
                Event::Catalog(CatalogEvent::Error { path, message }) if verbose => {
                    spinner_clone.println(format!(
                        "{} {}: {}",
                        style("skipped").yellow(),
                        path.display(),
                        message
                    ));
                }
                Event::Catalog(CatalogEvent::Completed { .. }) => {
                    spinner_clone.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = Cataloger::new(index, config).run_with_events(root, &sender);

    drop(sender);
    event_thread.join().ok();
    spinner.finish_and_clear();

    let report = result?;
    output::print_catalog_report(&term, &report);
    Ok(())
}

fn run_dupes(index: &dyn FileIndex, format: OutputFormat) -> Result<()> {
    let grouper = DuplicateGrouper::new(index);
    let groups = grouper.groups()?;

    match format {
        OutputFormat::Pretty => output::print_groups_pretty(&Term::stdout(), &groups),
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "duplicate_sets": groups.len(),
            "redundant_files": groups.iter().map(|g| g.duplicate_count()).sum::<usize>(),
            "reclaimable_bytes": groups.iter().map(|g| g.reclaimable_bytes()).sum::<u64>(),
            "groups": groups,
        }))?,
        OutputFormat::Minimal => output::print_groups_minimal(&groups),
    }
    Ok(())
}

fn run_consolidate(
    index: &dyn FileIndex,
    members: &[PathBuf],
    keeper: &Path,
    dry_run: bool,
    mode: PromoteMode,
) -> Result<()> {
    let term = Term::stdout();
    let (sender, receiver) = EventChannel::new();

    let engine = ConsolidationEngine::new(index)
        .events(sender)
        .promote_mode(mode);

    let plan = engine.plan(members, keeper)?;
    let result = engine.execute(&plan, dry_run);
    drop(engine);

    for event in receiver.iter() {
        match event {
            Event::Consolidate(ConsolidateEvent::Promoted { from, to }) => {
                term.write_line(&format!(
                    "  {} {} -> {}",
                    style("moved").cyan(),
                    from.display(),
                    to.display()
                ))
                .ok();
            }
            Event::Consolidate(ConsolidateEvent::Removing { path, dry_run }) => {
                let verb = if dry_run { "would remove" } else { "removing" };
                term.write_line(&format!("  {} {}", style(verb).yellow(), path.display()))
                    .ok();
            }
            Event::Consolidate(ConsolidateEvent::RemoveFailed { path, message }) => {
                term.write_line(&format!(
                    "  {} {}: {}",
                    style("failed").red(),
                    path.display(),
                    message
                ))
                .ok();
            }
            _ => {}
        }
    }

    let report = result?;
    output::print_consolidation_report(&term, &report);
    Ok(())
}

fn run_date(path: &Path) -> Result<()> {
    match extract_capture_time(path)? {
        Some(time) => println!("{}", time.format("%Y-%m-%d %H:%M:%S")),
        None => println!("{}", style("no capture time").dim()),
    }
    Ok(())
}

fn run_name(path: &Path, options: &NamingOptions) -> Result<()> {
    match recommended_filename(path, options)? {
        Some(name) => println!("{}", name.display()),
        None => println!("{}", style("no canonical name (not a dated JPEG or PNG)").dim()),
    }
    Ok(())
}

fn run_stats(index: &dyn FileIndex, format: OutputFormat) -> Result<()> {
    let stats = DuplicateGrouper::new(index).stats()?;

    match format {
        OutputFormat::Pretty => output::print_stats(&Term::stdout(), &stats),
        OutputFormat::Json | OutputFormat::Minimal => output::print_json(&stats)?,
    }
    Ok(())
}

fn run_prune(index: &dyn FileIndex, dry_run: bool) -> Result<()> {
    let missing = index.prune_missing(dry_run)?;

    for path in &missing {
        println!("{}", path.display());
    }

    let verb = if dry_run { "Would prune" } else { "Pruned" };
    Term::stderr()
        .write_line(&format!("{} {} record(s)", verb, style(missing.len()).cyan()))
        .ok();
    Ok(())
}
