//! Command-line interface module for extsort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Loading settings and building the scanner
//! - Driving a background scan and streaming its progress
//! - Organizing (or planning) the moves and reporting the outcome

use crate::config::Settings;
use crate::extensions::ExtensionSet;
use crate::file_organizer::{ConflictPolicy, Organizer};
use crate::output::{OutputFormatter, ScanProgress, plural};
use crate::scanner::{ScanOutcome, ScanRequest, Scanner};
use crate::worker::ScanSession;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;

/// Find files by extension and sort them into extension-named folders.
#[derive(Debug, Parser)]
#[command(name = "extsort", version, about)]
pub struct Cli {
    /// Settings file (defaults to ./.extsortrc.toml, then ~/.config/extsort/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Do not print each discovered file.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List matching files under a root directory.
    Scan(ScanArgs),
    /// Scan, then move matching files into <DEST>/<EXT>/ folders.
    Organize(OrganizeArgs),
}

/// What to scan.
#[derive(Debug, Args)]
pub struct ScanTarget {
    /// Drive or directory to scan.
    pub root: PathBuf,

    /// Comma-separated extensions, e.g. "pdf,png,rar".
    #[arg(short, long, value_name = "LIST")]
    pub types: Option<String>,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub target: ScanTarget,

    /// Print the directory tree of the visited hierarchy.
    #[arg(long)]
    pub tree: bool,

    /// Print the full scan outcome as JSON.
    #[arg(long, conflicts_with = "tree")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct OrganizeArgs {
    #[command(flatten)]
    pub target: ScanTarget,

    /// Folder that receives the extension folders.
    #[arg(short, long, value_name = "DIR")]
    pub dest: PathBuf,

    /// Show what would be moved without moving anything.
    #[arg(long)]
    pub dry_run: bool,

    /// What to do when the destination already has a file with the same name.
    #[arg(long, value_enum)]
    pub on_conflict: Option<ConflictPolicy>,

    /// Print the directory tree before organizing.
    #[arg(long)]
    pub tree: bool,
}

/// Sets up `env_logger`. `RUST_LOG` takes precedence over the flags.
pub fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => log::LevelFilter::Error,
        (false, 0) => log::LevelFilter::Warn,
        (false, 1) => log::LevelFilter::Info,
        (false, _) => log::LevelFilter::Debug,
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}

/// Runs the CLI application.
///
/// This is the main entry point for CLI operations. Errors come back as
/// user-facing messages.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use extsort::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["extsort", "scan", "/mnt/data", "--types", "pdf,png"]);
/// if let Err(e) = run_cli(&cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<(), String> {
    let settings = Settings::load(cli.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    let filter = settings
        .directory_filter()
        .map_err(|e| format!("Error compiling filters: {}", e))?;
    let scanner = Scanner::new(filter);

    match &cli.command {
        Command::Scan(args) => scan_command(scanner, &settings, args, cli.quiet),
        Command::Organize(args) => organize_command(scanner, &settings, args, cli.quiet),
    }
}

fn scan_command(
    scanner: Scanner,
    settings: &Settings,
    args: &ScanArgs,
    quiet: bool,
) -> Result<(), String> {
    let request = build_request(&args.target, settings)?;

    if args.json {
        let outcome = run_scan(scanner, request, true)?;
        let json = serde_json::to_string_pretty(&outcome)
            .map_err(|e| format!("Error serializing scan results: {}", e))?;
        println!("{}", json);
        return Ok(());
    }

    let outcome = run_scan(scanner, request, quiet)?;
    if args.tree {
        OutputFormatter::header("TREE");
        OutputFormatter::print_tree(&outcome.tree);
    }
    Ok(())
}

fn organize_command(
    scanner: Scanner,
    settings: &Settings,
    args: &OrganizeArgs,
    quiet: bool,
) -> Result<(), String> {
    let request = build_request(&args.target, settings)?;
    let outcome = run_scan(scanner, request, quiet)?;

    if args.tree {
        OutputFormatter::header("TREE");
        OutputFormatter::print_tree(&outcome.tree);
    }

    if outcome.summary.cancelled {
        return Err("Scan was cancelled; refusing to organize partial results".to_string());
    }

    if outcome.files.is_empty() {
        OutputFormatter::warning("Nothing to organize. No matching files were found.");
        return Ok(());
    }

    let policy = args.on_conflict.unwrap_or(settings.organize.on_conflict);
    let organizer = Organizer::new(policy);

    if args.dry_run {
        OutputFormatter::header("DRY RUN: Files would be organized as follows:");
        for planned in organizer.plan(&outcome.files, &args.dest) {
            OutputFormatter::plain(&format!(" - {}", planned.from.display()));
            OutputFormatter::plain(&format!("   → Would move to {}", planned.to.display()));
        }
        OutputFormatter::dry_run_notice(&format!(
            "{} {} planned. No files were modified.",
            outcome.files.len(),
            plural(outcome.files.len())
        ));
        return Ok(());
    }

    OutputFormatter::info(&format!(
        "Organizing {} {} into {}",
        outcome.files.len(),
        plural(outcome.files.len()),
        args.dest.display()
    ));
    let report = organizer.organize(&outcome.files, &args.dest);

    for moved in report.moved.iter().filter(|m| m.renamed) {
        OutputFormatter::warning(&format!(
            "{} was renamed to {} to avoid overwriting",
            moved.from.display(),
            moved.to.display()
        ));
    }
    for skipped in &report.skipped {
        OutputFormatter::warning(&format!(
            "Skipped {}: {}",
            skipped.path.display(),
            skipped.reason
        ));
    }
    for failure in &report.failed {
        OutputFormatter::error(&failure.reason);
    }

    OutputFormatter::summary_table(&report.folder_counts(), report.moved_count());
    OutputFormatter::plain(&format!(
        "Attempted: {}  Moved: {}  Skipped: {}  Failed: {}",
        report.attempted,
        report.moved_count(),
        report.skipped.len(),
        report.failed_count()
    ));

    if report.is_complete_success() {
        OutputFormatter::success("Files have been organized by type.");
    } else if report.failed.is_empty() {
        OutputFormatter::warning("Organization complete with some files skipped.");
    } else {
        OutputFormatter::error("Some files could not be organized. Please review errors above.");
    }

    Ok(())
}

/// Resolves the extension set from `--types` or the settings default.
fn build_request(target: &ScanTarget, settings: &Settings) -> Result<ScanRequest, String> {
    let extensions = match &target.types {
        Some(types) => ExtensionSet::parse(types),
        None => settings.default_extensions(),
    };

    if extensions.is_empty() {
        return Err("No file extensions given. Use --types, e.g. --types pdf,png".to_string());
    }

    Ok(ScanRequest::new(&target.root, extensions))
}

/// Runs a scan on the background worker, streaming matches as they arrive.
fn run_scan(scanner: Scanner, request: ScanRequest, quiet: bool) -> Result<ScanOutcome, String> {
    if !quiet {
        OutputFormatter::info(&format!(
            "Scanning {} for files: {}",
            request.root.display(),
            request.extensions
        ));
    }

    let mut session = ScanSession::new(scanner);
    let handle = session.start(request);
    if quiet {
        for _ in handle.events() {}
    } else {
        let mut progress =
            ScanProgress::new(io::stdout().lock(), OutputFormatter::create_scan_spinner());
        for event in handle.events() {
            progress
                .handle(&event)
                .map_err(|e| format!("Error: failed to write output: {}", e))?;
        }
        progress
            .finish()
            .map_err(|e| format!("Error: failed to write output: {}", e))?;
    }

    session
        .wait()
        .map_err(|e| format!("Error: {}", e))?;
    let outcome = session
        .take_outcome()
        .ok_or_else(|| "Error: scan produced no results".to_string())?;

    if !quiet {
        let summary = &outcome.summary;
        OutputFormatter::success(&format!(
            "Scan complete. {} {} found.",
            summary.files_matched,
            plural(summary.files_matched)
        ));
        if summary.entries_skipped > 0 {
            OutputFormatter::warning(&format!(
                "{} unreadable entries were skipped.",
                summary.entries_skipped
            ));
        }
    }

    Ok(outcome)
}
