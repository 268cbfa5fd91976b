//! Directory traversal and extension matching.
//!
//! The scanner walks a root directory top-down, prunes reserved directories,
//! and records every file whose name carries one of the requested
//! extensions. It returns both a flat list of matches, in discovery order,
//! and a [`DirectoryNode`] tree mirroring the visited hierarchy.
//!
//! Unreadable entries are skipped and reported to the observer; only an
//! invalid root aborts a scan.

use crate::config::DirectoryFilter;
use crate::extensions::ExtensionSet;
use crate::tree::DirectoryNode;
use chrono::{DateTime, Utc};
use crossbeam::channel::Sender;
use serde::Serialize;
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use walkdir::WalkDir;

/// Errors that abort a scan.
#[derive(Debug)]
pub enum ScanError {
    /// The scan root is missing or not a directory.
    InvalidRoot {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The background scan thread panicked.
    WorkerPanicked,
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRoot { path, source } => {
                write!(f, "Invalid scan root {}: {}", path.display(), source)
            }
            Self::WorkerPanicked => write!(f, "Scan worker stopped unexpectedly"),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRoot { source, .. } => Some(source),
            Self::WorkerPanicked => None,
        }
    }
}

/// Result type for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Input to a scan.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub root: PathBuf,
    pub extensions: ExtensionSet,
}

impl ScanRequest {
    pub fn new(root: impl Into<PathBuf>, extensions: ExtensionSet) -> Self {
        Self {
            root: root.into(),
            extensions,
        }
    }
}

/// A matched file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FileRecord {
    pub path: PathBuf,
}

impl FileRecord {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

/// A single progress notification from a running scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A directory was entered.
    Directory(PathBuf),
    /// A file matched the extension filter.
    Matched(FileRecord),
    /// An entry could not be read and was skipped.
    Skipped { path: PathBuf, reason: String },
}

/// Receives progress while a scan runs.
pub trait ScanObserver {
    fn on_directory(&mut self, _path: &Path) {}
    fn on_match(&mut self, _record: &FileRecord) {}
    fn on_skipped(&mut self, _path: &Path, _reason: &str) {}
}

/// An observer that ignores all progress.
pub struct NullObserver;

impl ScanObserver for NullObserver {}

/// Collects events in memory.
impl ScanObserver for Vec<ScanEvent> {
    fn on_directory(&mut self, path: &Path) {
        self.push(ScanEvent::Directory(path.to_path_buf()));
    }

    fn on_match(&mut self, record: &FileRecord) {
        self.push(ScanEvent::Matched(record.clone()));
    }

    fn on_skipped(&mut self, path: &Path, reason: &str) {
        self.push(ScanEvent::Skipped {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        });
    }
}

/// Forwards events over a channel. A disconnected receiver is ignored.
impl ScanObserver for Sender<ScanEvent> {
    fn on_directory(&mut self, path: &Path) {
        let _ = self.send(ScanEvent::Directory(path.to_path_buf()));
    }

    fn on_match(&mut self, record: &FileRecord) {
        let _ = self.send(ScanEvent::Matched(record.clone()));
    }

    fn on_skipped(&mut self, path: &Path, reason: &str) {
        let _ = self.send(ScanEvent::Skipped {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        });
    }
}

/// Counters and timing for a finished scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub root: PathBuf,
    pub extensions: ExtensionSet,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub directories_visited: usize,
    pub directories_pruned: usize,
    pub files_matched: usize,
    pub entries_skipped: usize,
    /// True if the scan stopped early; results are partial.
    pub cancelled: bool,
}

/// Everything a scan produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub tree: DirectoryNode,
    pub files: Vec<FileRecord>,
    pub summary: ScanSummary,
}

/// Walks directory trees looking for files with given extensions.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    filter: DirectoryFilter,
}

impl Scanner {
    pub fn new(filter: DirectoryFilter) -> Self {
        Self { filter }
    }

    /// Scans without progress reporting or cancellation.
    pub fn scan_all(&self, request: &ScanRequest) -> ScanResult<ScanOutcome> {
        self.scan(request, &mut NullObserver, &AtomicBool::new(false))
    }

    /// Scans `request.root`, reporting progress to `observer`.
    ///
    /// `cancel` is checked before each entry. Once set, the walk stops and the
    /// partial outcome is returned with `summary.cancelled` set.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::InvalidRoot` if the root does not exist or is not a
    /// directory. Failures below the root are skipped.
    pub fn scan(
        &self,
        request: &ScanRequest,
        observer: &mut dyn ScanObserver,
        cancel: &AtomicBool,
    ) -> ScanResult<ScanOutcome> {
        let root = request.root.as_path();
        let metadata = fs::metadata(root).map_err(|e| ScanError::InvalidRoot {
            path: root.to_path_buf(),
            source: e,
        })?;
        if !metadata.is_dir() {
            return Err(ScanError::InvalidRoot {
                path: root.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotADirectory,
                    "scan root is not a directory",
                ),
            });
        }

        let started_at = Utc::now();
        let clock = Instant::now();
        log::info!("scanning {} for [{}]", root.display(), request.extensions);

        let mut tree = DirectoryNode::root(root);
        let mut files = Vec::new();
        let mut directories_visited = 0;
        let mut entries_skipped = 0;
        let mut cancelled = false;
        let pruned = Cell::new(0usize);

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                match self.filter.exclusion_reason(entry.path()) {
                    Some(reason) => {
                        log::debug!("pruning {}: {}", entry.path().display(), reason);
                        pruned.set(pruned.get() + 1);
                        false
                    }
                    None => true,
                }
            });

        for item in walker {
            if cancel.load(Ordering::Relaxed) {
                log::info!("scan of {} cancelled", root.display());
                cancelled = true;
                break;
            }

            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    let reason = err
                        .io_error()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| err.to_string());
                    log::warn!("skipping {}: {}", path.display(), reason);
                    observer.on_skipped(&path, &reason);
                    entries_skipped += 1;
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                tree.locate_or_create(relative_to(entry.path(), root));
                directories_visited += 1;
                observer.on_directory(entry.path());
            } else if file_type.is_file() || is_file_link(entry.path(), file_type) {
                let name = entry.file_name().to_string_lossy();
                if !request.extensions.matches(&name) {
                    continue;
                }

                let parent = entry.path().parent().unwrap_or(root);
                tree.locate_or_create(relative_to(parent, root))
                    .push_file(name.into_owned(), entry.path().to_path_buf());

                let record = FileRecord::new(entry.path());
                observer.on_match(&record);
                files.push(record);
            }
        }

        let summary = ScanSummary {
            root: root.to_path_buf(),
            extensions: request.extensions.clone(),
            started_at,
            elapsed_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
            directories_visited,
            directories_pruned: pruned.get(),
            files_matched: files.len(),
            entries_skipped,
            cancelled,
        };
        log::info!(
            "scan finished: {} files in {} directories",
            summary.files_matched,
            summary.directories_visited
        );

        Ok(ScanOutcome {
            tree,
            files,
            summary,
        })
    }
}

/// Symlinks to regular files count as files; directory links are not followed.
fn is_file_link(path: &Path, file_type: fs::FileType) -> bool {
    file_type.is_symlink() && fs::metadata(path).is_ok_and(|metadata| metadata.is_file())
}

fn relative_to<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(Path::new(""))
}
