//! extsort - find files by extension and sort them into folders
//!
//! This library scans a directory tree for files with chosen extensions,
//! builds a tree of the visited hierarchy, and moves the matches into
//! extension-named folders (`PDF/`, `PNG/`, ...) under a destination.

pub mod cli;
pub mod config;
pub mod extensions;
pub mod file_organizer;
pub mod output;
pub mod scanner;
pub mod tree;
pub mod worker;

pub use config::{ConfigError, DirectoryFilter, Settings};
pub use extensions::ExtensionSet;
pub use file_organizer::{ConflictPolicy, OrganizeReport, Organizer};
pub use scanner::{FileRecord, ScanError, ScanOutcome, ScanRequest, Scanner};
pub use tree::{DirectoryNode, NodeKind};
pub use worker::{ScanHandle, ScanSession, ScanWorker};

pub use cli::{Cli, run_cli};
