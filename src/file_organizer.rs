/// Moving scanned files into extension folders.
///
/// Each file is moved under `<destination>/<EXT>/`, where `EXT` is the
/// upper-cased text after the final `.` in its name. Folders are created on
/// demand. Failures are recorded per file and never stop the remaining moves.
use crate::extensions::organize_folder_name;
use crate::scanner::FileRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// What to do when the destination already holds a file with the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Move the file under the first free `stem (N).ext` name.
    #[default]
    Rename,
    /// Leave the file in place and report the collision.
    Skip,
}

/// Errors that can occur while moving a single file.
#[derive(Debug)]
pub enum OrganizeError {
    /// Failed to create an extension directory.
    DirectoryCreationFailed {
        path: PathBuf,
        source: io::Error,
    },
    /// Failed to move a file to its extension directory.
    FileMoveFailure {
        source: PathBuf,
        destination: PathBuf,
        source_error: io::Error,
    },
    /// The file path has no final name component.
    MissingFileName { path: PathBuf },
    /// The destination already holds a file with the same name.
    NameCollision { destination: PathBuf },
    /// The file already sits at its destination.
    AlreadyOrganized { path: PathBuf },
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::FileMoveFailure {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
            Self::MissingFileName { path } => {
                write!(f, "Path {} has no file name", path.display())
            }
            Self::NameCollision { destination } => {
                write!(f, "{} already exists", destination.display())
            }
            Self::AlreadyOrganized { path } => {
                write!(f, "{} is already organized", path.display())
            }
        }
    }
}

impl std::error::Error for OrganizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DirectoryCreationFailed { source, .. } => Some(source),
            Self::FileMoveFailure { source_error, .. } => Some(source_error),
            _ => None,
        }
    }
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Broad classification of a per-file failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The scanned file no longer exists (deleted or already moved).
    StaleFile,
    PermissionDenied,
    /// The destination name was taken and the policy is `Skip`.
    NameCollision,
    /// The file already sits at its destination.
    AlreadyOrganized,
    /// The extension folder could not be created.
    DirectoryCreation,
    Io,
}

impl FailureKind {
    fn from_io(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => FailureKind::StaleFile,
            io::ErrorKind::PermissionDenied => FailureKind::PermissionDenied,
            _ => FailureKind::Io,
        }
    }

    fn classify(error: &OrganizeError) -> Self {
        match error {
            OrganizeError::DirectoryCreationFailed { .. } => FailureKind::DirectoryCreation,
            OrganizeError::FileMoveFailure { source_error, .. } => Self::from_io(source_error),
            OrganizeError::MissingFileName { .. } => FailureKind::Io,
            OrganizeError::NameCollision { .. } => FailureKind::NameCollision,
            OrganizeError::AlreadyOrganized { .. } => FailureKind::AlreadyOrganized,
        }
    }

    /// Kinds that leave the file untouched on purpose rather than by error.
    pub fn is_skip(&self) -> bool {
        matches!(self, FailureKind::NameCollision | FailureKind::AlreadyOrganized)
    }
}

/// A file that was not moved, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct MoveFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub reason: String,
}

/// A file that was moved successfully.
#[derive(Debug, Clone, Serialize)]
pub struct MovedFile {
    pub from: PathBuf,
    pub to: PathBuf,
    /// The folder the file landed in (e.g. "PDF").
    pub folder: String,
    /// True if the file was given a new name to avoid a collision.
    pub renamed: bool,
}

/// A move that would be performed, as computed for a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMove {
    pub from: PathBuf,
    pub to: PathBuf,
    pub folder: String,
}

/// The outcome of an organize run.
#[derive(Debug, Default, Serialize)]
pub struct OrganizeReport {
    /// Number of files a move was attempted for.
    pub attempted: usize,
    pub moved: Vec<MovedFile>,
    pub failed: Vec<MoveFailure>,
    pub skipped: Vec<MoveFailure>,
}

impl OrganizeReport {
    /// The report for an empty input list.
    pub fn nothing_to_organize() -> Self {
        Self::default()
    }

    /// True if there was nothing to organize.
    pub fn is_empty(&self) -> bool {
        self.attempted == 0
    }

    pub fn moved_count(&self) -> usize {
        self.moved.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// Number of moved files per destination folder, sorted by folder name.
    pub fn folder_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for moved in &self.moved {
            *counts.entry(moved.folder.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Moves files into extension-named folders under a destination root.
#[derive(Debug, Clone, Copy, Default)]
pub struct Organizer {
    policy: ConflictPolicy,
}

impl Organizer {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Moves every file in `files` into `<destination>/<EXT>/`.
    ///
    /// Every file is attempted, in order. A failure on one file is recorded
    /// in the report and the next file is processed. An empty `files` list
    /// touches nothing and returns [`OrganizeReport::nothing_to_organize`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use extsort::file_organizer::{ConflictPolicy, Organizer};
    /// use extsort::scanner::FileRecord;
    /// use std::path::Path;
    ///
    /// let files = vec![FileRecord::new("/root/a.PDF"), FileRecord::new("/root/sub/b.png")];
    /// let report = Organizer::new(ConflictPolicy::Rename).organize(&files, Path::new("/out"));
    /// println!("moved {} of {}", report.moved_count(), report.attempted);
    /// ```
    pub fn organize(&self, files: &[FileRecord], destination: &Path) -> OrganizeReport {
        if files.is_empty() {
            return OrganizeReport::nothing_to_organize();
        }

        let mut report = OrganizeReport {
            attempted: files.len(),
            ..OrganizeReport::default()
        };

        for record in files {
            match self.move_to_extension_folder(destination, &record.path) {
                Ok(moved) => {
                    log::debug!("moved {} -> {}", moved.from.display(), moved.to.display());
                    report.moved.push(moved);
                }
                Err(error) => {
                    let failure = MoveFailure {
                        path: record.path.clone(),
                        kind: FailureKind::classify(&error),
                        reason: error.to_string(),
                    };
                    if failure.kind.is_skip() {
                        log::info!("skipped {}: {}", record.path.display(), failure.reason);
                        report.skipped.push(failure);
                    } else {
                        log::warn!("could not move {}: {}", record.path.display(), failure.reason);
                        report.failed.push(failure);
                    }
                }
            }
        }

        report
    }

    /// Computes where each file would be moved without touching the filesystem.
    ///
    /// Collisions with files already present at the destination are not
    /// resolved here.
    pub fn plan(&self, files: &[FileRecord], destination: &Path) -> Vec<PlannedMove> {
        files
            .iter()
            .filter_map(|record| {
                let file_name = record.path.file_name()?;
                let folder = organize_folder_name(&file_name.to_string_lossy());
                Some(PlannedMove {
                    from: record.path.clone(),
                    to: destination.join(&folder).join(file_name),
                    folder,
                })
            })
            .collect()
    }

    /// Moves a single file into its extension folder under `destination`.
    ///
    /// The folder is created if missing. An existing file at the target name
    /// is never overwritten: depending on the policy the file is renamed or
    /// an `OrganizeError::NameCollision` is returned.
    pub fn move_to_extension_folder(
        &self,
        destination: &Path,
        file_path: &Path,
    ) -> OrganizeResult<MovedFile> {
        let file_name = file_path
            .file_name()
            .ok_or_else(|| OrganizeError::MissingFileName {
                path: file_path.to_path_buf(),
            })?;

        // Stale paths fail before any folder is created.
        fs::symlink_metadata(file_path).map_err(|e| OrganizeError::FileMoveFailure {
            source: file_path.to_path_buf(),
            destination: destination.to_path_buf(),
            source_error: e,
        })?;

        let folder = organize_folder_name(&file_name.to_string_lossy());
        let folder_path = destination.join(&folder);

        fs::create_dir_all(&folder_path).map_err(|e| OrganizeError::DirectoryCreationFailed {
            path: folder_path.clone(),
            source: e,
        })?;

        let mut destination_path = folder_path.join(file_name);
        let mut renamed = false;

        if same_file(file_path, &destination_path) {
            return Err(OrganizeError::AlreadyOrganized {
                path: destination_path,
            });
        }

        let move_failure = |destination: &Path, e: io::Error| OrganizeError::FileMoveFailure {
            source: file_path.to_path_buf(),
            destination: destination.to_path_buf(),
            source_error: e,
        };

        // Claim the target name before moving; an existing file is never replaced.
        match reserve(&destination_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => match self.policy {
                ConflictPolicy::Skip => {
                    return Err(OrganizeError::NameCollision {
                        destination: destination_path,
                    });
                }
                ConflictPolicy::Rename => {
                    destination_path = reserve_free_name(&folder_path, file_name)
                        .map_err(|e| move_failure(&folder_path, e))?;
                    renamed = true;
                }
            },
            Err(e) => return Err(move_failure(&destination_path, e)),
        }

        transfer(file_path, &destination_path).map_err(|e| move_failure(&destination_path, e))?;

        Ok(MovedFile {
            from: file_path.to_path_buf(),
            to: destination_path,
            folder,
            renamed,
        })
    }
}

/// Compares parent directories and names, so a symlink is not confused with
/// its target.
fn same_file(a: &Path, b: &Path) -> bool {
    let location = |path: &Path| {
        let parent = fs::canonicalize(path.parent()?).ok()?;
        Some((parent, path.file_name()?.to_os_string()))
    };
    match (location(a), location(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Creates an empty placeholder at `path`, failing if anything is already there.
fn reserve(path: &Path) -> io::Result<()> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map(drop)
}

/// Returns `stem (n).ext` for `file_name`, keeping non-UTF-8 bytes intact.
fn numbered_name(file_name: &OsStr, n: u32) -> OsString {
    let path = Path::new(file_name);
    let mut candidate = path.file_stem().unwrap_or(file_name).to_os_string();
    candidate.push(format!(" ({})", n));
    if let Some(ext) = path.extension() {
        candidate.push(".");
        candidate.push(ext);
    }
    candidate
}

/// Reserves the first free `stem (N).ext` path in `folder`.
fn reserve_free_name(folder: &Path, file_name: &OsStr) -> io::Result<PathBuf> {
    let mut n = 1;
    loop {
        let candidate = folder.join(numbered_name(file_name, n));
        match reserve(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && n < u32::MAX => n += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Moves `from` onto the reserved path `to`. On failure `to` is removed, so
/// neither a placeholder nor a partial copy is left behind.
fn transfer(from: &Path, to: &Path) -> io::Result<()> {
    move_file(from, to).inspect_err(|_| {
        let _ = fs::remove_file(to);
    })
}

/// Renames `from` to `to`, falling back to copy and remove across devices.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            log::debug!("{} is on another device, copying", from.display());
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(path: &Path) -> FileRecord {
        FileRecord::new(path)
    }

    #[test]
    fn test_organize_creates_extension_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("src");
        let dest = temp_dir.path().join("out");
        fs::create_dir(&source).unwrap();

        let file_path = source.join("test.pdf");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        let report = Organizer::default().organize(&[record(&file_path)], &dest);

        assert_eq!(report.attempted, 1);
        assert_eq!(report.moved_count(), 1);
        assert!(!file_path.exists());
        assert!(dest.join("PDF").join("test.pdf").is_file());
    }

    #[test]
    fn test_organize_uses_existing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dest = temp_dir.path().join("out");
        fs::create_dir_all(dest.join("PNG")).unwrap();

        let file_path = temp_dir.path().join("test.png");
        fs::write(&file_path, "test content").unwrap();

        let report = Organizer::default().organize(&[record(&file_path)], &dest);

        assert!(report.is_complete_success());
        assert!(dest.join("PNG").join("test.png").exists());
    }

    #[test]
    fn test_organize_empty_list_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("out");

        let report = Organizer::default().organize(&[], &dest);

        assert!(report.is_empty());
        assert!(!dest.exists());
    }

    #[test]
    fn test_organize_stale_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("out");
        let missing = temp_dir.path().join("gone.pdf");
        let present = temp_dir.path().join("here.pdf");
        fs::write(&present, "x").unwrap();

        let report = Organizer::default().organize(&[record(&missing), record(&present)], &dest);

        assert_eq!(report.attempted, 2);
        assert_eq!(report.moved_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.failed[0].kind, FailureKind::StaleFile);
        assert!(dest.join("PDF").join("here.pdf").exists());
    }

    #[test]
    fn test_organize_renames_on_collision() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("out");
        fs::create_dir_all(dest.join("PDF")).unwrap();
        fs::write(dest.join("PDF").join("a.pdf"), "existing").unwrap();
        fs::write(dest.join("PDF").join("a (1).pdf"), "existing too").unwrap();

        let file_path = temp_dir.path().join("a.pdf");
        fs::write(&file_path, "incoming").unwrap();

        let report = Organizer::new(ConflictPolicy::Rename).organize(&[record(&file_path)], &dest);

        assert_eq!(report.moved_count(), 1);
        assert!(report.moved[0].renamed);
        assert_eq!(report.moved[0].to, dest.join("PDF").join("a (2).pdf"));
        assert_eq!(
            fs::read_to_string(dest.join("PDF").join("a.pdf")).unwrap(),
            "existing"
        );
        assert_eq!(
            fs::read_to_string(dest.join("PDF").join("a (2).pdf")).unwrap(),
            "incoming"
        );
    }

    #[test]
    fn test_organize_skips_on_collision() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("out");
        fs::create_dir_all(dest.join("PDF")).unwrap();
        fs::write(dest.join("PDF").join("a.pdf"), "existing").unwrap();

        let file_path = temp_dir.path().join("a.pdf");
        fs::write(&file_path, "incoming").unwrap();

        let report = Organizer::new(ConflictPolicy::Skip).organize(&[record(&file_path)], &dest);

        assert_eq!(report.moved_count(), 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].kind, FailureKind::NameCollision);
        assert!(file_path.exists());
        assert_eq!(
            fs::read_to_string(dest.join("PDF").join("a.pdf")).unwrap(),
            "existing"
        );
    }

    #[test]
    fn test_organize_file_already_at_destination_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path();
        fs::create_dir_all(dest.join("PDF")).unwrap();
        let file_path = dest.join("PDF").join("a.pdf");
        fs::write(&file_path, "x").unwrap();

        let report = Organizer::new(ConflictPolicy::Rename).organize(&[record(&file_path)], dest);

        assert_eq!(report.moved_count(), 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].kind, FailureKind::AlreadyOrganized);
        assert!(file_path.exists());
        assert!(!dest.join("PDF").join("a (1).pdf").exists());
    }

    #[test]
    fn test_organize_blocked_folder_fails_one_file() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("out");
        fs::create_dir_all(&dest).unwrap();
        // A regular file where the PDF folder should go.
        fs::write(dest.join("PDF"), "not a directory").unwrap();

        let pdf = temp_dir.path().join("a.pdf");
        let png = temp_dir.path().join("b.png");
        fs::write(&pdf, "x").unwrap();
        fs::write(&png, "y").unwrap();

        let report = Organizer::default().organize(&[record(&pdf), record(&png)], &dest);

        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.failed[0].kind, FailureKind::DirectoryCreation);
        assert!(pdf.exists());
        assert!(dest.join("PNG").join("b.png").exists());
    }

    #[test]
    fn test_plan_does_not_touch_filesystem() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("out");
        let files = vec![
            FileRecord::new("/root/a.PDF"),
            FileRecord::new("/root/sub/b.png"),
        ];

        let plan = Organizer::default().plan(&files, &dest);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].to, dest.join("PDF").join("a.PDF"));
        assert_eq!(plan[1].to, dest.join("PNG").join("b.png"));
        assert!(!dest.exists());
    }

    #[test]
    fn test_folder_counts() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("out");
        let names = ["a.pdf", "b.PDF", "c.png"];
        let files: Vec<_> = names
            .iter()
            .map(|name| {
                let path = temp_dir.path().join(name);
                fs::write(&path, name).unwrap();
                record(&path)
            })
            .collect();

        let report = Organizer::default().organize(&files, &dest);
        let counts = report.folder_counts();

        assert_eq!(counts.get("PDF"), Some(&2));
        assert_eq!(counts.get("PNG"), Some(&1));
    }

    #[test]
    fn test_free_name_without_extension() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("notes"), "x").unwrap();
        assert_eq!(
            reserve_free_name(temp_dir.path(), OsStr::new("notes")).unwrap(),
            temp_dir.path().join("notes (1)")
        );
        assert_eq!(numbered_name(OsStr::new("a.tar.gz"), 3), "a.tar (3).gz");
        assert_eq!(numbered_name(OsStr::new(".pdf"), 1), ".pdf (1)");
    }

    #[test]
    fn test_reserve_refuses_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let taken = temp_dir.path().join("a.pdf");
        fs::write(&taken, "original").unwrap();

        let error = reserve(&taken).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&taken).unwrap(), "original");
    }

    #[test]
    fn test_organize_keeps_file_created_at_renamed_target() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("in");
        let dest = temp_dir.path().join("out");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(dest.join("PDF")).unwrap();
        fs::write(dest.join("PDF").join("a.pdf"), "first").unwrap();
        fs::write(dest.join("PDF").join("a (1).pdf"), "second").unwrap();
        let file_path = source.join("a.pdf");
        fs::write(&file_path, "new").unwrap();

        let moved = Organizer::default()
            .move_to_extension_folder(&dest, &file_path)
            .unwrap();

        assert_eq!(moved.to, dest.join("PDF").join("a (2).pdf"));
        assert_eq!(fs::read_to_string(&moved.to).unwrap(), "new");
        assert_eq!(fs::read_to_string(dest.join("PDF").join("a (1).pdf")).unwrap(), "second");
    }

    #[test]
    fn test_failed_transfer_removes_reserved_target() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("a.pdf");
        reserve(&target).unwrap();

        let missing = temp_dir.path().join("gone.pdf");
        assert!(transfer(&missing, &target).is_err());
        assert!(!target.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_link_to_organized_file_is_moved_not_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("out");
        let target = dest.join("PDF").join("a.pdf");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "x").unwrap();
        let link = temp_dir.path().join("a.pdf");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let moved = Organizer::default()
            .move_to_extension_folder(&dest, &link)
            .unwrap();

        assert!(moved.renamed);
        assert_eq!(moved.to, dest.join("PDF").join("a (1).pdf"));
        assert!(fs::symlink_metadata(&moved.to).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&target).unwrap(), "x");
    }

    #[cfg(unix)]
    #[test]
    fn test_rename_keeps_non_utf8_name_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("in");
        let dest = temp_dir.path().join("out");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(dest.join("PDF")).unwrap();

        let name = OsStr::from_bytes(b"caf\xe9.pdf");
        let file_path = source.join(name);
        if fs::write(&file_path, "x").is_err() {
            // Filesystem rejects non-UTF-8 names.
            return;
        }
        fs::write(dest.join("PDF").join(name), "existing").unwrap();

        let moved = Organizer::default()
            .move_to_extension_folder(&dest, &file_path)
            .unwrap();

        let expected = OsStr::from_bytes(b"caf\xe9 (1).pdf");
        assert_eq!(moved.to, dest.join("PDF").join(expected));
        assert!(moved.renamed);
        assert!(moved.to.is_file());
    }
}
