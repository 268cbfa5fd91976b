//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output: colored status
//! messages, the scan progress spinner, tree rendering and summary tables.

use crate::scanner::ScanEvent;
use crate::tree::{DirectoryNode, NodeKind};
use colored::*;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

/// Streams scan events as they arrive: one line per matched path on `out`,
/// with the spinner tracking the current directory and match count.
///
/// Lines are written whether or not the spinner is visible, so piped output
/// still lists every match.
pub struct ScanProgress<W: Write> {
    out: W,
    spinner: ProgressBar,
}

impl<W: Write> ScanProgress<W> {
    pub fn new(out: W, spinner: ProgressBar) -> Self {
        Self { out, spinner }
    }

    pub fn handle(&mut self, event: &ScanEvent) -> io::Result<()> {
        match event {
            ScanEvent::Matched(record) => {
                let out = &mut self.out;
                self.spinner
                    .suspend(|| writeln!(out, "{}", record.path.display()))?;
                self.spinner.inc(1);
            }
            ScanEvent::Directory(path) => self.spinner.set_message(path.display().to_string()),
            ScanEvent::Skipped { .. } => {}
        }
        Ok(())
    }

    /// Clears the spinner and hands back the writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.spinner.finish_and_clear();
        self.out.flush()?;
        Ok(self.out)
    }
}

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use extsort::output::OutputFormatter;
    /// OutputFormatter::success("Files have been organized by type.");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a spinner for a scan whose total is unknown up front.
    ///
    /// Lines printed with `ProgressBar::println` appear above the spinner.
    pub fn create_scan_spinner() -> ProgressBar {
        // Drawn on stderr so stdout carries only the result lines.
        let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {pos} found {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Renders a scanned tree with box-drawing connectors.
    ///
    /// # Example
    ///
    /// ```
    /// use extsort::output::OutputFormatter;
    /// use extsort::tree::DirectoryNode;
    /// use std::path::{Path, PathBuf};
    ///
    /// let mut root = DirectoryNode::root(Path::new("/scan"));
    /// root.locate_or_create(Path::new("docs"))
    ///     .push_file("a.pdf".to_string(), PathBuf::from("/scan/docs/a.pdf"));
    /// let text = OutputFormatter::render_tree(&root);
    /// assert_eq!(text, "/scan\n└── docs/\n    └── a.pdf\n");
    /// ```
    pub fn render_tree(root: &DirectoryNode) -> String {
        let mut out = format!("{}\n", root.name);
        Self::render_children(root, "", &mut out);
        out
    }

    fn render_children(node: &DirectoryNode, prefix: &str, out: &mut String) {
        let count = node.children.len();
        for (i, child) in node.children.iter().enumerate() {
            let last = i + 1 == count;
            let connector = if last { "└── " } else { "├── " };
            let suffix = match child.kind {
                NodeKind::Directory => "/",
                NodeKind::File => "",
            };
            out.push_str(&format!("{}{}{}{}\n", prefix, connector, child.name, suffix));

            if !child.children.is_empty() {
                let next = format!("{}{}", prefix, if last { "    " } else { "│   " });
                Self::render_children(child, &next, out);
            }
        }
    }

    /// Prints a scanned tree.
    pub fn print_tree(root: &DirectoryNode) {
        print!("{}", Self::render_tree(root));
    }

    /// Prints a summary table with file counts per destination folder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use extsort::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("PDF".to_string(), 15);
    /// counts.insert("PNG".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(folder_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let max_folder_len = folder_counts
            .keys()
            .map(|name| folder_label(name).len())
            .max()
            .unwrap_or(0)
            .max(6);

        println!(
            "{:<width$} | {}",
            "Folder".bold(),
            "Files".bold(),
            width = max_folder_len
        );
        println!("{}", "-".repeat(max_folder_len + 10));

        for (folder, count) in folder_counts {
            println!(
                "{:<width$} | {} {}",
                folder_label(folder),
                count.to_string().green(),
                plural(*count),
                width = max_folder_len
            );
        }

        println!("{}", "-".repeat(max_folder_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files),
            width = max_folder_len
        );
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

/// Files without an extension land in the destination root.
fn folder_label(folder: &str) -> &str {
    if folder.is_empty() { "(root)" } else { folder }
}

pub fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
