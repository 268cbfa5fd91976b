//! Extension filters and extension-derived folder names.
//!
//! Extensions are stored lower-cased and without the leading dot. A file
//! matches when its lower-cased name ends with `.<ext>` for any stored
//! extension, so multi-part extensions such as `tar.gz` work as expected.

use serde::Serialize;
use std::fmt;

/// A normalized, ordered set of file extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtensionSet {
    extensions: Vec<String>,
}

impl ExtensionSet {
    /// Parses a comma-separated list such as `"pdf, PNG ,.rar"`.
    ///
    /// Entries are trimmed, lower-cased and stripped of leading dots. Empty
    /// entries and duplicates are dropped; first occurrence order is kept.
    ///
    /// # Examples
    ///
    /// ```
    /// use extsort::extensions::ExtensionSet;
    ///
    /// let set = ExtensionSet::parse("pdf, PNG ,.rar,,");
    /// assert_eq!(set.to_string(), "pdf,png,rar");
    /// ```
    pub fn parse(text: &str) -> Self {
        text.split(',').collect()
    }

    /// Returns true if `file_name` ends with any of the dotted extensions.
    pub fn matches(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.extensions.iter().any(|ext| {
            lower.len() > ext.len()
                && lower.ends_with(ext.as_str())
                && lower.as_bytes()[lower.len() - ext.len() - 1] == b'.'
        })
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    fn normalize(raw: &str) -> Option<String> {
        let ext = raw.trim().trim_start_matches('.').trim().to_lowercase();
        if ext.is_empty() { None } else { Some(ext) }
    }
}

impl<S: AsRef<str>> FromIterator<S> for ExtensionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut extensions: Vec<String> = Vec::new();
        for ext in iter.into_iter().filter_map(|s| Self::normalize(s.as_ref())) {
            if !extensions.contains(&ext) {
                extensions.push(ext);
            }
        }
        Self { extensions }
    }
}

impl fmt::Display for ExtensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extensions.join(","))
    }
}

/// Returns the destination folder name for a file: the text after the final
/// `.` in its name, upper-cased. Names without a `.` yield an empty string.
///
/// # Examples
///
/// ```
/// use extsort::extensions::organize_folder_name;
///
/// assert_eq!(organize_folder_name("report.pdf"), "PDF");
/// assert_eq!(organize_folder_name("backup.tar.gz"), "GZ");
/// assert_eq!(organize_folder_name("README"), "");
/// ```
pub fn organize_folder_name(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_uppercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_entries() {
        let set = ExtensionSet::parse(" pdf, PNG ,.rar,, ");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["pdf", "png", "rar"]);
    }

    #[test]
    fn test_parse_drops_duplicates() {
        let set = ExtensionSet::parse("pdf,PDF,.pdf,png");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_parse_empty_text() {
        assert!(ExtensionSet::parse("").is_empty());
        assert!(ExtensionSet::parse(" , ,").is_empty());
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let set = ExtensionSet::parse("pdf");
        assert!(set.matches("a.PDF"));
        assert!(set.matches("a.pdf"));
        assert!(set.matches("a.Pdf"));
        assert!(!set.matches("a.pdfx"));
        assert!(!set.matches("pdf"));
    }

    #[test]
    fn test_matches_requires_dot_boundary() {
        let set = ExtensionSet::parse("rar");
        assert!(!set.matches("sonar"));
        assert!(set.matches("archive.part1.rar"));
    }

    #[test]
    fn test_matches_multi_part_extension() {
        let set = ExtensionSet::parse("tar.gz");
        assert!(set.matches("backup.TAR.GZ"));
        assert!(!set.matches("backup.gz"));
    }

    #[test]
    fn test_matches_dot_only_name() {
        let set = ExtensionSet::parse("pdf");
        assert!(set.matches(".pdf"));
    }

    #[test]
    fn test_organize_folder_name() {
        assert_eq!(organize_folder_name("a.PDF"), "PDF");
        assert_eq!(organize_folder_name("b.png"), "PNG");
        assert_eq!(organize_folder_name("noext"), "");
        assert_eq!(organize_folder_name("trailing."), "");
    }
}
