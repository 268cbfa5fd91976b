/// Directory hierarchy built while scanning.
///
/// The tree mirrors only the part of the filesystem the scanner visited:
/// every directory that was not pruned, plus the matching files inside them.
/// Nodes are located by walking path segments relative to the scan root and
/// comparing names against existing children.
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// Whether a node stands for a directory or a matched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Directory,
    File,
}

/// A node in the scanned directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryNode {
    /// The display name (last path segment, or the root path itself).
    pub name: String,
    /// The full path of the entry.
    pub path: PathBuf,
    pub kind: NodeKind,
    /// Children in traversal order.
    pub children: Vec<DirectoryNode>,
}

impl DirectoryNode {
    /// Creates the root node for a scan.
    pub fn root(path: &Path) -> Self {
        Self {
            name: path.display().to_string(),
            path: path.to_path_buf(),
            kind: NodeKind::Directory,
            children: Vec::new(),
        }
    }

    fn directory(name: String, path: PathBuf) -> Self {
        Self {
            name,
            path,
            kind: NodeKind::Directory,
            children: Vec::new(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Finds the directory node for `relative`, creating any missing
    /// intermediate directories along the way.
    ///
    /// An empty `relative` path returns `self`.
    pub fn locate_or_create(&mut self, relative: &Path) -> &mut DirectoryNode {
        let mut node = self;
        for segment in normal_segments(relative) {
            let index = match node
                .children
                .iter()
                .position(|child| child.is_directory() && child.name == segment)
            {
                Some(index) => index,
                None => {
                    let path = node.path.join(&segment);
                    node.children.push(Self::directory(segment, path));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index];
        }
        node
    }

    /// Appends a file node under this node.
    pub fn push_file(&mut self, name: String, path: PathBuf) {
        self.children.push(Self {
            name,
            path,
            kind: NodeKind::File,
            children: Vec::new(),
        });
    }

    /// Looks up a node by its path relative to this node.
    pub fn find(&self, relative: &Path) -> Option<&DirectoryNode> {
        let mut node = self;
        for segment in normal_segments(relative) {
            node = node.children.iter().find(|child| child.name == segment)?;
        }
        Some(node)
    }

    /// Number of file nodes in this subtree.
    pub fn file_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child.kind {
                NodeKind::File => 1,
                NodeKind::Directory => child.file_count(),
            })
            .sum()
    }

    /// Number of directory nodes below this node (excluding itself).
    pub fn directory_count(&self) -> usize {
        self.children
            .iter()
            .filter(|child| child.is_directory())
            .map(|child| 1 + child.directory_count())
            .sum()
    }
}

fn normal_segments(relative: &Path) -> impl Iterator<Item = String> + '_ {
    relative.components().filter_map(|component| match component {
        Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_or_create_builds_intermediate_nodes() {
        let mut root = DirectoryNode::root(Path::new("/scan"));
        let node = root.locate_or_create(Path::new("a/b/c"));
        assert_eq!(node.name, "c");
        assert_eq!(node.path, PathBuf::from("/scan/a/b/c"));

        assert_eq!(root.directory_count(), 3);
        assert!(root.find(Path::new("a/b")).is_some());
    }

    #[test]
    fn test_locate_or_create_reuses_existing_nodes() {
        let mut root = DirectoryNode::root(Path::new("/scan"));
        root.locate_or_create(Path::new("a/b"));
        root.locate_or_create(Path::new("a/c"));
        root.locate_or_create(Path::new("a/b"));

        assert_eq!(root.children.len(), 1);
        let a = root.find(Path::new("a")).unwrap();
        let names: Vec<_> = a.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_locate_or_create_empty_path_is_root() {
        let mut root = DirectoryNode::root(Path::new("/scan"));
        let node = root.locate_or_create(Path::new(""));
        assert_eq!(node.path, PathBuf::from("/scan"));
    }

    #[test]
    fn test_file_node_does_not_shadow_directory() {
        let mut root = DirectoryNode::root(Path::new("/scan"));
        root.push_file("x".to_string(), PathBuf::from("/scan/x"));
        root.locate_or_create(Path::new("x"));

        assert_eq!(root.children.len(), 2);
        assert_eq!(root.file_count(), 1);
        assert_eq!(root.directory_count(), 1);
    }

    #[test]
    fn test_file_count_is_recursive() {
        let mut root = DirectoryNode::root(Path::new("/scan"));
        root.push_file("a.pdf".to_string(), PathBuf::from("/scan/a.pdf"));
        root.locate_or_create(Path::new("sub"))
            .push_file("b.png".to_string(), PathBuf::from("/scan/sub/b.png"));

        assert_eq!(root.file_count(), 2);
    }
}
