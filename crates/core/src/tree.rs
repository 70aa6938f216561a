//! Hierarchical workspace tree built from a flat remote listing
//!
//! The remote reports a repository as a flat list of `(path, kind)` entries.
//! The editor works on a nested tree, so the builder walks every entry's
//! segments from the root and creates each intermediate folder once, using a
//! path index to find nodes that already exist.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Name of the placeholder committed for otherwise-empty folders
pub const KEEP_FILE: &str = ".gitkeep";

/// Kind of an entry in the remote's flat listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// File object
    Blob,
    /// Directory object
    Tree,
}

/// Kind of a node in the workspace tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// A node in the workspace tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    /// Leaf segment of the path
    pub name: String,
    /// Full `/`-delimited path from the workspace root
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Present only for folders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
    /// Inline content carried by synthetic entries (placeholders)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FileNode {
    /// Create a file node; the name is the last path segment
    pub fn file(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: leaf_name(&path).to_string(),
            path,
            kind: NodeKind::File,
            children: None,
            content: None,
        }
    }

    /// Create an empty folder node
    pub fn folder(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: leaf_name(&path).to_string(),
            path,
            kind: NodeKind::Folder,
            children: Some(Vec::new()),
            content: None,
        }
    }

    /// Attach inline content
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Append a child (folders only; ignored for files)
    pub fn with_child(mut self, child: FileNode) -> Self {
        if let Some(children) = self.children.as_mut() {
            children.push(child);
        }
        self
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Children of a folder, empty for files
    pub fn children(&self) -> &[FileNode] {
        self.children.as_deref().unwrap_or(&[])
    }
}

fn leaf_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Arena node used while building; children are indices into the arena
#[derive(Debug)]
struct PendingNode {
    name: String,
    path: String,
    kind: NodeKind,
    children: Vec<usize>,
}

/// Incremental builder for the workspace tree
///
/// Entries are processed in input order and children keep first-insertion
/// order at every level; nothing is sorted.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<PendingNode>,
    roots: Vec<usize>,
    /// path -> arena index
    index: AHashMap<String, usize>,
}

impl TreeBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one entry from a flat listing
    ///
    /// The terminal segment becomes a file only when `kind` is a blob; every
    /// other segment is a folder. When a path is pushed again with a
    /// different kind, the later kind wins.
    pub fn push(&mut self, path: &str, kind: EntryKind) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return;
        }

        let last = segments.len() - 1;
        let mut parent: Option<usize> = None;
        let mut current = String::with_capacity(path.len());

        for (i, segment) in segments.iter().enumerate() {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);

            let wanted = if i == last && kind == EntryKind::Blob {
                NodeKind::File
            } else {
                NodeKind::Folder
            };

            let idx = match self.index.get(current.as_str()) {
                Some(&idx) => {
                    // Intermediate segments must be folders to hold the rest
                    // of the path; the terminal segment takes the new kind.
                    if i == last || wanted == NodeKind::Folder {
                        self.set_kind(idx, wanted);
                    }
                    idx
                }
                None => {
                    let idx = self.nodes.len();
                    self.nodes.push(PendingNode {
                        name: (*segment).to_string(),
                        path: current.clone(),
                        kind: wanted,
                        children: Vec::new(),
                    });
                    match parent {
                        Some(p) => self.nodes[p].children.push(idx),
                        None => self.roots.push(idx),
                    }
                    self.index.insert(current.clone(), idx);
                    idx
                }
            };

            parent = Some(idx);
        }
    }

    fn set_kind(&mut self, idx: usize, kind: NodeKind) {
        if self.nodes[idx].kind == kind {
            return;
        }
        if kind == NodeKind::File {
            // A file has no descendants; forget them so later entries under
            // this path start fresh.
            debug!("{} replaced a folder with a file", self.nodes[idx].path);
            let children = std::mem::take(&mut self.nodes[idx].children);
            for child in children {
                self.forget_subtree(child);
            }
        }
        self.nodes[idx].kind = kind;
    }

    fn forget_subtree(&mut self, idx: usize) {
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            let path = self.nodes[current].path.clone();
            self.index.remove(&path);
            stack.extend(std::mem::take(&mut self.nodes[current].children));
        }
    }

    /// Number of distinct paths currently in the tree
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Materialize the nested tree
    pub fn finish(self) -> Vec<FileNode> {
        self.roots.iter().map(|&idx| self.materialize(idx)).collect()
    }

    fn materialize(&self, idx: usize) -> FileNode {
        let node = &self.nodes[idx];
        let children = match node.kind {
            NodeKind::File => None,
            NodeKind::Folder => Some(
                node.children
                    .iter()
                    .map(|&child| self.materialize(child))
                    .collect(),
            ),
        };
        FileNode {
            name: node.name.clone(),
            path: node.path.clone(),
            kind: node.kind,
            children,
            content: None,
        }
    }
}

/// Build a tree from a flat `(path, kind)` listing
pub fn build<'a, I>(entries: I) -> Vec<FileNode>
where
    I: IntoIterator<Item = (&'a str, EntryKind)>,
{
    let mut builder = TreeBuilder::new();
    for (path, kind) in entries {
        builder.push(path, kind);
    }
    builder.finish()
}

/// Flatten the tree into the files it would commit
///
/// Depth-first, insertion order. An empty folder yields a synthetic
/// `<folder>/.gitkeep` node with empty inline content so the folder survives
/// on a remote that only stores files.
pub fn collect_files(nodes: &[FileNode]) -> Vec<FileNode> {
    let mut files = Vec::new();
    let mut stack: Vec<&FileNode> = nodes.iter().rev().collect();

    while let Some(node) = stack.pop() {
        match node.kind {
            NodeKind::File => files.push(node.clone()),
            NodeKind::Folder => {
                let children = node.children();
                if children.is_empty() {
                    files.push(
                        FileNode::file(format!("{}/{}", node.path, KEEP_FILE)).with_content(""),
                    );
                } else {
                    stack.extend(children.iter().rev());
                }
            }
        }
    }

    files
}

/// Every node path in the tree, files and folders alike
pub fn all_paths(nodes: &[FileNode]) -> HashSet<String> {
    let mut paths = HashSet::new();
    let mut stack: Vec<&FileNode> = nodes.iter().collect();
    while let Some(node) = stack.pop() {
        paths.insert(node.path.clone());
        stack.extend(node.children());
    }
    paths
}

/// Find a node by path
pub fn find<'a>(nodes: &'a [FileNode], path: &str) -> Option<&'a FileNode> {
    let mut stack: Vec<&FileNode> = nodes.iter().collect();
    while let Some(node) = stack.pop() {
        if node.path == path {
            return Some(node);
        }
        if path.starts_with(&node.path) {
            stack.extend(node.children());
        }
    }
    None
}

/// Insert a path into an existing tree, creating missing folders
///
/// Existing nodes keep their position; new nodes are appended to their
/// parent. Returns false when a file already occupies an intermediate
/// segment.
pub fn insert_path(nodes: &mut Vec<FileNode>, path: &str, kind: NodeKind) -> bool {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return false;
    }

    let last = segments.len() - 1;
    let mut level = nodes;
    let mut current = String::with_capacity(path.len());

    for (i, segment) in segments.iter().enumerate() {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);

        let position = match level.iter().position(|n| n.name == *segment) {
            Some(position) => position,
            None => {
                let node = if i == last && kind == NodeKind::File {
                    FileNode::file(current.clone())
                } else {
                    FileNode::folder(current.clone())
                };
                level.push(node);
                level.len() - 1
            }
        };

        if i == last {
            return true;
        }
        match level[position].children.as_mut() {
            Some(children) => level = children,
            None => return false,
        }
    }

    true
}

/// Remove a node (and everything under it); returns the removed node
pub fn remove_path(nodes: &mut Vec<FileNode>, path: &str) -> Option<FileNode> {
    if let Some(position) = nodes.iter().position(|n| n.path == path) {
        return Some(nodes.remove(position));
    }
    for node in nodes.iter_mut() {
        let inside = path
            .strip_prefix(node.path.as_str())
            .is_some_and(|rest| rest.starts_with('/'));
        if inside {
            if let Some(children) = node.children.as_mut() {
                return remove_path(children, path);
            }
        }
    }
    None
}

/// Count `(files, folders)` in the tree
pub fn count_nodes(nodes: &[FileNode]) -> (usize, usize) {
    let mut files = 0;
    let mut folders = 0;
    let mut stack: Vec<&FileNode> = nodes.iter().collect();
    while let Some(node) = stack.pop() {
        match node.kind {
            NodeKind::File => files += 1,
            NodeKind::Folder => folders += 1,
        }
        stack.extend(node.children());
    }
    (files, folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn names(nodes: &[FileNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_builds_intermediate_folders_once() {
        let tree = build([
            ("_posts/2024-01-01-hello.md", EntryKind::Blob),
            ("_posts/2024-01-02-world.md", EntryKind::Blob),
            ("_layouts/default.html", EntryKind::Blob),
        ]);

        assert_eq!(names(&tree), vec!["_posts", "_layouts"]);
        let posts = &tree[0];
        assert!(posts.is_folder());
        assert_eq!(posts.path, "_posts");
        assert_eq!(
            names(posts.children()),
            vec!["2024-01-01-hello.md", "2024-01-02-world.md"]
        );
        assert_eq!(posts.children()[0].path, "_posts/2024-01-01-hello.md");
        assert!(posts.children()[0].is_file());
        assert!(posts.children()[0].children.is_none());
    }

    #[test]
    fn test_preserves_insertion_order_not_sorted() {
        let tree = build([
            ("zeta.md", EntryKind::Blob),
            ("alpha.md", EntryKind::Blob),
            ("mid", EntryKind::Tree),
        ]);
        assert_eq!(names(&tree), vec!["zeta.md", "alpha.md", "mid"]);
    }

    #[test]
    fn test_tree_entries_become_folders() {
        let tree = build([
            ("docs", EntryKind::Tree),
            ("docs/guide", EntryKind::Tree),
            ("docs/guide/intro.md", EntryKind::Blob),
        ]);
        assert_eq!(tree.len(), 1);
        let guide = &tree[0].children()[0];
        assert!(guide.is_folder());
        assert_eq!(guide.path, "docs/guide");
        assert_eq!(guide.children().len(), 1);
    }

    #[test]
    fn test_folder_listed_after_its_file_is_not_duplicated() {
        let tree = build([
            ("assets/css/site.css", EntryKind::Blob),
            ("assets", EntryKind::Tree),
            ("assets/css", EntryKind::Tree),
        ]);
        assert_eq!(count_nodes(&tree), (1, 2));
    }

    #[test]
    fn test_last_kind_wins_for_duplicate_path() {
        let tree = build([("notes", EntryKind::Tree), ("notes", EntryKind::Blob)]);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].is_file());

        let tree = build([("notes", EntryKind::Blob), ("notes", EntryKind::Tree)]);
        assert!(tree[0].is_folder());
        assert_eq!(tree[0].children(), &[] as &[FileNode]);
    }

    #[test]
    fn test_folder_turned_file_drops_children() {
        let tree = build([
            ("a/b.md", EntryKind::Blob),
            ("a", EntryKind::Blob),
            ("a/c.md", EntryKind::Blob),
        ]);
        // `a` flips to a file, then back to a folder holding only `c.md`
        assert_eq!(tree.len(), 1);
        assert!(tree[0].is_folder());
        assert_eq!(names(tree[0].children()), vec!["c.md"]);
    }

    #[test]
    fn test_ignores_empty_segments() {
        let tree = build([("/a//b.md/", EntryKind::Blob), ("", EntryKind::Blob)]);
        assert_eq!(count_nodes(&tree), (1, 1));
        assert_eq!(tree[0].children()[0].path, "a/b.md");
    }

    #[test]
    fn test_collect_files_adds_keep_file_for_empty_folder() {
        let tree = build([
            ("docs", EntryKind::Tree),
            ("index.html", EntryKind::Blob),
        ]);
        let files = collect_files(&tree);
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["docs/.gitkeep", "index.html"]);
        assert_eq!(files[0].name, ".gitkeep");
        assert_eq!(files[0].content.as_deref(), Some(""));
        assert_eq!(files[1].content, None);
    }

    #[test]
    fn test_collect_files_depth_first_order() {
        let tree = build([
            ("a/x.md", EntryKind::Blob),
            ("b.md", EntryKind::Blob),
            ("a/y/z.md", EntryKind::Blob),
        ]);
        let paths: Vec<String> = collect_files(&tree).into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec!["a/x.md", "a/y/z.md", "b.md"]);
    }

    #[test]
    fn test_all_paths_and_find() {
        let tree = build([("a/b/c.md", EntryKind::Blob)]);
        let paths = all_paths(&tree);
        assert_eq!(paths.len(), 3);
        assert!(paths.contains("a") && paths.contains("a/b") && paths.contains("a/b/c.md"));

        assert_eq!(find(&tree, "a/b/c.md").map(|n| n.kind), Some(NodeKind::File));
        assert_eq!(find(&tree, "a/b").map(|n| n.kind), Some(NodeKind::Folder));
        assert!(find(&tree, "a/c").is_none());
    }

    #[test]
    fn test_insert_path_appends_without_reordering() {
        let mut tree = build([("b.md", EntryKind::Blob), ("docs/a.md", EntryKind::Blob)]);
        assert!(insert_path(&mut tree, "docs/new/page.md", NodeKind::File));
        assert!(insert_path(&mut tree, "a.md", NodeKind::File));

        assert_eq!(names(&tree), vec!["b.md", "docs", "a.md"]);
        let docs = &tree[1];
        assert_eq!(names(docs.children()), vec!["a.md", "new"]);
        assert_eq!(docs.children()[1].children()[0].path, "docs/new/page.md");

        // Inserting an existing path is a no-op
        assert!(insert_path(&mut tree, "docs/a.md", NodeKind::File));
        assert_eq!(count_nodes(&tree), (4, 2));
    }

    #[test]
    fn test_insert_path_under_file_fails() {
        let mut tree = build([("a.md", EntryKind::Blob)]);
        assert!(!insert_path(&mut tree, "a.md/b.md", NodeKind::File));
    }

    #[test]
    fn test_remove_path() {
        let mut tree = build([
            ("docs/a.md", EntryKind::Blob),
            ("docs/b.md", EntryKind::Blob),
            ("docsite/c.md", EntryKind::Blob),
        ]);
        let removed = remove_path(&mut tree, "docs/a.md").unwrap();
        assert_eq!(removed.path, "docs/a.md");
        assert_eq!(names(tree[0].children()), vec!["b.md"]);

        assert!(remove_path(&mut tree, "docs/missing.md").is_none());
        assert!(remove_path(&mut tree, "docsite").is_some());
        assert_eq!(names(&tree), vec!["docs"]);
    }

    #[test]
    fn test_serde_shape() {
        let node = FileNode::folder("docs").with_child(FileNode::file("docs/a.md"));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "folder");
        assert_eq!(json["children"][0]["type"], "file");
        assert!(json["children"][0].get("children").is_none());
        assert!(json.get("content").is_none());
    }

    fn path_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-d]{1,2}", 1..4).prop_map(|segments| segments.join("/"))
    }

    proptest! {
        #[test]
        fn prop_files_and_prefix_folders(raw in prop::collection::vec(path_strategy(), 1..24)) {
            // Keep unique paths that are not a prefix directory of another
            let unique: BTreeSet<String> = raw.into_iter().collect();
            let files: Vec<String> = unique
                .iter()
                .filter(|p| !unique.iter().any(|q| q.starts_with(&format!("{}/", p))))
                .cloned()
                .collect();

            let tree = build(files.iter().map(|p| (p.as_str(), EntryKind::Blob)));

            let mut prefixes = BTreeSet::new();
            for path in &files {
                let segments: Vec<&str> = path.split('/').collect();
                for i in 1..segments.len() {
                    prefixes.insert(segments[..i].join("/"));
                }
            }

            let (file_count, folder_count) = count_nodes(&tree);
            prop_assert_eq!(file_count, files.len());
            prop_assert_eq!(folder_count, prefixes.len());
            prop_assert_eq!(all_paths(&tree).len(), files.len() + prefixes.len());
        }
    }
}
