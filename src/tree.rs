//! Folder tree for the report: files are grouped by folder, folders are
//! linked to their nearest existing ancestor, and coverage is aggregated
//! bottom-up.
//!
//! Folders live in a flat arena and refer to each other by index. Each
//! folder is created by the first file inserted into it, so only
//! directories that contain profiled files get a node. A folder whose real
//! parent directory holds no profiled file hangs off the closest ancestor
//! that does.

use std::collections::HashMap;
use std::path::PathBuf;

use log::debug;

use crate::locate::FolderLocation;
use crate::model::{mean, AggregateCoverage, FileReport};

/// Index of a folder inside its [`ReportTree`].
pub type FolderId = usize;

/// A folder in the report tree.
#[derive(Debug, Clone)]
pub struct FolderNode {
    /// Last segment of `relative_path`, empty for the top-level folder.
    pub name: String,
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub files: Vec<FileReport>,
    pub parent: Option<FolderId>,
    pub subfolders: Vec<FolderId>,
}

impl FolderNode {
    fn new(location: FolderLocation) -> Self {
        let name = location
            .relative
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            name,
            relative_path: location.relative,
            absolute_path: location.absolute,
            files: Vec::new(),
            parent: None,
            subfolders: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Accumulates files into folders during the single insertion pass.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    folders: Vec<FolderNode>,
    by_path: HashMap<String, FolderId>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `file` to the folder at `location`, creating the folder on first
    /// use.
    pub fn insert_file(&mut self, location: FolderLocation, file: FileReport) {
        let id = match self.by_path.get(&location.relative) {
            Some(&id) => id,
            None => {
                let id = self.folders.len();
                debug!("new folder '{}'", location.relative);
                self.by_path.insert(location.relative.clone(), id);
                self.folders.push(FolderNode::new(location));
                id
            }
        };
        self.folders[id].files.push(file);
    }

    /// Link every folder to its nearest ancestor folder and freeze the tree.
    pub fn finish(self) -> ReportTree {
        let parents: Vec<Option<FolderId>> = (0..self.folders.len())
            .map(|id| self.nearest_ancestor(id))
            .collect();

        let mut folders = self.folders;
        for (id, parent) in parents.iter().enumerate() {
            folders[id].parent = *parent;
            if let Some(parent) = *parent {
                folders[parent].subfolders.push(id);
            }
        }

        let keys: Vec<String> = folders.iter().map(|f| f.relative_path.clone()).collect();
        for folder in &mut folders {
            folder.subfolders.sort_by(|a, b| keys[*a].cmp(&keys[*b]));
        }
        let mut roots: Vec<FolderId> = parents
            .iter()
            .enumerate()
            .filter(|(_, parent)| parent.is_none())
            .map(|(id, _)| id)
            .collect();
        roots.sort_by(|a, b| keys[*a].cmp(&keys[*b]));

        ReportTree { folders, roots }
    }

    fn nearest_ancestor(&self, id: FolderId) -> Option<FolderId> {
        let path = &self.folders[id].absolute_path;
        self.folders
            .iter()
            .enumerate()
            .filter(|(other, f)| {
                *other != id && f.absolute_path != *path && path.starts_with(&f.absolute_path)
            })
            .max_by_key(|(_, f)| f.absolute_path.components().count())
            .map(|(other, _)| other)
    }
}

/// The finished, read-only report tree.
#[derive(Debug, Clone)]
pub struct ReportTree {
    folders: Vec<FolderNode>,
    roots: Vec<FolderId>,
}

impl ReportTree {
    pub fn folders(&self) -> &[FolderNode] {
        &self.folders
    }

    pub fn folder(&self, id: FolderId) -> &FolderNode {
        &self.folders[id]
    }

    /// Folders without a parent, ordered by relative path.
    pub fn roots(&self) -> &[FolderId] {
        &self.roots
    }

    pub fn find(&self, relative_path: &str) -> Option<FolderId> {
        self.folders
            .iter()
            .position(|f| f.relative_path == relative_path)
    }

    pub fn file_count(&self) -> usize {
        self.folders.iter().map(|f| f.files.len()).sum()
    }

    /// Compute the three coverage views of a folder.
    pub fn coverage(&self, id: FolderId) -> AggregateCoverage {
        let folder = &self.folders[id];
        let files = mean(folder.files.iter().map(|f| f.coverage));
        let folders = mean(
            folder
                .subfolders
                .iter()
                .filter_map(|&child| self.subtree_total(child)),
        );
        AggregateCoverage {
            files,
            folders,
            total: self.subtree_total(id),
        }
    }

    /// Mean over every file in the subtree, weighting each file equally.
    pub fn subtree_total(&self, id: FolderId) -> Option<f64> {
        let (sum, count) = self.subtree_sum(id);
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    /// Total coverage across all roots, weighting each file equally.
    pub fn overall(&self) -> Option<f64> {
        let (sum, count) = self
            .roots
            .iter()
            .map(|&id| self.subtree_sum(id))
            .fold((0.0, 0), |(s, c), (s2, c2)| (s + s2, c + c2));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    fn subtree_sum(&self, id: FolderId) -> (f64, usize) {
        let folder = &self.folders[id];
        let own: f64 = folder.files.iter().map(|f| f.coverage).sum();
        folder
            .subfolders
            .iter()
            .map(|&child| self.subtree_sum(child))
            .fold((own, folder.files.len()), |(s, c), (s2, c2)| (s + s2, c + c2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, coverage: f64) -> FileReport {
        FileReport {
            name: name.to_string(),
            path: PathBuf::from(name),
            body: String::new(),
            coverage,
            covered: 0,
            total: 0,
        }
    }

    fn loc(relative: &str) -> FolderLocation {
        let absolute = if relative.is_empty() {
            PathBuf::from("/p")
        } else {
            PathBuf::from(format!("/p/{relative}"))
        };
        FolderLocation {
            relative: relative.to_string(),
            absolute,
        }
    }

    fn subfolder_paths(tree: &ReportTree, rel: &str) -> Vec<String> {
        let id = tree.find(rel).unwrap();
        tree.folder(id)
            .subfolders
            .iter()
            .map(|&c| tree.folder(c).relative_path.clone())
            .collect()
    }

    #[test]
    fn test_flat_folder_coverage() {
        let mut builder = TreeBuilder::new();
        builder.insert_file(loc(""), file("a.go", 100.0));
        builder.insert_file(loc(""), file("b.go", 0.0));
        let tree = builder.finish();

        let cov = tree.coverage(tree.find("").unwrap());
        assert_eq!(cov.files, Some(50.0));
        assert_eq!(cov.total, Some(50.0));
        assert_eq!(cov.folders, None);
    }

    #[test]
    fn test_nested_coverage_is_weighted_by_file() {
        let mut builder = TreeBuilder::new();
        builder.insert_file(loc("a"), file("a/x.go", 50.0));
        builder.insert_file(loc("a"), file("a/y.go", 70.0));
        for name in ["a/b/1.go", "a/b/2.go", "a/b/3.go"] {
            builder.insert_file(loc("a/b"), file(name, 40.0));
        }
        let tree = builder.finish();

        let cov = tree.coverage(tree.find("a").unwrap());
        assert_eq!(cov.files, Some(60.0));
        assert_eq!(cov.folders, Some(40.0));
        assert_eq!(cov.total, Some(48.0));
    }

    #[test]
    fn test_folder_without_own_files() {
        let mut builder = TreeBuilder::new();
        builder.insert_file(loc("a/b"), file("a/b/x.go", 20.0));
        let mut tree = builder.finish();
        // a node with no files of its own must not divide by zero
        tree.folders[0].files.clear();
        let cov = tree.coverage(0);
        assert_eq!(cov.files, None);
        assert_eq!(cov.total, None);
        assert_eq!(cov.folders, None);
    }

    #[test]
    fn test_subfolder_containment() {
        let mut builder = TreeBuilder::new();
        for rel in ["a", "a/b", "a/b/c", "a/x", "a/bc"] {
            builder.insert_file(loc(rel), file(&format!("{rel}/f.go"), 10.0));
        }
        let tree = builder.finish();

        let subs = subfolder_paths(&tree, "a/b");
        assert_eq!(subs, vec!["a/b/c".to_string()]);
        assert_eq!(subfolder_paths(&tree, "a"), vec!["a/b", "a/bc", "a/x"]);
        assert_eq!(tree.roots().len(), 1);
    }

    #[test]
    fn test_gap_attaches_to_nearest_ancestor() {
        let mut builder = TreeBuilder::new();
        builder.insert_file(loc(""), file("main.go", 100.0));
        builder.insert_file(loc("x/y/z"), file("x/y/z/deep.go", 0.0));
        let tree = builder.finish();

        assert_eq!(subfolder_paths(&tree, ""), vec!["x/y/z".to_string()]);
        let root = tree.coverage(tree.find("").unwrap());
        assert_eq!(root.total, Some(50.0));
        assert_eq!(root.folders, Some(0.0));
    }

    #[test]
    fn test_intermediate_folder_is_not_double_counted() {
        let mut builder = TreeBuilder::new();
        builder.insert_file(loc("a"), file("a/f.go", 100.0));
        builder.insert_file(loc("a/b"), file("a/b/f.go", 50.0));
        builder.insert_file(loc("a/b/c"), file("a/b/c/f.go", 0.0));
        let tree = builder.finish();

        assert_eq!(subfolder_paths(&tree, "a"), vec!["a/b".to_string()]);
        let cov = tree.coverage(tree.find("a").unwrap());
        assert_eq!(cov.folders, Some(25.0));
        assert_eq!(cov.total, Some(50.0));
    }

    #[test]
    fn test_multiple_roots_without_top_level_files() {
        let mut builder = TreeBuilder::new();
        builder.insert_file(loc("svc"), file("svc/a.go", 90.0));
        builder.insert_file(loc("lib"), file("lib/b.go", 10.0));
        let tree = builder.finish();

        let roots: Vec<_> = tree
            .roots()
            .iter()
            .map(|&r| tree.folder(r).relative_path.as_str())
            .collect();
        assert_eq!(roots, vec!["lib", "svc"]);
        assert_eq!(tree.overall(), Some(50.0));
    }

    #[test]
    fn test_external_folder_stays_separate() {
        let wd = std::path::Path::new("/p");
        let mut builder = TreeBuilder::new();
        builder.insert_file(
            FolderLocation::of_file(std::path::Path::new("/p/opt/lib/a.go"), wd),
            file("m/opt/lib/a.go", 100.0),
        );
        builder.insert_file(
            FolderLocation::of_file(std::path::Path::new("/opt/lib/b.go"), wd),
            file("ext/lib/b.go", 0.0),
        );
        let tree = builder.finish();

        assert_eq!(tree.folders().len(), 2);
        let inside = tree.folder(tree.find("opt/lib").unwrap());
        assert_eq!(inside.absolute_path, PathBuf::from("/p/opt/lib"));
        assert_eq!(inside.files.len(), 1);
        let outside = tree.folder(tree.find("_ext/opt/lib").unwrap());
        assert_eq!(outside.absolute_path, PathBuf::from("/opt/lib"));
        assert_eq!(tree.roots().len(), 2);
    }

    #[test]
    fn test_insert_appends_to_existing_folder() {
        let mut builder = TreeBuilder::new();
        builder.insert_file(loc("pkg"), file("pkg/a.go", 1.0));
        builder.insert_file(loc("pkg"), file("pkg/b.go", 2.0));
        let tree = builder.finish();

        assert_eq!(tree.folders().len(), 1);
        assert_eq!(tree.folder(0).name, "pkg");
        assert_eq!(tree.folder(0).files.len(), 2);
        assert_eq!(tree.file_count(), 2);
    }
}
