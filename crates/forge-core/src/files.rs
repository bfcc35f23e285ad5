//! Virtual file store
//!
//! In-memory tree of files and folders shared by every artifact's runner,
//! plus an overlay recording the content each file had at the last
//! checkpoint. The overlay is what turns into the modification diff sent
//! back to the model on the next turn.

use crate::error::FileStoreError;
use forge_types::{File, FileEntry, FileModification, FilePath, FileSnapshot};
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct FileTree {
    entries: BTreeMap<FilePath, FileEntry>,
    /// Content as of the last checkpoint, keyed by path
    modified: HashMap<FilePath, String>,
    /// Number of paths holding a file
    size: usize,
}

impl FileTree {
    /// Drop `path` and everything below it. Returns (entries, files) removed.
    fn remove_subtree(&mut self, path: &FilePath) -> (usize, usize) {
        let doomed: Vec<FilePath> = self
            .entries
            .range(path.clone()..)
            .take_while(|(candidate, _)| candidate.as_str().starts_with(path.as_str()))
            .filter(|(candidate, _)| candidate.starts_with(path))
            .map(|(candidate, _)| candidate.clone())
            .collect();

        let mut files = 0;
        for candidate in &doomed {
            if let Some(FileEntry::File(_)) = self.entries.remove(candidate) {
                files += 1;
                self.modified.remove(candidate);
            }
        }
        self.size -= files;
        (doomed.len(), files)
    }
}

/// Shared in-memory file tree.
///
/// All methods take `&self`; the store is meant to be wrapped in an `Arc`
/// and handed to every runner.
#[derive(Debug, Default)]
pub struct FileStore {
    tree: RwLock<FileTree>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, FileTree> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FileTree> {
        self.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a file.
    ///
    /// A folder previously at `path` is replaced together with its contents.
    pub fn add_file(&self, path: impl Into<FilePath>, content: impl Into<String>, is_binary: bool) {
        let path = path.into();
        let mut tree = self.write();

        if tree.entries.get(&path).is_some_and(FileEntry::is_folder) {
            tree.remove_subtree(&path);
        }

        let previous = tree
            .entries
            .insert(path.clone(), FileEntry::File(File::new(content, is_binary)));
        if !matches!(previous, Some(FileEntry::File(_))) {
            tree.size += 1;
        }
        debug!("Added file {}", path);
    }

    /// Insert or replace a folder. A file previously at `path` is dropped.
    pub fn add_folder(&self, path: impl Into<FilePath>) {
        let path = path.into();
        let mut tree = self.write();

        if let Some(FileEntry::File(_)) = tree.entries.insert(path.clone(), FileEntry::Folder) {
            tree.size -= 1;
            tree.modified.remove(&path);
        }
        debug!("Added folder {}", path);
    }

    /// The file at `path`, or `None` for a folder or a missing path
    pub fn get_file(&self, path: impl Into<FilePath>) -> Option<File> {
        self.read()
            .entries
            .get(&path.into())
            .and_then(FileEntry::as_file)
            .cloned()
    }

    pub fn entry(&self, path: impl Into<FilePath>) -> Option<FileEntry> {
        self.read().entries.get(&path.into()).cloned()
    }

    pub fn contains(&self, path: impl Into<FilePath>) -> bool {
        self.read().entries.contains_key(&path.into())
    }

    /// Overwrite a file the user edited.
    ///
    /// The first save after a checkpoint captures the previous content in
    /// the modification overlay.
    pub fn save_file(
        &self,
        path: impl Into<FilePath>,
        content: impl Into<String>,
    ) -> Result<(), FileStoreError> {
        let path = path.into();
        let mut tree = self.write();
        let tree = &mut *tree;

        let Some(FileEntry::File(file)) = tree.entries.get_mut(&path) else {
            return Err(FileStoreError::NotAFile(path));
        };

        let content = content.into();
        tree.modified
            .entry(path.clone())
            .or_insert_with(|| std::mem::replace(&mut file.content, content.clone()));
        file.content = content;

        info!("Saved {}", path);
        Ok(())
    }

    /// Overwrite an existing file without touching the overlay.
    ///
    /// Returns false and changes nothing when `path` does not hold a file.
    pub fn update_file(
        &self,
        path: impl Into<FilePath>,
        content: impl Into<String>,
        is_binary: bool,
    ) -> bool {
        let path = path.into();
        let mut tree = self.write();
        match tree.entries.get_mut(&path) {
            Some(FileEntry::File(file)) => {
                *file = File::new(content, is_binary);
                debug!("Updated file {}", path);
                true
            }
            _ => false,
        }
    }

    /// Remove a file, or a folder and every path below it.
    ///
    /// Returns the number of entries removed. Overlay entries of removed
    /// files are dropped with them.
    pub fn remove(&self, path: impl Into<FilePath>) -> usize {
        let path = path.into();
        let mut tree = self.write();

        match tree.entries.get(&path) {
            Some(FileEntry::File(_)) => {
                tree.entries.remove(&path);
                tree.modified.remove(&path);
                tree.size -= 1;
                debug!("Removed file {}", path);
                1
            }
            Some(FileEntry::Folder) => {
                let (entries, files) = tree.remove_subtree(&path);
                debug!("Removed folder {} ({} entries, {} files)", path, entries, files);
                entries
            }
            None => 0,
        }
    }

    /// Files whose content differs from the last checkpoint
    pub fn get_file_modifications(&self) -> BTreeMap<FilePath, FileModification> {
        let tree = self.read();
        tree.modified
            .iter()
            .filter_map(|(path, original)| {
                let file = tree.entries.get(path)?.as_file()?;
                (file.content != *original).then(|| {
                    (
                        path.clone(),
                        FileModification {
                            original: original.clone(),
                            current: file.content.clone(),
                        },
                    )
                })
            })
            .collect()
    }

    /// Checkpoint: forget every recorded original
    pub fn reset_file_modifications(&self) {
        self.write().modified.clear();
    }

    pub fn files_count(&self) -> usize {
        self.read().size
    }

    /// Every entry in path order
    pub fn entries(&self) -> Vec<FileSnapshot> {
        self.read()
            .entries
            .iter()
            .map(|(path, entry)| FileSnapshot {
                path: path.clone(),
                entry: entry.clone(),
            })
            .collect()
    }

    /// Paths of files whose content is exactly `content`
    pub fn paths_with_content(&self, content: &str) -> Vec<FilePath> {
        self.read()
            .entries
            .iter()
            .filter(|(_, entry)| matches!(entry, FileEntry::File(file) if file.content == content))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Groups of two or more text files sharing identical content
    pub fn duplicate_groups(&self) -> Vec<Vec<FilePath>> {
        let tree = self.read();
        let mut by_content: BTreeMap<&str, Vec<FilePath>> = BTreeMap::new();
        for (path, entry) in &tree.entries {
            if let FileEntry::File(file) = entry {
                if !file.is_binary {
                    by_content
                        .entry(file.content.as_str())
                        .or_default()
                        .push(path.clone());
                }
            }
        }

        let mut groups: Vec<Vec<FilePath>> = by_content
            .into_values()
            .filter(|paths| paths.len() > 1)
            .collect();
        groups.sort();
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(paths: &[(&str, &str)]) -> FileStore {
        let store = FileStore::new();
        for (path, content) in paths {
            let path = FilePath::new(path);
            for ancestor in path.ancestors() {
                store.add_folder(ancestor);
            }
            store.add_file(path, *content, false);
        }
        store
    }

    #[test]
    fn test_add_file_counts_new_paths_only() {
        let store = FileStore::new();
        store.add_file("/a.txt", "1", false);
        store.add_file("a.txt", "2", false);
        store.add_file("b.txt", "3", false);

        assert_eq!(store.files_count(), 2);
        assert_eq!(store.get_file("/a.txt"), Some(File::new("2", false)));
    }

    #[test]
    fn test_get_file_is_none_for_folders() {
        let store = FileStore::new();
        store.add_folder("src");
        assert!(store.get_file("src").is_none());
        assert!(store.get_file("missing").is_none());
        assert_eq!(store.entry("src"), Some(FileEntry::Folder));
    }

    #[test]
    fn test_save_file_tracks_modifications() {
        let store = store_with(&[("/src/a.txt", "x")]);

        store.save_file("/src/a.txt", "y").unwrap();
        let mods = store.get_file_modifications();
        assert_eq!(mods.len(), 1);
        let (path, modification) = mods.iter().next().unwrap();
        assert_eq!(path.to_string(), "/src/a.txt");
        assert_eq!(
            modification,
            &FileModification {
                original: "x".to_string(),
                current: "y".to_string(),
            }
        );

        store.reset_file_modifications();
        assert!(store.get_file_modifications().is_empty());
    }

    #[test]
    fn test_overlay_keeps_checkpoint_content() {
        let store = store_with(&[("a.txt", "v0")]);
        store.save_file("a.txt", "v1").unwrap();
        store.save_file("a.txt", "v2").unwrap();

        let mods = store.get_file_modifications();
        assert_eq!(mods[&FilePath::new("a.txt")].original, "v0");
        assert_eq!(mods[&FilePath::new("a.txt")].current, "v2");

        // back to the checkpoint content is not a modification
        store.save_file("a.txt", "v0").unwrap();
        assert!(store.get_file_modifications().is_empty());
    }

    #[test]
    fn test_save_file_requires_existing_file() {
        let store = FileStore::new();
        store.add_folder("src");

        assert_eq!(
            store.save_file("src", "x"),
            Err(FileStoreError::NotAFile(FilePath::new("src")))
        );
        assert_eq!(
            store.save_file("nope.txt", "x"),
            Err(FileStoreError::NotAFile(FilePath::new("nope.txt")))
        );
    }

    #[test]
    fn test_update_file_bypasses_overlay() {
        let store = store_with(&[("a.txt", "x")]);
        assert!(store.update_file("a.txt", "y", false));
        assert!(!store.update_file("missing.txt", "y", false));

        assert!(store.get_file_modifications().is_empty());
        assert_eq!(store.get_file("a.txt").unwrap().content, "y");
        assert!(!store.contains("missing.txt"));
    }

    #[test]
    fn test_remove_folder_cascades() {
        let store = store_with(&[
            ("/src/a.txt", "a"),
            ("/src/sub/b.txt", "b"),
            ("/src2/d.txt", "d"),
            ("/other/c.txt", "c"),
        ]);
        assert_eq!(store.files_count(), 4);

        // src, src/a.txt, src/sub, src/sub/b.txt
        assert_eq!(store.remove("/src"), 4);

        assert!(!store.contains("/src/a.txt"));
        assert!(!store.contains("/src/sub/b.txt"));
        assert!(store.contains("/other/c.txt"));
        assert!(store.contains("/src2/d.txt"));
        assert_eq!(store.files_count(), 2);
    }

    #[test]
    fn test_remove_purges_overlay() {
        let store = store_with(&[("src/a.txt", "x")]);
        store.save_file("src/a.txt", "y").unwrap();
        store.remove("src");

        store.add_file("src/a.txt", "z", false);
        assert!(store.get_file_modifications().is_empty());
    }

    #[test]
    fn test_kind_changes_keep_counter_exact() {
        let store = store_with(&[("x/inner.txt", "i")]);
        assert_eq!(store.files_count(), 1);

        // file over folder drops the subtree
        store.add_file("x", "now a file", false);
        assert_eq!(store.files_count(), 1);
        assert!(!store.contains("x/inner.txt"));

        // folder over file
        store.add_folder("x");
        assert_eq!(store.files_count(), 0);
        assert_eq!(store.remove("missing"), 0);
    }

    #[test]
    fn test_duplicate_groups() {
        let store = store_with(&[("a.txt", "same"), ("b.txt", "same"), ("c.txt", "other")]);
        store.add_file("d.bin", "same", true);

        assert_eq!(
            store.duplicate_groups(),
            vec![vec![FilePath::new("a.txt"), FilePath::new("b.txt")]]
        );
        assert_eq!(
            store.paths_with_content("same"),
            vec![
                FilePath::new("a.txt"),
                FilePath::new("b.txt"),
                FilePath::new("d.bin")
            ]
        );
    }

    #[test]
    fn test_entries_in_path_order() {
        let store = store_with(&[("b/z.txt", "z"), ("a.txt", "a")]);
        let paths: Vec<String> = store
            .entries()
            .into_iter()
            .map(|snapshot| snapshot.path.to_string())
            .collect();
        assert_eq!(paths, vec!["/a.txt", "/b", "/b/z.txt"]);
    }
}
