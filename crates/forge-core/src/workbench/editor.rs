//! Editor documents, selection and unsaved edits

use crate::error::FileStoreError;
use crate::files::FileStore;
use forge_types::{FileEntry, FilePath};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A file as open in the editor, possibly with unsaved edits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorDocument {
    pub path: FilePath,
    pub value: String,
    pub is_binary: bool,
}

#[derive(Debug, Default)]
pub struct EditorState {
    documents: BTreeMap<FilePath, EditorDocument>,
    selected: Option<FilePath>,
    unsaved: BTreeSet<FilePath>,
}

impl EditorState {
    /// Rebuild documents from the store, keeping unsaved edits.
    ///
    /// Selects the first file when nothing is selected.
    pub fn sync(&mut self, files: &FileStore) {
        let mut documents = BTreeMap::new();
        for snapshot in files.entries() {
            let FileEntry::File(file) = snapshot.entry else {
                continue;
            };
            let document = match self.documents.remove(&snapshot.path) {
                Some(edited) if self.unsaved.contains(&snapshot.path) => edited,
                _ => EditorDocument {
                    path: snapshot.path.clone(),
                    value: file.content,
                    is_binary: file.is_binary,
                },
            };
            documents.insert(snapshot.path, document);
        }

        self.unsaved.retain(|path| documents.contains_key(path));
        self.documents = documents;

        if self
            .selected
            .as_ref()
            .is_some_and(|path| !self.documents.contains_key(path))
        {
            self.selected = None;
        }
        if self.selected.is_none() {
            self.selected = self.documents.keys().next().cloned();
        }
    }

    pub fn select(&mut self, path: FilePath) -> bool {
        if self.documents.contains_key(&path) {
            self.selected = Some(path);
            true
        } else {
            false
        }
    }

    pub fn has_document(&self, path: &FilePath) -> bool {
        self.documents.contains_key(path)
    }

    pub fn selected(&self) -> Option<&EditorDocument> {
        self.selected.as_ref().and_then(|path| self.documents.get(path))
    }

    pub fn selected_path(&self) -> Option<&FilePath> {
        self.selected.as_ref()
    }

    pub fn document(&self, path: &FilePath) -> Option<&EditorDocument> {
        self.documents.get(path)
    }

    /// Edit the selected document. Unsaved state follows whether the
    /// value differs from the stored file.
    pub fn set_content(&mut self, files: &FileStore, value: impl Into<String>) -> bool {
        let Some(path) = self.selected.clone() else {
            return false;
        };
        let Some(document) = self.documents.get_mut(&path) else {
            return false;
        };

        document.value = value.into();
        let stored = files.get_file(&path).map(|file| file.content);
        if stored.as_deref() == Some(document.value.as_str()) {
            self.unsaved.remove(&path);
        } else {
            self.unsaved.insert(path);
        }
        true
    }

    /// Write a document back to the store
    pub fn save(&mut self, files: &FileStore, path: &FilePath) -> Result<(), FileStoreError> {
        let document = self
            .documents
            .get(path)
            .ok_or_else(|| FileStoreError::NotAFile(path.clone()))?;
        files.save_file(path, document.value.clone())?;
        self.unsaved.remove(path);
        Ok(())
    }

    /// Save every document with unsaved edits. Returns how many were saved.
    pub fn save_all(&mut self, files: &FileStore) -> Result<usize, FileStoreError> {
        let pending: Vec<FilePath> = self.unsaved.iter().cloned().collect();
        for path in &pending {
            self.save(files, path)?;
        }
        Ok(pending.len())
    }

    /// Discard edits to the selected document
    pub fn reset_selected(&mut self, files: &FileStore) -> bool {
        let Some(path) = self.selected.clone() else {
            return false;
        };
        let Some(file) = files.get_file(&path) else {
            return false;
        };
        if let Some(document) = self.documents.get_mut(&path) {
            document.value = file.content;
        }
        self.unsaved.remove(&path);
        true
    }

    pub fn unsaved(&self) -> Vec<FilePath> {
        self.unsaved.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FileStore {
        let files = FileStore::new();
        files.add_folder("src");
        files.add_file("src/b.ts", "b", false);
        files.add_file("src/a.ts", "a", false);
        files
    }

    #[test]
    fn test_sync_selects_first_file() {
        let files = store();
        let mut editor = EditorState::default();
        editor.sync(&files);

        assert_eq!(editor.selected_path(), Some(&FilePath::new("src/a.ts")));
        assert_eq!(editor.selected().unwrap().value, "a");
        assert!(editor.document(&FilePath::new("src")).is_none());
    }

    #[test]
    fn test_edits_survive_sync_until_saved() {
        let files = store();
        let mut editor = EditorState::default();
        editor.sync(&files);

        assert!(editor.set_content(&files, "a2"));
        assert_eq!(editor.unsaved(), vec![FilePath::new("src/a.ts")]);

        files.update_file("src/a.ts", "from model", false);
        editor.sync(&files);
        assert_eq!(editor.selected().unwrap().value, "a2");

        editor.save(&files, &FilePath::new("src/a.ts")).unwrap();
        assert!(editor.unsaved().is_empty());
        assert_eq!(files.get_file("src/a.ts").unwrap().content, "a2");
        assert_eq!(
            files.get_file_modifications()[&FilePath::new("src/a.ts")].original,
            "from model"
        );
    }

    #[test]
    fn test_typing_back_the_stored_value_clears_unsaved() {
        let files = store();
        let mut editor = EditorState::default();
        editor.sync(&files);

        editor.set_content(&files, "changed");
        editor.set_content(&files, "a");
        assert!(editor.unsaved().is_empty());
    }

    #[test]
    fn test_reset_selected() {
        let files = store();
        let mut editor = EditorState::default();
        editor.sync(&files);
        editor.set_content(&files, "oops");

        assert!(editor.reset_selected(&files));
        assert_eq!(editor.selected().unwrap().value, "a");
        assert!(editor.unsaved().is_empty());
    }

    #[test]
    fn test_removed_file_drops_selection_and_edits() {
        let files = store();
        let mut editor = EditorState::default();
        editor.sync(&files);
        editor.set_content(&files, "edit");

        files.remove("src/a.ts");
        editor.sync(&files);

        assert!(editor.unsaved().is_empty());
        assert_eq!(editor.selected_path(), Some(&FilePath::new("src/b.ts")));
    }
}
