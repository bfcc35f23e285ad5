//! Virtual file tree entries

use crate::FilePath;
use serde::{Deserialize, Serialize};

/// File payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub content: String,
    #[serde(default)]
    pub is_binary: bool,
}

impl File {
    pub fn new(content: impl Into<String>, is_binary: bool) -> Self {
        Self {
            content: content.into(),
            is_binary,
        }
    }
}

/// Entry of the virtual file tree. A path holds exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileEntry {
    File(File),
    Folder,
}

impl FileEntry {
    pub fn is_file(&self) -> bool {
        matches!(self, FileEntry::File(_))
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, FileEntry::Folder)
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            FileEntry::File(file) => Some(file),
            FileEntry::Folder => None,
        }
    }
}

/// A file edited since the last checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileModification {
    /// Content as of the last checkpoint
    pub original: String,
    /// Content now
    pub current: String,
}

/// Point-in-time view of one tree entry, for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub path: FilePath,
    #[serde(flatten)]
    pub entry: FileEntry,
}
