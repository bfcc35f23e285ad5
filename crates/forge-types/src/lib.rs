//! Forge Types - Pure type definitions shared across the workbench
//!
//! This crate contains only plain data types with no async runtime
//! dependencies: paths and entries of the virtual file tree, parsed
//! actions and their runtime status, and the events produced by the
//! streaming tag parser.

pub mod action;
pub mod artifact;
pub mod event;
pub mod file;
pub mod path;

pub use action::*;
pub use artifact::*;
pub use event::*;
pub use file::*;
pub use path::*;

use serde::{Deserialize, Serialize};

/// Non-fatal findings reported while executing actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A file was written with exactly the same content as another path
    DuplicateContent {
        path: FilePath,
        duplicate_of: FilePath,
    },
}

impl Diagnostic {
    /// True when both describe the same finding; duplicate pairs are unordered
    pub fn same_finding(&self, other: &Diagnostic) -> bool {
        match (self, other) {
            (
                Diagnostic::DuplicateContent { path, duplicate_of },
                Diagnostic::DuplicateContent {
                    path: other_path,
                    duplicate_of: other_duplicate_of,
                },
            ) => {
                (path == other_path && duplicate_of == other_duplicate_of)
                    || (path == other_duplicate_of && duplicate_of == other_path)
            }
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::DuplicateContent { path, duplicate_of } => write!(
                f,
                "file {} has identical content to {}",
                path, duplicate_of
            ),
        }
    }
}
