//! Error types for Forge

use forge_types::FilePath;
use thiserror::Error;

/// Main error type for Forge
#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Configuration file not found in {0}")]
    ConfigNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ForgeError>;

/// Virtual file store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileStoreError {
    /// The path does not hold a file. Saving such a path is a caller bug.
    #[error("expected a file at {0}")]
    NotAFile(FilePath),

    #[error("cannot create {path}: {blocker} is a file")]
    NotAFolder { path: FilePath, blocker: FilePath },
}

/// Shell executor failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("command aborted")]
    Aborted,

    #[error("command failed: {0}")]
    Failed(String),
}

/// Failure of a single action. Recorded on the action, never fatal to the queue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("file path required for file actions")]
    FilePathRequired,

    #[error("empty content after cleanup for {path}")]
    EmptyContent { path: String },

    #[error(transparent)]
    Store(#[from] FileStoreError),

    #[error(transparent)]
    Shell(#[from] ExecutorError),

    #[error("action aborted")]
    Aborted,

    #[error("action queue closed before the action settled")]
    QueueClosed,
}

/// Contract violations on the runner API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunnerError {
    #[error("action {action_id} not found in artifact {artifact_id}")]
    UnknownAction {
        artifact_id: String,
        action_id: String,
    },

    #[error("execution queue for artifact {0} is closed")]
    QueueClosed(String),
}

/// Contract violations on the workbench API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkbenchError {
    #[error("artifact not found: {0}")]
    UnknownArtifact(String),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Files(#[from] FileStoreError),
}
