//! Parsed actions and their runtime status

use serde::{Deserialize, Serialize};

/// Kind of an action element, taken from its `type` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    File,
    Shell,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::File => "file",
            ActionKind::Shell => "shell",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "file" => Some(ActionKind::File),
            "shell" => Some(ActionKind::Shell),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An action element recognized in the model output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParsedAction {
    File {
        #[serde(rename = "filePath")]
        file_path: String,
        content: String,
    },
    Shell {
        content: String,
    },
}

impl ParsedAction {
    pub fn file(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        ParsedAction::File {
            file_path: file_path.into(),
            content: content.into(),
        }
    }

    pub fn shell(content: impl Into<String>) -> Self {
        ParsedAction::Shell {
            content: content.into(),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            ParsedAction::File { .. } => ActionKind::File,
            ParsedAction::Shell { .. } => ActionKind::Shell,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ParsedAction::File { content, .. } | ParsedAction::Shell { content } => content,
        }
    }

    pub fn set_content(&mut self, value: impl Into<String>) {
        match self {
            ParsedAction::File { content, .. } | ParsedAction::Shell { content } => {
                *content = value.into()
            }
        }
    }

    pub fn file_path(&self) -> Option<&str> {
        match self {
            ParsedAction::File { file_path, .. } => Some(file_path),
            ParsedAction::Shell { .. } => None,
        }
    }
}

/// Execution status of an action.
///
/// Only `Failed` carries an error, so a completed action with an error
/// cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Running,
    Complete,
    Aborted,
    Failed { error: String },
}

impl ActionStatus {
    /// `Complete`, `Aborted` and `Failed` never change again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionStatus::Complete | ActionStatus::Aborted | ActionStatus::Failed { .. }
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Running => "running",
            ActionStatus::Complete => "complete",
            ActionStatus::Aborted => "aborted",
            ActionStatus::Failed { .. } => "failed",
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ActionStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionStatus::Failed { error } => write!(f, "failed: {}", error),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Read-only view of an action record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSnapshot {
    pub id: String,
    pub action: ParsedAction,
    #[serde(flatten)]
    pub status: ActionStatus,
    pub executed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serializes_with_type_tag() {
        let action = ParsedAction::file("src/main.rs", "fn main() {}\n");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["filePath"], "src/main.rs");

        let shell: ParsedAction =
            serde_json::from_str(r#"{"type":"shell","content":"npm install"}"#).unwrap();
        assert_eq!(shell.kind(), ActionKind::Shell);
        assert_eq!(shell.content(), "npm install");
        assert_eq!(shell.file_path(), None);
    }

    #[test]
    fn test_only_failed_carries_error() {
        assert_eq!(ActionStatus::Complete.error(), None);
        let failed = ActionStatus::Failed {
            error: "boom".to_string(),
        };
        assert_eq!(failed.error(), Some("boom"));
        assert!(failed.is_terminal());
        assert!(!ActionStatus::Running.is_terminal());
        assert_eq!(failed.to_string(), "failed: boom");
    }
}
