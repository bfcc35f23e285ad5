//! Events emitted by the streaming tag parser

use crate::{ArtifactMeta, ParsedAction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A malformed element. The element's events are dropped; parsing continues.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseError {
    #[error("<{element}> is missing required attribute `{attribute}`")]
    MissingAttribute { element: String, attribute: String },

    #[error("<{element}> has unsupported action type `{value}`")]
    InvalidActionType { element: String, value: String },

    #[error("<{element}> open tag is not well-formed")]
    MalformedTag { element: String },
}

/// One step of parser output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ParseEvent {
    /// Narrative text outside any artifact
    Text { text: String },

    ArtifactOpen { artifact: ArtifactMeta },

    ArtifactClose { artifact_id: String },

    /// Kind and static attributes are known; content is empty
    ActionOpen {
        artifact_id: String,
        action_id: String,
        action: ParsedAction,
    },

    /// Cumulative payload received so far
    ActionUpdate {
        artifact_id: String,
        action_id: String,
        content: String,
    },

    /// Final, cleaned payload
    ActionClose {
        artifact_id: String,
        action_id: String,
        action: ParsedAction,
    },

    Error { error: ParseError },
}

impl ParseEvent {
    /// Artifact this event belongs to, if any
    pub fn artifact_id(&self) -> Option<&str> {
        match self {
            ParseEvent::ArtifactOpen { artifact } => Some(&artifact.id),
            ParseEvent::ArtifactClose { artifact_id }
            | ParseEvent::ActionOpen { artifact_id, .. }
            | ParseEvent::ActionUpdate { artifact_id, .. }
            | ParseEvent::ActionClose { artifact_id, .. } => Some(artifact_id),
            ParseEvent::Text { .. } | ParseEvent::Error { .. } => None,
        }
    }
}
