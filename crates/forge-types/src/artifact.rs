//! Artifact metadata and snapshots

use crate::ActionSnapshot;
use serde::{Deserialize, Serialize};

/// Attributes of an opened artifact element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub id: String,
    pub title: String,
}

/// Read-only view of an artifact and its actions in execution-queue order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSnapshot {
    pub id: String,
    pub title: String,
    pub closed: bool,
    pub actions: Vec<ActionSnapshot>,
}
