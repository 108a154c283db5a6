//! Events written to streaming responses.

use serde::{Deserialize, Serialize};

use crate::message::Metadata;
use crate::task::{Artifact, TaskStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusUpdateEvent {
    pub id: String,
    pub status: TaskStatus,
    #[serde(rename = "final", default)]
    pub final_: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskArtifactUpdateEvent {
    pub id: String,
    pub artifact: Artifact,
    #[serde(rename = "final", default)]
    pub final_: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Either kind of streaming event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskEvent {
    Status(TaskStatusUpdateEvent),
    Artifact(TaskArtifactUpdateEvent),
}

impl TaskEvent {
    pub fn status(id: impl Into<String>, status: TaskStatus, final_: bool) -> Self {
        Self::Status(TaskStatusUpdateEvent {
            id: id.into(),
            status,
            final_,
            metadata: None,
        })
    }

    pub fn artifact(id: impl Into<String>, artifact: Artifact) -> Self {
        Self::Artifact(TaskArtifactUpdateEvent {
            id: id.into(),
            artifact,
            final_: false,
            metadata: None,
        })
    }

    pub fn task_id(&self) -> &str {
        match self {
            Self::Status(e) => &e.id,
            Self::Artifact(e) => &e.id,
        }
    }

    /// The stream closes after a final event.
    pub fn is_final(&self) -> bool {
        match self {
            Self::Status(e) => e.final_,
            Self::Artifact(e) => e.final_,
        }
    }
}
