//! Updates yielded by task handlers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::message::Message;
use crate::task::{Artifact, TaskState};

/// A status change requested by a handler.
///
/// `message` is tri-state: `None` keeps the current status message,
/// `Some(None)` clears it and `Some(Some(m))` replaces it. On the wire these
/// are an absent field, `null` and a message object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub state: TaskState,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub message: Option<Option<Message>>,
}

impl StatusUpdate {
    /// Change state, keeping the current status message.
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
        }
    }

    /// Change state and replace the status message.
    pub fn with_message(state: TaskState, message: Message) -> Self {
        Self {
            state,
            message: Some(Some(message)),
        }
    }

    /// Change state and clear the status message.
    pub fn clearing_message(state: TaskState) -> Self {
        Self {
            state,
            message: Some(None),
        }
    }
}

// A present field (even `null`) must become `Some`, so that `null` can mean "clear".
fn deserialize_some<'de, D>(deserializer: D) -> Result<Option<Option<Message>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Message>::deserialize(deserializer).map(Some)
}

/// One value yielded by a task handler.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskUpdate {
    Status(StatusUpdate),
    Artifact(Artifact),
}

impl TaskUpdate {
    pub fn status(state: TaskState) -> Self {
        Self::Status(StatusUpdate::new(state))
    }

    pub fn status_with_message(state: TaskState, message: Message) -> Self {
        Self::Status(StatusUpdate::with_message(state, message))
    }

    pub fn artifact(artifact: Artifact) -> Self {
        Self::Artifact(artifact)
    }
}

impl From<StatusUpdate> for TaskUpdate {
    fn from(update: StatusUpdate) -> Self {
        Self::Status(update)
    }
}

impl From<Artifact> for TaskUpdate {
    fn from(artifact: Artifact) -> Self {
        Self::Artifact(artifact)
    }
}

impl Serialize for TaskUpdate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Status(update) => update.serialize(serializer),
            Self::Artifact(artifact) => artifact.serialize(serializer),
        }
    }
}

// Discrimination is structural: `parts` wins over `state`.
impl<'de> Deserialize<'de> for TaskUpdate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let value = Value::deserialize(deserializer)?;
        let Some(object) = value.as_object() else {
            return Err(D::Error::custom("task update must be a JSON object"));
        };

        if object.contains_key("parts") {
            serde_json::from_value(value)
                .map(TaskUpdate::Artifact)
                .map_err(D::Error::custom)
        } else if object.contains_key("state") {
            serde_json::from_value(value)
                .map(TaskUpdate::Status)
                .map_err(D::Error::custom)
        } else {
            Err(D::Error::custom(
                "task update must carry either `parts` or `state`",
            ))
        }
    }
}
