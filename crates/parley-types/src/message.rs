//! Message types for task conversations.

use serde::{Deserialize, Serialize};

/// Free-form key/value bag attached to tasks, messages, parts and artifacts.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// One turn of conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Message {
    /// Create a user message with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
            metadata: None,
        }
    }

    /// Create an agent message with a single text part.
    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            parts: vec![Part::text(text)],
            metadata: None,
        }
    }

    /// Concatenate the text parts of this message, one per line.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// The `type` discriminator is optional on input (many producers omit it) but
// always written on output. Each tag only accepts its own value, so the
// untagged `Part` falls through to the next variant on mismatch.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextTag {
    #[default]
    #[serde(rename = "text")]
    Text,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileTag {
    #[default]
    #[serde(rename = "file")]
    File,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataTag {
    #[default]
    #[serde(rename = "data")]
    Data,
}

/// A content part of a message or artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        #[serde(rename = "type", default)]
        kind: TextTag,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
    },
    File {
        #[serde(rename = "type", default)]
        kind: FileTag,
        file: FileContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
    },
    Data {
        #[serde(rename = "type", default)]
        kind: DataTag,
        data: Metadata,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
    },
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            kind: TextTag::Text,
            text: text.into(),
            metadata: None,
        }
    }

    /// Create a structured data part.
    pub fn data(data: Metadata) -> Self {
        Self::Data {
            kind: DataTag::Data,
            data,
            metadata: None,
        }
    }

    /// Create a file part.
    pub fn file(file: FileContent) -> Self {
        Self::File {
            kind: FileTag::File,
            file,
            metadata: None,
        }
    }

    /// The text of a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// File payload, carried inline as base64 or by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_part_without_type_tag() {
        let part: Part = serde_json::from_value(json!({"text": "hello"})).unwrap();
        assert_eq!(part.as_text(), Some("hello"));

        // The tag is always written back out
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "hello"}));
    }

    #[test]
    fn test_part_kinds_are_distinguished() {
        let file: Part = serde_json::from_value(json!({
            "type": "file",
            "file": {"name": "map.png", "mimeType": "image/png", "uri": "file:///map.png"}
        }))
        .unwrap();
        assert!(matches!(file, Part::File { .. }));

        let data: Part =
            serde_json::from_value(json!({"type": "data", "data": {"gold": 12}})).unwrap();
        assert!(matches!(data, Part::Data { .. }));
    }

    #[test]
    fn test_mismatched_tag_is_rejected() {
        let result = serde_json::from_value::<Part>(json!({"type": "file", "text": "oops"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_message_text_joins_parts() {
        let message = Message {
            role: Role::User,
            parts: vec![
                Part::text("first"),
                Part::data(Metadata::new()),
                Part::text("second"),
            ],
            metadata: None,
        };
        assert_eq!(message.text(), "first\nsecond");
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_value(Role::Agent).unwrap(), json!("agent"));
        let msg: Message =
            serde_json::from_value(json!({"role": "user", "parts": [{"text": "hi"}]})).unwrap();
        assert_eq!(msg.role, Role::User);
        assert!(msg.metadata.is_none());
    }
}
