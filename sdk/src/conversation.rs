//! Conversation turn types
//!
//! A conversation history is an ordered list of [`ConversationTurn`]s owned by
//! the caller. The engine reads it on every call and never keeps a copy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Participant in a tutoring conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The student asking questions
    Student,

    /// The AI tutor
    Tutor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Tutor => write!(f, "tutor"),
        }
    }
}

/// Base64-encoded binary payload with its MIME type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,

    /// Standard base64 encoding of the raw bytes
    pub data: String,
}

/// One part of a turn's content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ContentPart {
    /// Plain text
    Text(String),

    /// Inline attachment such as a whiteboard image
    InlineData(InlineData),
}

impl ContentPart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create an inline-data part from already encoded data
    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineData(InlineData {
            mime_type: mime_type.into(),
            data: data.into(),
        })
    }

    /// Returns the text if this is a non-blank text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }
}

/// A single message in a tutoring conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,

    /// Ordered content parts
    pub content: Vec<ContentPart>,
}

impl ConversationTurn {
    /// Create a text-only student turn
    pub fn student(text: impl Into<String>) -> Self {
        Self {
            role: Role::Student,
            content: vec![ContentPart::text(text)],
        }
    }

    /// Create a text-only tutor turn
    pub fn tutor(text: impl Into<String>) -> Self {
        Self {
            role: Role::Tutor,
            content: vec![ContentPart::text(text)],
        }
    }

    /// Whether at least one part carries non-blank text
    pub fn has_text(&self) -> bool {
        self.content.iter().any(|part| part.as_text().is_some())
    }

    /// All non-blank text parts joined by newlines
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_text_skips_blank_and_inline_parts() {
        let turn = ConversationTurn {
            role: Role::Student,
            content: vec![
                ContentPart::text("What is 2 + 2?"),
                ContentPart::inline("image/png", "aGVsbG8="),
                ContentPart::text("   "),
                ContentPart::text("Show steps."),
            ],
        };

        assert!(turn.has_text());
        assert_eq!(turn.text(), "What is 2 + 2?\nShow steps.");
    }

    #[test]
    fn test_turn_without_text() {
        let turn = ConversationTurn {
            role: Role::Tutor,
            content: vec![ContentPart::inline("image/png", "aGVsbG8=")],
        };
        assert!(!turn.has_text());
        assert_eq!(turn.text(), "");
    }

    #[test]
    fn test_turn_serialization_shape() {
        let turn = ConversationTurn {
            role: Role::Student,
            content: vec![
                ContentPart::text("hi"),
                ContentPart::inline("image/jpeg", "AAAA"),
            ],
        };
        let json = serde_json::to_value(&turn).unwrap();

        assert_eq!(json["role"], "student");
        assert_eq!(json["content"][0]["text"], "hi");
        assert_eq!(json["content"][1]["inlineData"]["mimeType"], "image/jpeg");
    }
}
