//! History Formatter
//!
//! Normalizes a caller-supplied conversation log into the two-role turn
//! sequence the inference service expects.

use crate::llm::{Content, ModelRole};
use sdk::{ContentPart, ConversationTurn, Role};

/// Convert caller history into service turns.
///
/// - Turns without renderable text are dropped.
/// - `tutor` maps to `model`, `student` maps to `user`.
/// - Leading `model` turns are dropped; the service expects the history to
///   open with a user turn.
/// - Consecutive turns with the same role are merged.
///
/// The input slice is only read.
pub fn format_history(turns: &[ConversationTurn]) -> Vec<Content> {
    let mut formatted: Vec<Content> = Vec::with_capacity(turns.len());

    for turn in turns.iter().filter(|t| t.has_text()) {
        let role = match turn.role {
            Role::Student => ModelRole::User,
            Role::Tutor => ModelRole::Model,
        };

        if formatted.is_empty() && role == ModelRole::Model {
            continue;
        }

        let parts: Vec<ContentPart> = turn
            .content
            .iter()
            .filter(|part| match part {
                ContentPart::Text(_) => part.as_text().is_some(),
                ContentPart::InlineData(_) => true,
            })
            .cloned()
            .collect();

        match formatted.last_mut() {
            Some(last) if last.role == role => last.parts.extend(parts),
            _ => formatted.push(Content { role, parts }),
        }
    }

    formatted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_roles() {
        let history = vec![
            ConversationTurn::student("What is a noun?"),
            ConversationTurn::tutor("A noun names a person, place or thing."),
        ];

        let formatted = format_history(&history);
        assert_eq!(formatted.len(), 2);
        assert_eq!(formatted[0].role, ModelRole::User);
        assert_eq!(formatted[1].role, ModelRole::Model);
        assert_eq!(
            formatted[1].parts,
            vec![ContentPart::text("A noun names a person, place or thing.")]
        );
    }

    #[test]
    fn test_drops_turns_without_text() {
        let history = vec![
            ConversationTurn::student("Look at my drawing"),
            ConversationTurn {
                role: Role::Tutor,
                content: vec![ContentPart::text("   ")],
            },
            ConversationTurn {
                role: Role::Student,
                content: vec![ContentPart::inline("image/png", "AAAA")],
            },
            ConversationTurn::tutor("Nice triangle!"),
        ];

        let formatted = format_history(&history);
        assert_eq!(formatted.len(), 2);
        assert_eq!(formatted[0].parts, vec![ContentPart::text("Look at my drawing")]);
        assert_eq!(formatted[1].parts, vec![ContentPart::text("Nice triangle!")]);
    }

    #[test]
    fn test_keeps_inline_data_of_text_turns() {
        let history = vec![ConversationTurn {
            role: Role::Student,
            content: vec![
                ContentPart::text("Is this right?"),
                ContentPart::inline("image/png", "AAAA"),
                ContentPart::text(""),
            ],
        }];

        let formatted = format_history(&history);
        assert_eq!(formatted[0].parts.len(), 2);
    }

    #[test]
    fn test_drops_leading_tutor_turns() {
        let history = vec![
            ConversationTurn::tutor("Welcome! What shall we study?"),
            ConversationTurn::student("Fractions"),
        ];

        let formatted = format_history(&history);
        assert_eq!(formatted.len(), 1);
        assert_eq!(formatted[0].role, ModelRole::User);
    }

    #[test]
    fn test_merges_consecutive_roles() {
        let history = vec![
            ConversationTurn::student("First question"),
            ConversationTurn::student("Actually, second question"),
            ConversationTurn::tutor("Let's start with the second."),
        ];

        let formatted = format_history(&history);
        assert_eq!(formatted.len(), 2);
        assert_eq!(formatted[0].parts.len(), 2);
    }

    #[test]
    fn test_input_is_not_modified() {
        let history = vec![
            ConversationTurn::tutor("Hi"),
            ConversationTurn::student("Hello"),
        ];
        let before = history.clone();

        let _ = format_history(&history);
        assert_eq!(history, before);
    }

    #[test]
    fn test_empty_history() {
        assert!(format_history(&[]).is_empty());
    }
}
