//! Prompt construction for tutoring turns

use crate::config::TutorConfig;
use serde::{Deserialize, Serialize};

/// Who the tutor is talking to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorProfile {
    pub grade_level: String,
    pub language: String,
    pub secondary_language: Option<String>,
    pub subject: String,
}

impl TutorProfile {
    pub fn from_config(config: &TutorConfig) -> Self {
        Self {
            grade_level: config.grade_level.clone(),
            language: config.language.clone(),
            secondary_language: config.secondary_language.clone(),
            subject: config.subject.clone(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_grade_level(mut self, grade_level: impl Into<String>) -> Self {
        self.grade_level = grade_level.into();
        self
    }

    /// System-level instruction block, sent separately from the turn history
    pub fn system_instruction(&self) -> String {
        let mut instruction = format!(
            "You are a patient, encouraging tutor helping a {grade} student with {subject}.\n\n\
             Vocabulary: use words and sentence lengths a {grade} student reading {language} \
             understands. Prefer examples from everyday life in the student's locale; introduce \
             technical terms only with a short, plain explanation.\n\n",
            grade = self.grade_level,
            subject = self.subject,
            language = self.language,
        );

        match self
            .secondary_language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
        {
            Some(secondary) => instruction.push_str(&format!(
                "Language: answer mainly in {}. You may mix in short {} words or phrases when \
                 they help understanding, and always give the {} meaning next to them. Reply in \
                 {} if the student writes in it.\n\n",
                self.language, secondary, self.language, secondary
            )),
            None => instruction.push_str(&format!(
                "Language: answer only in {}.\n\n",
                self.language
            )),
        }

        instruction.push_str(
            "Guidance: do not hand over final answers to homework-style problems. Ask guiding \
             questions, give one hint at a time, and let the student take the next step. When the \
             student has worked it out, confirm it and explain why it is right.",
        );

        instruction
    }
}

impl Default for TutorProfile {
    fn default() -> Self {
        Self::from_config(&TutorConfig::default())
    }
}

/// Prompt for a text-only turn.
///
/// Search context, when present, comes before the student's literal query.
pub fn grounded_prompt(context: Option<&str>, query: &str) -> String {
    match context {
        Some(context) => format!(
            "Use the reference material below if it is relevant. Do not mention it unless the \
             student asks for sources.\n\nReference material:\n{}\n\nStudent question: {}",
            context, query
        ),
        None => query.to_string(),
    }
}

/// Instruction that accompanies a document attachment
pub fn document_prompt(query: &str) -> String {
    let query = query.trim();
    if query.is_empty() {
        "The student shared the document above. Explain its main ideas at their level and ask \
         one question to check understanding."
            .to_string()
    } else {
        format!(
            "The student shared the document above and asks: {}",
            query
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> TutorProfile {
        TutorProfile {
            grade_level: "Grade 4".to_string(),
            language: "English".to_string(),
            secondary_language: None,
            subject: "Science".to_string(),
        }
    }

    #[test]
    fn test_system_instruction_mentions_level_and_subject() {
        let instruction = profile().system_instruction();
        assert!(instruction.contains("Grade 4"));
        assert!(instruction.contains("Science"));
        assert!(instruction.contains("answer only in English"));
        assert!(instruction.contains("guiding"));
    }

    #[test]
    fn test_bilingual_rule() {
        let mut profile = profile();
        profile.secondary_language = Some("Spanish".to_string());

        let instruction = profile.system_instruction();
        assert!(instruction.contains("mix in short Spanish words"));
        assert!(!instruction.contains("answer only in"));
    }

    #[test]
    fn test_blank_secondary_language_ignored() {
        let mut profile = profile();
        profile.secondary_language = Some("  ".to_string());
        assert!(profile.system_instruction().contains("answer only in English"));
    }

    #[test]
    fn test_grounded_prompt_places_context_first() {
        let prompt = grounded_prompt(Some("[1] Plants\nPlants need light."), "Why are leaves green?");
        let context_at = prompt.find("Plants need light.").unwrap();
        let query_at = prompt.find("Student question: Why are leaves green?").unwrap();
        assert!(context_at < query_at);
        assert!(prompt.ends_with("Why are leaves green?"));
    }

    #[test]
    fn test_grounded_prompt_without_context() {
        assert_eq!(grounded_prompt(None, "What is 2+2?"), "What is 2+2?");
    }

    #[test]
    fn test_document_prompt() {
        assert!(document_prompt("").contains("main ideas"));
        assert!(document_prompt("What is the theme?").ends_with("What is the theme?"));
    }

    #[test]
    fn test_overrides() {
        let profile = TutorProfile::default()
            .with_subject("History")
            .with_grade_level("Grade 8");
        assert_eq!(profile.subject, "History");
        assert_eq!(profile.grade_level, "Grade 8");
        assert_eq!(profile.language, "English");
    }
}
