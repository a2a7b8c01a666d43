//! Assessment data model
//!
//! Tests, questions, grading results and summaries. Every entity serializes
//! as camelCase JSON; questions and results are tagged by `"type"`.
//!
//! Each question carries a stable `id` and every grading result carries the
//! `questionId` it belongs to, so results can be matched to questions without
//! relying on completion order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Reason recorded for a question the student left blank
pub const NO_ANSWER_REASON: &str = "No answer provided";

/// Kind of question a test may contain
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    ShortAnswer,
}

impl QuestionType {
    /// Canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::ShortAnswer => "short-answer",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    /// Lenient parse: accepts `multiple-choice`, `multiple_choice`,
    /// `Multiple Choice`, `mcq`, `short answer`, `open`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        match normalized.as_str() {
            "multiplechoice" | "mcq" | "mc" | "choice" => Ok(QuestionType::MultipleChoice),
            "shortanswer" | "sa" | "open" | "openended" | "written" => {
                Ok(QuestionType::ShortAnswer)
            }
            _ => Err(format!("Unknown question type '{}'", s.trim())),
        }
    }
}

/// What the caller asks the generator to produce
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSpec {
    pub subject: String,
    pub grade_level: String,
    pub question_types: BTreeSet<QuestionType>,
    pub count: u32,
}

impl AssessmentSpec {
    pub fn new(
        subject: impl Into<String>,
        grade_level: impl Into<String>,
        question_types: impl IntoIterator<Item = QuestionType>,
        count: u32,
    ) -> Self {
        Self {
            subject: subject.into(),
            grade_level: grade_level.into(),
            question_types: question_types.into_iter().collect(),
            count,
        }
    }

    /// Check the request before any inference call is made
    pub fn validate(&self, max_questions: u32) -> Result<(), String> {
        if self.subject.trim().is_empty() {
            return Err("subject must not be empty".to_string());
        }
        if self.grade_level.trim().is_empty() {
            return Err("grade level must not be empty".to_string());
        }
        if self.question_types.is_empty() {
            return Err("at least one question type is required".to_string());
        }
        if self.count == 0 {
            return Err("question count must be at least 1".to_string());
        }
        if self.count > max_questions {
            return Err(format!(
                "question count {} exceeds the limit of {}",
                self.count, max_questions
            ));
        }
        Ok(())
    }
}

/// Multiple-choice question with exactly four options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MultipleChoiceQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// Open question graded against a rubric
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShortAnswerQuestion {
    pub id: String,
    pub prompt: String,
    pub correct_answer: String,
    pub rubric: String,
}

/// A test question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Question {
    MultipleChoice(MultipleChoiceQuestion),
    ShortAnswer(ShortAnswerQuestion),
}

impl Question {
    pub fn id(&self) -> &str {
        match self {
            Question::MultipleChoice(q) => &q.id,
            Question::ShortAnswer(q) => &q.id,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Question::MultipleChoice(q) => &q.prompt,
            Question::ShortAnswer(q) => &q.prompt,
        }
    }

    pub fn correct_answer(&self) -> &str {
        match self {
            Question::MultipleChoice(q) => &q.correct_answer,
            Question::ShortAnswer(q) => &q.correct_answer,
        }
    }

    pub fn question_type(&self) -> QuestionType {
        match self {
            Question::MultipleChoice(_) => QuestionType::MultipleChoice,
            Question::ShortAnswer(_) => QuestionType::ShortAnswer,
        }
    }
}

/// A generated test, handed back to the caller for persistence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub id: String,
    pub subject: String,
    pub grade_level: String,
    pub questions: Vec<Question>,

    /// RFC 3339 creation timestamp (UTC)
    pub created_at: String,
}

/// Grade for a multiple-choice answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceGrade {
    pub question_id: String,
    pub is_correct: bool,
    pub feedback: String,
}

/// Grade for a short-answer response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WrittenGrade {
    pub question_id: String,

    /// Score in 0..=100
    pub score: u8,
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
}

/// Placeholder for a question that could not be graded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GradingFailure {
    pub question_id: String,
    pub reason: String,
}

/// Outcome of grading one answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GradingResult {
    MultipleChoice(ChoiceGrade),
    ShortAnswer(WrittenGrade),
    Error(GradingFailure),
}

impl GradingResult {
    /// Build an error result for a question
    pub fn error(question_id: impl Into<String>, reason: impl Into<String>) -> Self {
        GradingResult::Error(GradingFailure {
            question_id: question_id.into(),
            reason: reason.into(),
        })
    }

    pub fn question_id(&self) -> &str {
        match self {
            GradingResult::MultipleChoice(g) => &g.question_id,
            GradingResult::ShortAnswer(g) => &g.question_id,
            GradingResult::Error(g) => &g.question_id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, GradingResult::Error(_))
    }

    /// Whether this result counts as a correct answer.
    ///
    /// Multiple-choice counts when marked correct, short-answer when the
    /// score reaches `pass_score`. Errors never count.
    pub fn counts_as_correct(&self, pass_score: u8) -> bool {
        match self {
            GradingResult::MultipleChoice(g) => g.is_correct,
            GradingResult::ShortAnswer(g) => g.score >= pass_score,
            GradingResult::Error(_) => false,
        }
    }
}

/// Aggregate feedback over a whole test
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    /// Score in 0..=100
    pub overall_score: u8,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub feedback: String,
}

/// Per-question results plus the summary, aligned with `Test::questions`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GradingReport {
    pub results: Vec<GradingResult>,
    pub summary: TestSummary,

    /// True when the summary came from the deterministic heuristic
    #[serde(default)]
    pub used_fallback_summary: bool,
}
