//! Tutor SDK
//!
//! Shared library providing the plain data types exchanged between the tutor
//! engine and its callers. Nothing in this crate performs I/O; callers persist
//! these structures themselves (conversation turns keyed by student and
//! subject, test records keyed by student).

/// Conversation turn types
pub mod conversation;

/// Error types and handling
pub mod errors;

/// Assessment data model (tests, questions, grading)
pub mod types;

// Re-export commonly used types
pub use conversation::{ContentPart, ConversationTurn, InlineData, Role};
pub use errors::{EngineError, TutorErrorExt};
pub use types::{
    AssessmentSpec, ChoiceGrade, GradingFailure, GradingReport, GradingResult,
    MultipleChoiceQuestion, Question, QuestionType, ShortAnswerQuestion, Test, TestSummary,
    WrittenGrade, NO_ANSWER_REASON,
};
