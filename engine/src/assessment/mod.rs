//! Structured assessments
//!
//! Test generation, per-question grading and the summary over a graded test.
//! All three talk to the model through [`ModelRouter`](crate::llm::router::ModelRouter)
//! and read its JSON output with the parsers in [`crate::llm::json`].

pub mod generator;
pub mod grader;
pub mod summary;

pub use generator::AssessmentGenerator;
pub use grader::ResponseGrader;
pub use summary::{fallback_summary, SummaryBuilder};

use crate::llm::json::ParseError;
use crate::llm::LLMError;
use sdk::{EngineError, TutorErrorExt};
use thiserror::Error;

/// Why a test could not be generated
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Invalid test request: {0}")]
    InvalidSpec(String),

    #[error("Inference failed: {0}")]
    Inference(#[from] LLMError),

    #[error("Model output is not a usable test: {0}")]
    Malformed(#[from] ParseError),

    /// `index` is the 1-based position in the model output
    #[error("Question {index} is invalid: {reason}")]
    InvalidQuestion { index: usize, reason: String },

    #[error("Expected {expected} questions, model produced {actual}")]
    TooFewQuestions { expected: u32, actual: usize },
}

impl TutorErrorExt for GenerationError {
    fn user_hint(&self) -> &str {
        match self {
            GenerationError::InvalidSpec(_) => {
                "Check the subject, grade level, question types and question count"
            }
            _ => "We couldn't create your test. Please try again",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, GenerationError::InvalidSpec(_))
    }
}

impl From<GenerationError> for EngineError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::InvalidSpec(msg) => EngineError::InvalidRequest(msg),
            GenerationError::Inference(inner) => inner.into(),
            other => EngineError::Generation(other.to_string()),
        }
    }
}
