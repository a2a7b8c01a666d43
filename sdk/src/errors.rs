//! Error types and handling
//!
//! This module provides the shared error type used at the tutor engine's
//! outer boundary. All errors implement the `TutorErrorExt` trait which
//! provides user-friendly hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages never include API keys; provider response bodies are
//! scrubbed before they are wrapped here.

use thiserror::Error;

/// Trait for tutor error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information.
pub trait TutorErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to students and does not contain
    /// secrets or internal implementation details.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried by the caller. Non-recoverable
    /// errors typically require a configuration change.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Inference**: Model endpoint failures
/// - **Generation**: Test generation produced no valid schema
/// - **Search**: Search augmentation failures
/// - **Secrets**: Keychain access failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, TutorErrorExt};
///
/// let error = EngineError::Generation("no JSON object found".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::Config("empty model list".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Inference errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("All models in the fallback list were exhausted")]
    AllModelsExhausted,

    // Assessment errors
    #[error("Test generation failed: {0}")]
    Generation(String),

    #[error("Invalid assessment request: {0}")]
    InvalidRequest(String),

    // Search errors
    #[error("Search error: {0}")]
    Search(String),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TutorErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::LLMProvider(_) => "The tutor is unavailable right now. Please try again",
            Self::AllModelsExhausted => "The tutor is busy right now. Please try again shortly",
            Self::Generation(_) => "We couldn't create your test. Please try again",
            Self::InvalidRequest(_) => "Check the subject, grade level and question count",
            Self::Search(_) => "Search is unavailable. Answers may be less detailed",
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::KeyringError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_asks_to_retry() {
        let error = EngineError::Generation("bad json".to_string());
        assert!(error.user_hint().contains("try again"));
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_config_errors_are_not_recoverable() {
        assert!(!EngineError::Config("x".to_string()).is_recoverable());
        assert!(!EngineError::KeyringError("x".to_string()).is_recoverable());
        assert!(EngineError::AllModelsExhausted.is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: EngineError = io.into();
        assert!(error.to_string().contains("missing"));
    }
}
