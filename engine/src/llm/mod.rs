//! Inference Service Abstraction Layer
//!
//! This module provides the common interface for talking to a generative model
//! endpoint. The `LLMProvider` trait defines the contract a provider must
//! implement; the `ModelRouter` drives a provider through an ordered list of
//! model identifiers with failover.
//!
//! Provider faults are classified at this boundary into a closed taxonomy
//! ([`FaultClass`]) so callers never inspect error text.

use async_trait::async_trait;
use sdk::{ContentPart, EngineError};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod gemini;
pub mod json;
pub mod router;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// How a provider fault should be treated by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// Capacity, rate limiting or timeout: try the next model
    Transient,

    /// Anything else: stop immediately
    NonRetryable,

    /// The service answered but the payload could not be understood
    SchemaViolation,
}

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Model overloaded: {0}")]
    Overloaded(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Blocked by safety filter: {0}")]
    SafetyBlocked(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("All models in the fallback list failed")]
    AllModelsExhausted,
}

impl LLMError {
    /// Classify this fault
    pub fn class(&self) -> FaultClass {
        match self {
            LLMError::RateLimited(_)
            | LLMError::Overloaded(_)
            | LLMError::Timeout(_) => FaultClass::Transient,
            LLMError::ParseError(_) => FaultClass::SchemaViolation,
            LLMError::NetworkError(_)
            | LLMError::SafetyBlocked(_)
            | LLMError::InvalidRequest(_)
            | LLMError::ModelNotFound(_)
            | LLMError::AuthenticationFailed(_)
            | LLMError::EmptyResponse
            | LLMError::ProviderUnavailable(_)
            | LLMError::AllModelsExhausted => FaultClass::NonRetryable,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == FaultClass::Transient
    }
}

impl From<LLMError> for EngineError {
    fn from(e: LLMError) -> Self {
        match e {
            LLMError::AllModelsExhausted => EngineError::AllModelsExhausted,
            LLMError::NetworkError(msg) => EngineError::Network(msg),
            other => EngineError::LLMProvider(other.to_string()),
        }
    }
}

/// Speaker of a turn, as the inference service names them
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    User,
    Model,
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRole::User => write!(f, "user"),
            ModelRole::Model => write!(f, "model"),
        }
    }
}

/// One turn of history in the service's two-role format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Content {
    pub role: ModelRole,
    pub parts: Vec<ContentPart>,
}

impl Content {
    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self {
            role: ModelRole::User,
            parts,
        }
    }

    pub fn model(parts: Vec<ContentPart>) -> Self {
        Self {
            role: ModelRole::Model,
            parts,
        }
    }
}

/// Requested shape of the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// A single call to the inference service
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InferenceRequest {
    /// System-level instruction kept apart from the history
    pub system_instruction: Option<String>,

    /// Prior turns, oldest first
    pub history: Vec<Content>,

    /// Parts of the new user turn
    pub input: Vec<ContentPart>,

    pub response_format: ResponseFormat,
}

impl InferenceRequest {
    /// Create a request whose new turn is the given parts
    pub fn new(input: Vec<ContentPart>) -> Self {
        Self {
            input,
            ..Default::default()
        }
    }

    /// Create a request whose new turn is a single text part
    pub fn text(prompt: impl Into<String>) -> Self {
        Self::new(vec![ContentPart::text(prompt)])
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Content>) -> Self {
        self.history = history;
        self
    }

    /// Ask the service for a JSON reply
    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }

    /// History followed by the new user turn, with roles strictly alternating.
    ///
    /// When the history already ends on a user turn the input parts are
    /// appended to it instead of opening a second user turn.
    pub fn contents(&self) -> Vec<Content> {
        let mut contents = self.history.clone();
        match contents.last_mut() {
            Some(last) if last.role == ModelRole::User => {
                last.parts.extend(self.input.iter().cloned());
            }
            _ => contents.push(Content::user(self.input.clone())),
        }
        contents
    }
}

/// Text produced by the inference service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceResponse {
    pub text: String,
}

impl InferenceResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "gemini")
    fn name(&self) -> &str;

    /// Generate a reply with the given model
    ///
    /// # Arguments
    /// * `model` - Model identifier from the fallback list
    /// * `request` - System instruction, history and the new turn
    ///
    /// # Returns
    /// * `Ok(InferenceResponse)` - The reply text
    /// * `Err(LLMError)` - A classified provider fault
    async fn generate(&self, model: &str, request: &InferenceRequest)
        -> Result<InferenceResponse>;

    /// Check if the provider is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_faults_are_transient() {
        assert_eq!(
            LLMError::RateLimited("quota".into()).class(),
            FaultClass::Transient
        );
        assert_eq!(
            LLMError::Overloaded("503".into()).class(),
            FaultClass::Transient
        );
        assert_eq!(LLMError::Timeout(30).class(), FaultClass::Transient);
    }

    #[test]
    fn test_other_faults_are_not_retried() {
        for error in [
            LLMError::SafetyBlocked("HARM_CATEGORY".into()),
            LLMError::InvalidRequest("bad field".into()),
            LLMError::ModelNotFound("gemini-0".into()),
            LLMError::AuthenticationFailed("no key".into()),
            LLMError::NetworkError("dns".into()),
            LLMError::EmptyResponse,
            LLMError::AllModelsExhausted,
        ] {
            assert_eq!(error.class(), FaultClass::NonRetryable, "{}", error);
            assert!(!error.is_transient());
        }
    }

    #[test]
    fn test_parse_error_is_schema_violation() {
        assert_eq!(
            LLMError::ParseError("no candidates".into()).class(),
            FaultClass::SchemaViolation
        );
    }

    #[test]
    fn test_request_builder() {
        let request = InferenceRequest::text("Hello")
            .with_system_instruction("Be kind")
            .with_history(vec![Content::user(vec![ContentPart::text("Hi")])])
            .json();

        assert_eq!(request.system_instruction.as_deref(), Some("Be kind"));
        assert_eq!(request.history.len(), 1);
        assert_eq!(request.input, vec![ContentPart::text("Hello")]);
        assert_eq!(request.response_format, ResponseFormat::Json);
    }

    #[test]
    fn test_contents_alternate_after_trailing_user_turn() {
        let request = InferenceRequest::text("Hello?").with_history(vec![
            Content::user(vec![ContentPart::text("What is a fraction?")]),
            Content::model(vec![ContentPart::text("Part of a whole.")]),
            Content::user(vec![ContentPart::text("And a decimal?")]),
        ]);

        let contents = request.contents();
        let roles: Vec<ModelRole> = contents.iter().map(|c| c.role).collect();
        assert_eq!(roles, vec![ModelRole::User, ModelRole::Model, ModelRole::User]);
        assert_eq!(
            contents[2].parts,
            vec![ContentPart::text("And a decimal?"), ContentPart::text("Hello?")]
        );

        // History is left untouched
        assert_eq!(request.history[2].parts.len(), 1);
    }

    #[test]
    fn test_contents_open_new_user_turn() {
        let request = InferenceRequest::text("Hello?")
            .with_history(vec![Content::model(vec![ContentPart::text("Hi!")])]);
        let contents = request.contents();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[1], Content::user(vec![ContentPart::text("Hello?")]));

        let contents = InferenceRequest::text("Hello?").contents();
        assert_eq!(contents, vec![Content::user(vec![ContentPart::text("Hello?")])]);
    }

    #[test]
    fn test_engine_error_conversion() {
        let error: EngineError = LLMError::AllModelsExhausted.into();
        assert!(matches!(error, EngineError::AllModelsExhausted));

        let error: EngineError = LLMError::SafetyBlocked("x".into()).into();
        assert!(matches!(error, EngineError::LLMProvider(_)));
    }
}
