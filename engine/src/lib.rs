//! Tutor Engine Library
//!
//! Conversation orchestration with multi-model fallback, and structured test
//! generation and grading on top of a hosted model. Used by the `tutor`
//! binary and the integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// LLM provider abstraction, model router and JSON repair
pub mod llm;

/// Search augmentation
pub mod search;

/// Conversational tutoring
pub mod tutor;

/// Test generation, grading and summaries
pub mod assessment;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
