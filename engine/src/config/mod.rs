//! Configuration management
//!
//! This module handles loading, validation, and management of the tutor
//! configuration. Configuration is stored in TOML format at ~/.tutor/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: Model fallback order, per-call timeout, Gemini endpoint
//! - **search**: Search augmentation endpoint and result count
//! - **tutor**: Default grade level and language settings for conversations
//! - **assessment**: Test size limits, grading concurrency and scoring policy
//!
//! API keys are never stored here. They are read from the environment
//! (`TUTOR_GEMINI_API_KEY`, `TUTOR_SEARCH_API_KEY`) or from the OS keychain.
//!
//! # Examples
//!
//! ```no_run
//! use tutor_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Fallback order: {:?}", config.llm.fallback_models);
//! # Ok(())
//! # }
//! ```

use crate::llm::json::ParsePolicy;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    pub core: CoreConfig,

    /// Inference service configuration
    pub llm: LLMConfig,

    /// Search augmentation configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Conversation defaults
    #[serde(default)]
    pub tutor: TutorConfig,

    /// Test generation and grading settings
    #[serde(default)]
    pub assessment: AssessmentConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Inference service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Model identifiers tried in order until one succeeds
    #[serde(default = "default_fallback_models")]
    pub fallback_models: Vec<String>,

    /// Timeout for a single model call, in seconds
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Gemini endpoint settings
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Base URL for Gemini API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    // Note: API key stored in OS keychain, not in config
}

/// Search augmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Ground text-only tutoring turns with search snippets
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the search endpoint
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Search engine identifier (`cx`)
    #[serde(default)]
    pub engine_id: String,

    /// Maximum snippets added to a prompt
    #[serde(default = "default_search_max_results")]
    pub max_results: usize,
}

/// Conversation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorConfig {
    /// Grade level used when the caller does not supply one
    #[serde(default = "default_grade_level")]
    pub grade_level: String,

    /// Language the tutor answers in
    #[serde(default = "default_language")]
    pub language: String,

    /// Optional second language the tutor may mix in
    #[serde(default)]
    pub secondary_language: Option<String>,

    /// Subject used when the caller does not supply one
    #[serde(default = "default_subject")]
    pub subject: String,
}

/// Test generation and grading settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentConfig {
    /// Largest test the generator will request
    #[serde(default = "default_max_questions")]
    pub max_questions: u32,

    /// Maximum grading calls in flight at once
    #[serde(default = "default_grading_concurrency")]
    pub grading_concurrency: usize,

    /// Short-answer score counted as correct by the fallback summary
    #[serde(default = "default_pass_score")]
    pub pass_score: u8,

    /// Rubric given to short-answer questions generated without one
    #[serde(default = "default_rubric")]
    pub default_rubric: String,

    /// How model JSON output is parsed
    #[serde(default)]
    pub parse_policy: ParsePolicy,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_fallback_models() -> Vec<String> {
    vec![
        "gemini-2.0-flash".to_string(),
        "gemini-1.5-flash".to_string(),
        "gemini-1.5-flash-8b".to_string(),
    ]
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_search_base_url() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}

fn default_search_max_results() -> usize {
    3
}

fn default_grade_level() -> String {
    "Grade 5".to_string()
}

fn default_language() -> String {
    "English".to_string()
}

fn default_subject() -> String {
    "General".to_string()
}

fn default_max_questions() -> u32 {
    20
}

fn default_grading_concurrency() -> usize {
    4
}

fn default_pass_score() -> u8 {
    70
}

fn default_rubric() -> String {
    "Award full credit for a correct, complete answer with clear reasoning; \
     partial credit for a partially correct answer or correct answer without reasoning; \
     no credit for an incorrect or irrelevant answer."
        .to_string()
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            fallback_models: default_fallback_models(),
            call_timeout_secs: default_call_timeout_secs(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_search_base_url(),
            engine_id: String::new(),
            max_results: default_search_max_results(),
        }
    }
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            grade_level: default_grade_level(),
            language: default_language(),
            secondary_language: None,
            subject: default_subject(),
        }
    }
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            max_questions: default_max_questions(),
            grading_concurrency: default_grading_concurrency(),
            pass_score: default_pass_score(),
            default_rubric: default_rubric(),
            parse_policy: ParsePolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.tutor/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config = Self::read_or_create()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load_or_create`], but skips validation so a diagnostic
    /// command can report invalid values instead of refusing to start.
    pub fn read_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::read_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load and validate configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let config = Self::read_from_path(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file without validating its values
    pub fn read_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();
        config.validate()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Created default configuration at {}", path.display());
        Ok(config)
    }

    /// Get the default configuration file path (~/.tutor/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".tutor").join("config.toml"))
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The log level is unknown
    /// - The fallback model list is empty or has a blank entry
    /// - The call timeout or grading concurrency is zero
    /// - The pass score exceeds 100
    /// - `max_questions` is zero
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.llm.fallback_models.is_empty() {
            return Err(EngineError::Config(
                "llm.fallback_models must list at least one model".to_string(),
            ));
        }
        if self.llm.fallback_models.iter().any(|m| m.trim().is_empty()) {
            return Err(EngineError::Config(
                "llm.fallback_models must not contain blank entries".to_string(),
            ));
        }

        if self.llm.call_timeout_secs == 0 {
            return Err(EngineError::Config(
                "llm.call_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.assessment.grading_concurrency == 0 {
            return Err(EngineError::Config(
                "assessment.grading_concurrency must be at least 1".to_string(),
            ));
        }

        if self.assessment.pass_score > 100 {
            return Err(EngineError::Config(
                "assessment.pass_score must be between 0 and 100".to_string(),
            ));
        }

        if self.assessment.max_questions == 0 {
            return Err(EngineError::Config(
                "assessment.max_questions must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig {
                log_level: default_log_level(),
            },
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            tutor: TutorConfig::default(),
            assessment: AssessmentConfig::default(),
        }
    }
}
