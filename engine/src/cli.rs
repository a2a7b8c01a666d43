//! CLI interface for the tutor engine
//!
//! Command-line surface built with clap's derive API. Every command is a
//! single request: the engine keeps nothing between invocations, so chat
//! history, tests and answers are passed in as files.

use clap::{Parser, Subcommand, ValueEnum};
use sdk::QuestionType;
use std::path::PathBuf;

/// Tutoring and assessment engine
///
/// Talks to a hosted model with multi-model fallback, grounds answers with
/// search, and generates and grades structured tests.
#[derive(Parser, Debug)]
#[command(name = "tutor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask the tutor one question
    Chat {
        /// The student's message
        prompt: String,

        /// Image to send with the message (drawing, photo of work)
        #[arg(long, value_name = "PATH", conflicts_with = "document")]
        image: Option<PathBuf>,

        /// Document to ask about
        #[arg(long, value_name = "PATH")]
        document: Option<PathBuf>,

        /// JSON file with prior turns: [{"role": "student", "content": [...]}]
        #[arg(long, value_name = "PATH")]
        history: Option<PathBuf>,

        /// Subject override
        #[arg(long)]
        subject: Option<String>,

        /// Grade level override
        #[arg(long)]
        grade: Option<String>,
    },

    /// Generate a test
    Generate {
        /// Subject, e.g. "Mathematics"
        #[arg(long)]
        subject: String,

        /// Grade level, e.g. "Grade 5"
        #[arg(long)]
        grade: String,

        /// Question types, comma separated (multiple-choice, short-answer)
        #[arg(
            long,
            value_delimiter = ',',
            value_parser = parse_question_type,
            default_value = "multiple-choice"
        )]
        types: Vec<QuestionType>,

        /// Number of questions
        #[arg(long, default_value = "5")]
        count: u32,

        /// Write the test JSON to this file
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Grade answers to a generated test
    Grade {
        /// Test JSON produced by `generate`
        #[arg(long, value_name = "PATH")]
        test: PathBuf,

        /// JSON array of answers, one per question ("" for unanswered)
        #[arg(long, value_name = "PATH")]
        answers: PathBuf,
    },

    /// Run system diagnostics
    Doctor,

    /// Manage API keys in the OS keychain
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

/// API keys the engine reads
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKey {
    /// Key for the inference service
    GeminiApiKey,
    /// Key for the search service
    SearchApiKey,
}

impl SecretKey {
    /// Name under which the key is stored
    pub fn as_key(&self) -> &'static str {
        match self {
            SecretKey::GeminiApiKey => crate::llm::gemini::GEMINI_API_KEY,
            SecretKey::SearchApiKey => crate::search::web::SEARCH_API_KEY,
        }
    }
}

/// Keychain actions
#[derive(Subcommand, Debug)]
pub enum SecretAction {
    /// Store a key (read from stdin)
    Set {
        #[arg(value_enum)]
        key: SecretKey,
    },

    /// Remove a key
    Delete {
        #[arg(value_enum)]
        key: SecretKey,
    },
}

fn parse_question_type(s: &str) -> Result<QuestionType, String> {
    s.parse()
}
