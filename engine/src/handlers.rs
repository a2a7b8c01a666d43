//! Command handlers for CLI operations
//!
//! - chat: one tutoring turn
//! - generate: create a test
//! - grade: grade answers to a test and summarize
//! - doctor: validate configuration and check keys and endpoints
//! - secret: manage keys in the OS keychain

use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use crate::assessment::{AssessmentGenerator, ResponseGrader};
use crate::cli::SecretAction;
use crate::config::Config;
use crate::llm::gemini::{GeminiProvider, GEMINI_API_KEY};
use crate::llm::router::ModelRouter;
use crate::search::web::SEARCH_API_KEY;
use crate::search::{NoSearch, SearchProvider, WebSearchClient};
use crate::secrets::{SecretCache, SecretManager};
use crate::tutor::{Attachment, ConversationOrchestrator, TutorProfile};
use sdk::{AssessmentSpec, ConversationTurn, GradingResult, Question, Test, TutorErrorExt};

/// Keychain service name
pub const SERVICE_NAME: &str = "tutor";

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Arguments of the `chat` command
#[derive(Debug)]
pub struct ChatArgs<'a> {
    pub prompt: &'a str,
    pub image: Option<&'a Path>,
    pub document: Option<&'a Path>,
    pub history: Option<&'a Path>,
    pub subject: Option<&'a str>,
    pub grade: Option<&'a str>,
}

fn secret_cache() -> Arc<SecretCache> {
    Arc::new(SecretCache::new(Arc::new(SecretManager::new(SERVICE_NAME))))
}

/// Router over the configured Gemini models
pub fn build_router(config: &Config, secrets: Arc<SecretCache>) -> Arc<ModelRouter> {
    let provider = Arc::new(GeminiProvider::new(config.llm.gemini.clone(), secrets));
    Arc::new(ModelRouter::from_config(provider, &config.llm))
}

/// Search provider, or [`NoSearch`] when disabled
pub fn build_search(config: &Config, secrets: Arc<SecretCache>) -> Arc<dyn SearchProvider> {
    if config.search.enabled {
        Arc::new(WebSearchClient::new(config.search.clone(), secrets))
    } else {
        Arc::new(NoSearch)
    }
}

/// One tutoring turn
pub async fn handle_chat(args: ChatArgs<'_>, config: &Config, format: OutputFormat) -> Result<()> {
    let history: Vec<ConversationTurn> = match args.history {
        Some(path) => read_json(path).context("Failed to load chat history")?,
        None => Vec::new(),
    };

    let attachment = match (args.image, args.document) {
        (Some(path), _) => {
            let attachment = Attachment::from_path(path)
                .with_context(|| format!("Failed to read image {}", path.display()))?;
            if !attachment.is_image() {
                anyhow::bail!("{} is not a supported image", path.display());
            }
            Some(attachment)
        }
        (None, Some(path)) => {
            let attachment = Attachment::from_path(path)
                .with_context(|| format!("Failed to read document {}", path.display()))?;
            Some(match attachment {
                Attachment::Image { mime_type, bytes } => {
                    Attachment::document(file_name(path), mime_type, bytes)
                }
                document => document,
            })
        }
        (None, None) => None,
    };

    let mut profile = TutorProfile::from_config(&config.tutor);
    if let Some(subject) = args.subject {
        profile = profile.with_subject(subject);
    }
    if let Some(grade) = args.grade {
        profile = profile.with_grade_level(grade);
    }

    let secrets = secret_cache();
    let orchestrator = ConversationOrchestrator::new(
        build_router(config, Arc::clone(&secrets)),
        build_search(config, secrets),
        profile,
    );

    let reply = orchestrator
        .take_turn(args.prompt, attachment.as_ref(), &history)
        .await;

    match format {
        OutputFormat::Text => println!("{}", reply),
        OutputFormat::Json => {
            let turn = ConversationTurn::tutor(reply);
            println!("{}", serde_json::to_string_pretty(&turn)?);
        }
    }

    Ok(())
}

/// Generate a test and print or save it
pub async fn handle_generate(
    spec: AssessmentSpec,
    output: Option<&Path>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let generator = AssessmentGenerator::new(
        build_router(config, secret_cache()),
        config.assessment.clone(),
    );

    let test = match generator.generate(&spec).await {
        Ok(test) => test,
        Err(e) => {
            tracing::error!("Test generation failed: {}", e);
            anyhow::bail!("{} ({})", e.user_hint(), e);
        }
    };

    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&test)?)
            .with_context(|| format!("Failed to write test to {}", path.display()))?;
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&test)?),
        OutputFormat::Text => {
            println!("{} test for {} ({})", test.subject, test.grade_level, test.id);
            println!();
            for question in &test.questions {
                println!("{}. [{}] {}", question.id(), question.question_type(), question.prompt());
                if let Question::MultipleChoice(q) = question {
                    for (i, option) in q.options.iter().enumerate() {
                        println!("     {}) {}", (b'A' + i as u8) as char, option);
                    }
                }
            }
            if let Some(path) = output {
                println!();
                println!("✓ Saved to {}", path.display());
            }
        }
    }

    Ok(())
}

/// Grade answers to a saved test
pub async fn handle_grade(
    test_path: &Path,
    answers_path: &Path,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let test: Test = read_json(test_path).context("Failed to load test")?;
    let answers = read_answers(answers_path).context("Failed to load answers")?;

    if answers.len() != test.questions.len() {
        tracing::warn!(
            "Test has {} questions but {} answers were given",
            test.questions.len(),
            answers.len()
        );
    }

    let grader = ResponseGrader::new(build_router(config, secret_cache()), &config.assessment);
    let report = grader.grade(&test, &answers).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("Results for {} ({})", test.subject, test.grade_level);
            println!();
            for result in &report.results {
                match result {
                    GradingResult::MultipleChoice(g) => println!(
                        "  {} {:<4} {}",
                        if g.is_correct { "✓" } else { "✗" },
                        g.question_id,
                        g.feedback
                    ),
                    GradingResult::ShortAnswer(g) => println!(
                        "  {} {:<4} {:>3}/100 {}",
                        if g.score >= config.assessment.pass_score { "✓" } else { "✗" },
                        g.question_id,
                        g.score,
                        g.feedback
                    ),
                    GradingResult::Error(g) => {
                        println!("  ⚠ {:<4} {}", g.question_id, g.reason)
                    }
                }
            }

            let summary = &report.summary;
            println!();
            println!("Overall score: {}%", summary.overall_score);
            println!("{}", summary.feedback);
            print_list("Strengths", &summary.strengths);
            print_list("To improve", &summary.improvements);
            print_list("Next steps", &summary.recommendations);
            if report.used_fallback_summary {
                println!();
                println!("(summary computed locally)");
            }
        }
    }

    Ok(())
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("{}:", title);
    for item in items {
        println!("  - {}", item);
    }
}

/// Validate configuration, keys and service reachability
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    match config.validate() {
        Ok(()) => checks.push(("Configuration", "Valid".to_string())),
        Err(e) => {
            checks.push(("Configuration", "Invalid".to_string()));
            issues.push(e.to_string());
        }
    }

    checks.push(("Fallback models", config.llm.fallback_models.join(", ")));

    let manager = SecretManager::new(SERVICE_NAME);
    if manager.has_secret(GEMINI_API_KEY) {
        checks.push(("Gemini API key", "Configured".to_string()));
    } else {
        checks.push(("Gemini API key", "Not configured".to_string()));
        issues.push(format!(
            "No Gemini API key. Run 'tutor secret set gemini-api-key' or set {}",
            SecretManager::env_var_name(GEMINI_API_KEY)
        ));
    }

    if !config.search.enabled {
        checks.push(("Search augmentation", "Disabled".to_string()));
    } else if config.search.engine_id.trim().is_empty() {
        checks.push(("Search augmentation", "Missing engine id".to_string()));
        issues.push("search.engine_id is empty; answers will not be grounded".to_string());
    } else if manager.has_secret(SEARCH_API_KEY) {
        checks.push(("Search augmentation", "Configured".to_string()));
    } else {
        checks.push(("Search augmentation", "Missing API key".to_string()));
        issues.push(format!(
            "No search API key. Run 'tutor secret set search-api-key' or set {}",
            SecretManager::env_var_name(SEARCH_API_KEY)
        ));
    }

    let router = build_router(config, secret_cache());
    if router.check_health().await {
        checks.push(("Inference provider", format!("{} ready", router.provider_name())));
    } else {
        checks.push(("Inference provider", "Unavailable".to_string()));
    }

    match format {
        OutputFormat::Text => {
            println!("Tutor System Diagnostics");
            println!("============================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Store or remove a key in the OS keychain
pub fn handle_secret(action: SecretAction) -> Result<()> {
    let manager = SecretManager::new(SERVICE_NAME);

    match action {
        SecretAction::Set { key } => {
            manager
                .store_from_reader(key.as_key(), std::io::stdin().lock())
                .with_context(|| format!("Failed to store {}", key.as_key()))?;
            println!("✓ Stored {}", key.as_key());
        }
        SecretAction::Delete { key } => {
            manager
                .delete_secret(key.as_key())
                .with_context(|| format!("Failed to delete {}", key.as_key()))?;
            println!("✓ Deleted {}", key.as_key());
        }
    }

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string())
}

/// Answers file: a JSON array where `null` marks an unanswered question
fn read_answers(path: &Path) -> Result<Vec<String>> {
    let answers: Vec<Option<String>> = read_json(path)?;
    Ok(answers.into_iter().map(Option::unwrap_or_default).collect())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", path.display()))
}
