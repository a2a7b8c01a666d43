// Tutor Engine
// Main entry point for the tutor binary

use clap::Parser;
use tutor_engine::cli::{Cli, Command};
use tutor_engine::config::Config;
use tutor_engine::handlers::{
    handle_chat, handle_doctor, handle_generate, handle_grade, handle_secret, ChatArgs,
    OutputFormat,
};
use tutor_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided).
    // doctor reports invalid values itself, so it skips validation here.
    let validate = !matches!(cli.command, Command::Doctor);
    let config = match (&cli.config, validate) {
        (Some(config_path), true) => Config::load_from_path(config_path)?,
        (Some(config_path), false) => Config::read_from_path(config_path)?,
        (None, true) => Config::load_or_create()?,
        (None, false) => Config::read_or_create()?,
    };

    // --log takes precedence over the configured level
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Tutor Engine v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Chat {
            prompt,
            image,
            document,
            history,
            subject,
            grade,
        } => {
            let args = ChatArgs {
                prompt: &prompt,
                image: image.as_deref(),
                document: document.as_deref(),
                history: history.as_deref(),
                subject: subject.as_deref(),
                grade: grade.as_deref(),
            };
            handle_chat(args, &config, format).await
        }

        Command::Generate {
            subject,
            grade,
            types,
            count,
            output,
        } => {
            tracing::info!("Generating {} questions for {} ({})", count, subject, grade);
            let spec = sdk::AssessmentSpec::new(subject, grade, types, count);
            handle_generate(spec, output.as_deref(), &config, format).await
        }

        Command::Grade { test, answers } => handle_grade(&test, &answers, &config, format).await,

        Command::Doctor => handle_doctor(&config, format).await,

        Command::Secret { action } => handle_secret(action),
    }
}
