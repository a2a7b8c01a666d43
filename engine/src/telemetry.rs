//! Telemetry
//!
//! Sets up `tracing-subscriber`. The level comes from `core.log_level` in the
//! configuration unless `RUST_LOG` is set. Debug builds print pretty output
//! for the terminal; release builds emit JSON lines with the current span.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber with the given log level.
///
/// Priority: `RUST_LOG` env var > `log_level` parameter.
/// Only the first call installs a subscriber; later calls are ignored.
pub fn init_telemetry_with_level(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }
}

fn default_filter(log_level: &str) -> String {
    format!("{},tutor_engine={}", log_level, log_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_targets_engine() {
        assert_eq!(default_filter("debug"), "debug,tutor_engine=debug");
        assert!(EnvFilter::try_new(default_filter("info")).is_ok());
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_telemetry_with_level("info");
        init_telemetry_with_level("debug");
    }
}
