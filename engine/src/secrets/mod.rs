pub mod cache;
pub mod key;

pub use cache::SecretCache;
pub use key::ApiKey;

use keyring::Entry;
use regex::Regex;
use sdk::errors::EngineError;
use std::io::{self, BufRead, Write};
use std::sync::OnceLock;

/// SecretManager handles retrieval and storage of API keys.
///
/// Lookup order for a key such as `gemini_api_key`:
/// 1. Environment variable `TUTOR_GEMINI_API_KEY`
/// 2. OS keychain entry under the manager's service name
///
/// Unlike an interactive shell tool, the engine never prompts on a missing
/// key during a request; `store_from_reader` is used by the CLI to save one.
///
/// The SecretManager also provides secret scrubbing functionality to remove
/// sensitive data from log output and error messages.
pub struct SecretManager {
    service_name: String,
}

/// Regex patterns for detecting common secret formats.
/// These are compiled once and reused.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Initializes and returns the secret detection patterns.
///
/// Patterns match:
/// - Google API keys: AIza[0-9A-Za-z-_]{35}
/// - `key=` query parameters
/// - Bearer tokens: Bearer\s+[^\s]{20,}
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        [
            r"AIza[0-9A-Za-z\-_]{35}",
            r"key=[0-9A-Za-z\-_]{16,}",
            r"Bearer\s+[^\s]{20,}",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

impl SecretManager {
    /// Creates a new SecretManager with the given service name.
    ///
    /// The service name is used to namespace secrets in the OS keychain.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, EngineError> {
        Entry::new(&self.service_name, key)
            .map_err(|e| EngineError::KeyringError(format!("Keychain entry '{}': {}", key, e)))
    }

    /// Name of the environment variable overriding `key`
    pub fn env_var_name(key: &str) -> String {
        format!("TUTOR_{}", key.to_uppercase())
    }

    /// Retrieves a secret from the environment or the OS keychain.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if the secret is missing or
    /// keychain access fails
    pub fn get_secret(&self, key: &str) -> Result<String, EngineError> {
        if let Ok(value) = std::env::var(Self::env_var_name(key)) {
            if !value.trim().is_empty() {
                tracing::debug!("Using secret '{}' from environment", key);
                return Ok(value.trim().to_string());
            }
        }

        let entry = self.entry(key)?;

        match entry.get_password() {
            Ok(secret) => {
                tracing::debug!("Retrieved secret '{}' from keychain", key);
                Ok(secret)
            }
            Err(keyring::Error::NoEntry) => Err(EngineError::KeyringError(format!(
                "Secret '{}' not found. Set {} or run 'tutor secret set {}'",
                key,
                Self::env_var_name(key),
                key
            ))),
            Err(e) => Err(EngineError::KeyringError(format!(
                "Failed to retrieve secret '{}': {}",
                key, e
            ))),
        }
    }

    /// Stores a secret in the OS keychain.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if keychain access fails
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), EngineError> {
        let entry = self.entry(key)?;

        entry.set_password(value).map_err(|e| {
            EngineError::KeyringError(format!("Failed to store secret '{}': {}", key, e))
        })?;

        tracing::info!("Stored secret '{}' in keychain", key);
        Ok(())
    }

    /// Deletes a secret from the OS keychain.
    pub fn delete_secret(&self, key: &str) -> Result<(), EngineError> {
        let entry = self.entry(key)?;

        entry.delete_password().map_err(|e| {
            EngineError::KeyringError(format!("Failed to delete secret '{}': {}", key, e))
        })?;

        tracing::info!("Deleted secret '{}' from keychain", key);
        Ok(())
    }

    /// Checks whether a secret is available without failing.
    pub fn has_secret(&self, key: &str) -> bool {
        if std::env::var(Self::env_var_name(key)).is_ok_and(|v| !v.trim().is_empty()) {
            return true;
        }

        self.entry(key)
            .is_ok_and(|entry| entry.get_password().is_ok())
    }

    /// Reads one line from `reader` and stores it as `key`.
    ///
    /// The prompt is written to stderr so it never mixes with command output.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if the value is empty or I/O fails
    pub fn store_from_reader<R: BufRead>(&self, key: &str, reader: R) -> Result<(), EngineError> {
        eprint!("Enter value for '{}': ", key);
        io::stderr()
            .flush()
            .map_err(|e| EngineError::KeyringError(format!("Failed to flush stderr: {}", e)))?;

        let secret = read_secret_line(reader)?;
        self.set_secret(key, &secret)
    }

    /// Scrubs secrets from text by replacing them with [REDACTED].
    ///
    /// # Examples
    /// ```
    /// use tutor_engine::secrets::SecretManager;
    ///
    /// let manager = SecretManager::new("test");
    /// let scrubbed = manager.scrub("Bearer abcdefghijklmnopqrstuvwxyz");
    /// assert_eq!(scrubbed, "[REDACTED]");
    /// ```
    pub fn scrub(&self, text: &str) -> String {
        Self::scrub_text(text)
    }

    /// Scrubs secrets from text without needing a manager instance.
    pub fn scrub_text(text: &str) -> String {
        let mut result = text.to_string();

        for pattern in get_secret_patterns() {
            result = pattern.replace_all(&result, "[REDACTED]").to_string();
        }

        result
    }
}

/// Read and trim one line, rejecting empty input
fn read_secret_line<R: BufRead>(mut reader: R) -> Result<String, EngineError> {
    let mut input = String::new();
    reader
        .read_line(&mut input)
        .map_err(|e| EngineError::KeyringError(format!("Failed to read input: {}", e)))?;

    let secret = input.trim().to_string();

    if secret.is_empty() {
        return Err(EngineError::KeyringError(
            "Secret cannot be empty".to_string(),
        ));
    }

    Ok(secret)
}
