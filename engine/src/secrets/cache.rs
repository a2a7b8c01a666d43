use crate::secrets::key::ApiKey;
use crate::secrets::SecretManager;
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// An in-memory cache for secrets resolved by a `SecretManager`.
///
/// Avoids hitting the environment and OS keychain on every model call.
#[derive(Clone)]
pub struct SecretCache {
    manager: Arc<SecretManager>,
    cache: Arc<RwLock<HashMap<String, ApiKey>>>,
}

impl SecretCache {
    /// Creates a new SecretCache wrapping the provided SecretManager
    pub fn new(manager: Arc<SecretManager>) -> Self {
        Self {
            manager,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Retrieves a secret, checking the memory cache first.
    pub fn get_secret(&self, key: &str) -> Result<ApiKey, EngineError> {
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(secret) = cache.get(key) {
                return Ok(secret.clone());
            }
        }

        let secret = ApiKey::new(self.manager.get_secret(key)?);

        self.insert(key, secret.clone());
        Ok(secret)
    }

    /// Places a secret in the cache directly, bypassing the manager.
    pub fn insert(&self, key: &str, secret: impl Into<ApiKey>) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.insert(key.to_string(), secret.into());
    }
}
