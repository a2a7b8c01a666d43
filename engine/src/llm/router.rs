//! Model Router
//!
//! Drives a provider through an ordered fallback list of model identifiers.
//! Attempts are strictly sequential and the first success wins; models are
//! never called speculatively in parallel.
//!
//! A fault classified as [`FaultClass::Transient`] (rate limiting, capacity,
//! per-call timeout) advances to the next model. Any other fault stops the
//! loop and is returned unchanged, so an unrelated failure is never masked by
//! retrying more models.

use super::{FaultClass, InferenceRequest, LLMError, LLMProvider};
use crate::config::LLMConfig;
use std::sync::Arc;
use std::time::Duration;

/// Reply text plus the model that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedResponse {
    pub text: String,
    pub model: String,
}

/// Fallback router over one provider's models
pub struct ModelRouter {
    /// Provider that serves every model in the list
    provider: Arc<dyn LLMProvider>,

    /// Model identifiers, most preferred first
    models: Vec<String>,

    /// Upper bound for a single model call
    call_timeout: Duration,
}

impl ModelRouter {
    /// Create a new router
    ///
    /// # Arguments
    /// * `provider` - Provider used for every attempt
    /// * `models` - Fallback order
    /// * `call_timeout` - Per-call timeout; expiry advances to the next model
    pub fn new(provider: Arc<dyn LLMProvider>, models: Vec<String>, call_timeout: Duration) -> Self {
        Self {
            provider,
            models,
            call_timeout,
        }
    }

    /// Create a router from the `[llm]` configuration section
    pub fn from_config(provider: Arc<dyn LLMProvider>, config: &LLMConfig) -> Self {
        Self::new(
            provider,
            config.fallback_models.clone(),
            Duration::from_secs(config.call_timeout_secs),
        )
    }

    /// The fallback order
    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Call models in order until one succeeds.
    ///
    /// # Errors
    ///
    /// - The first non-transient fault, as soon as it happens
    /// - `LLMError::AllModelsExhausted` when every model failed transiently
    /// - `LLMError::ProviderUnavailable` when the model list is empty
    pub async fn call(&self, request: &InferenceRequest) -> super::Result<RoutedResponse> {
        if self.models.is_empty() {
            return Err(LLMError::ProviderUnavailable(
                "No models configured".to_string(),
            ));
        }

        let timeout_secs = self.call_timeout.as_secs();

        for model in &self.models {
            tracing::debug!(
                "Attempting model: {} via {} (timeout: {}s)",
                model,
                self.provider.name(),
                timeout_secs
            );

            let outcome =
                match tokio::time::timeout(self.call_timeout, self.provider.generate(model, request))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(LLMError::Timeout(timeout_secs)),
                };

            match outcome {
                Ok(response) => {
                    tracing::info!("Model {} succeeded", model);
                    return Ok(RoutedResponse {
                        text: response.text,
                        model: model.clone(),
                    });
                }
                Err(e) if e.class() == FaultClass::Transient => {
                    tracing::warn!("Model {} unavailable, trying next: {}", model, e);
                }
                Err(e) => {
                    tracing::warn!(
                        "Model {} failed with {:?} fault, not falling back: {}",
                        model,
                        e.class(),
                        e
                    );
                    return Err(e);
                }
            }
        }

        tracing::error!("All models in the fallback list exhausted");
        Err(LLMError::AllModelsExhausted)
    }

    /// Check the health of the underlying provider
    pub async fn check_health(&self) -> bool {
        self.provider.check_health().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::InferenceResponse;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// What a scripted model does when called
    enum Behavior {
        Reply(&'static str),
        Fail(fn() -> LLMError),
        Hang,
    }

    struct ScriptedProvider {
        behaviors: HashMap<&'static str, Behavior>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(behaviors: Vec<(&'static str, Behavior)>) -> Self {
            Self {
                behaviors: behaviors.into_iter().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            model: &str,
            _request: &InferenceRequest,
        ) -> Result<InferenceResponse, LLMError> {
            self.calls.lock().unwrap().push(model.to_string());
            match self.behaviors.get(model) {
                Some(Behavior::Reply(text)) => Ok(InferenceResponse::new(*text)),
                Some(Behavior::Fail(make)) => Err(make()),
                Some(Behavior::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(InferenceResponse::new("too late"))
                }
                None => Err(LLMError::ModelNotFound(model.to_string())),
            }
        }
    }

    fn router(provider: Arc<ScriptedProvider>, models: &[&str]) -> ModelRouter {
        ModelRouter::new(
            provider,
            models.iter().map(|m| m.to_string()).collect(),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_first_model_success() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ("a", Behavior::Reply("from a")),
            ("b", Behavior::Reply("from b")),
        ]));
        let router = router(Arc::clone(&provider), &["a", "b"]);

        let response = router.call(&InferenceRequest::text("hi")).await.unwrap();
        assert_eq!(response.text, "from a");
        assert_eq!(response.model, "a");
        assert_eq!(provider.calls(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_capacity_fault_advances_and_stops_after_success() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ("a", Behavior::Fail(|| LLMError::RateLimited("429".into()))),
            ("b", Behavior::Reply("from b")),
            ("c", Behavior::Reply("from c")),
        ]));
        let router = router(Arc::clone(&provider), &["a", "b", "c"]);

        let response = router.call(&InferenceRequest::text("hi")).await.unwrap();
        assert_eq!(response.text, "from b");
        assert_eq!(provider.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_non_retryable_fault_stops_immediately() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ("a", Behavior::Fail(|| LLMError::SafetyBlocked("SAFETY".into()))),
            ("b", Behavior::Reply("from b")),
        ]));
        let router = router(Arc::clone(&provider), &["a", "b"]);

        let result = router.call(&InferenceRequest::text("hi")).await;
        assert!(matches!(result, Err(LLMError::SafetyBlocked(_))));
        assert_eq!(provider.calls(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_all_transient_failures_exhaust_list() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ("a", Behavior::Fail(|| LLMError::Overloaded("503".into()))),
            ("b", Behavior::Fail(|| LLMError::RateLimited("429".into()))),
        ]));
        let router = router(Arc::clone(&provider), &["a", "b"]);

        let result = router.call(&InferenceRequest::text("hi")).await;
        assert!(matches!(result, Err(LLMError::AllModelsExhausted)));
        assert_eq!(provider.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_next_model() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ("slow", Behavior::Hang),
            ("fast", Behavior::Reply("quick answer")),
        ]));
        let router = router(Arc::clone(&provider), &["slow", "fast"]);

        let response = router.call(&InferenceRequest::text("hi")).await.unwrap();
        assert_eq!(response.model, "fast");
        assert_eq!(provider.calls(), vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn test_empty_model_list() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let router = router(provider, &[]);

        let result = router.call(&InferenceRequest::text("hi")).await;
        assert!(matches!(result, Err(LLMError::ProviderUnavailable(_))));
    }

    #[test]
    fn test_from_config() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let config = LLMConfig::default();
        let router = ModelRouter::from_config(provider, &config);

        assert_eq!(router.models(), config.fallback_models.as_slice());
        assert_eq!(router.call_timeout, Duration::from_secs(30));
        assert_eq!(router.provider_name(), "scripted");
    }
}
