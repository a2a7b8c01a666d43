//! Gemini LLM Provider
//!
//! Implements `LLMProvider` against the Gemini `generateContent` endpoint.
//! Conversation parts are sent in Gemini's own part format (`text` /
//! `inlineData`), so whiteboard images travel inline next to the prompt.
//!
//! HTTP and body-level faults are mapped onto `LLMError` so the router can
//! classify them without looking at message text.

use super::{InferenceRequest, InferenceResponse, LLMError, LLMProvider, ResponseFormat};
use crate::config::GeminiConfig;
use crate::secrets::{SecretCache, SecretManager};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Secret key holding the Gemini API key
pub const GEMINI_API_KEY: &str = "gemini_api_key";

pub struct GeminiProvider {
    config: GeminiConfig,
    secret_cache: Arc<SecretCache>,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig, secret_cache: Arc<SecretCache>) -> Self {
        Self {
            config,
            secret_cache,
            client: reqwest::Client::new(),
        }
    }

    /// Build the `generateContent` payload
    fn build_payload(&self, request: &InferenceRequest) -> Value {
        let contents: Vec<Value> = request
            .contents()
            .iter()
            .map(|turn| json!({ "role": turn.role, "parts": turn.parts }))
            .collect();

        let mut payload = serde_json::Map::new();
        payload.insert("contents".to_string(), json!(contents));

        if let Some(instruction) = &request.system_instruction {
            payload.insert(
                "systemInstruction".to_string(),
                json!({ "parts": [{ "text": instruction }] }),
            );
        }

        if request.response_format == ResponseFormat::Json {
            payload.insert(
                "generationConfig".to_string(),
                json!({ "responseMimeType": "application/json" }),
            );
        }

        Value::Object(payload)
    }
}

/// Map a non-success HTTP status and body onto an `LLMError`
fn classify_http_error(status: u16, body: &str) -> LLMError {
    let body_status = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("status"))
                .and_then(|s| s.as_str())
                .map(str::to_string)
        })
        .unwrap_or_default();

    match (status, body_status.as_str()) {
        (429, _) | (_, "RESOURCE_EXHAUSTED") => LLMError::RateLimited(body.to_string()),
        (503, _) | (_, "UNAVAILABLE") => LLMError::Overloaded(body.to_string()),
        (504, _) | (_, "DEADLINE_EXCEEDED") => {
            LLMError::Overloaded(format!("Gateway timeout: {}", body))
        }
        (401, _) | (403, _) => LLMError::AuthenticationFailed(body.to_string()),
        (404, _) => LLMError::ModelNotFound(body.to_string()),
        (400, _) => LLMError::InvalidRequest(body.to_string()),
        _ => LLMError::ProviderUnavailable(format!("Gemini API error ({}): {}", status, body)),
    }
}

/// Pull the reply text out of a successful response body
fn extract_text(data: &Value) -> Result<String, LLMError> {
    if let Some(reason) = data
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(|r| r.as_str())
    {
        return Err(LLMError::SafetyBlocked(reason.to_string()));
    }

    let candidate = data
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| LLMError::ParseError("No candidates in response".to_string()))?;

    let finish_reason = candidate
        .get("finishReason")
        .and_then(|r| r.as_str())
        .unwrap_or_default();
    if matches!(finish_reason, "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST") {
        return Err(LLMError::SafetyBlocked(finish_reason.to_string()));
    }

    let parts = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or(LLMError::EmptyResponse)?;

    let mut full_text = String::new();
    for part in parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            full_text.push_str(text);
        }
    }

    if full_text.trim().is_empty() {
        return Err(LLMError::EmptyResponse);
    }

    Ok(full_text)
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn check_health(&self) -> bool {
        self.secret_cache.get_secret(GEMINI_API_KEY).is_ok()
    }

    async fn generate(
        &self,
        model: &str,
        request: &InferenceRequest,
    ) -> super::Result<InferenceResponse> {
        let api_key = self
            .secret_cache
            .get_secret(GEMINI_API_KEY)
            .map_err(|e| LLMError::AuthenticationFailed(e.to_string()))?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", api_key.expose())
            .json(&self.build_payload(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Overloaded(format!("Request timed out: {}", e))
                } else {
                    LLMError::NetworkError(SecretManager::scrub_text(&e.to_string()))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let error = classify_http_error(status, &SecretManager::scrub_text(&text));
            tracing::debug!("Gemini model {} returned {}: {}", model, status, error);
            return Err(error);
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        extract_text(&data).map(InferenceResponse::new)
    }
}
