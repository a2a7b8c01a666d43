//! Conversation Orchestrator
//!
//! Turns a student prompt, an optional attachment and the caller's history
//! into one tutor reply. Inference faults never reach the caller: when every
//! fallback model fails, or a non-retryable fault stops the loop, the reply
//! is [`DEGRADED_REPLY`].
//!
//! The orchestrator holds no conversation state. History arrives with every
//! call and persisting the new turn is the caller's job.

use super::attachment::Attachment;
use super::history::format_history;
use super::prompt::{document_prompt, grounded_prompt, TutorProfile};
use crate::llm::router::ModelRouter;
use crate::llm::InferenceRequest;
use crate::search::{format_context, SearchProvider};
use sdk::{ContentPart, ConversationTurn};
use std::sync::Arc;

/// Reply returned when no model could answer
pub const DEGRADED_REPLY: &str =
    "I'm sorry, I'm having trouble answering right now. Please try again in a moment.";

pub struct ConversationOrchestrator {
    router: Arc<ModelRouter>,
    search: Arc<dyn SearchProvider>,
    profile: TutorProfile,
}

impl ConversationOrchestrator {
    pub fn new(
        router: Arc<ModelRouter>,
        search: Arc<dyn SearchProvider>,
        profile: TutorProfile,
    ) -> Self {
        Self {
            router,
            search,
            profile,
        }
    }

    pub fn profile(&self) -> &TutorProfile {
        &self.profile
    }

    /// Produce the tutor's reply for one turn.
    ///
    /// - Image attachments travel inline next to the prompt, with history.
    /// - Documents are supplied in full without history or search.
    /// - Text-only turns are grounded with search snippets when available.
    pub async fn take_turn(
        &self,
        prompt: &str,
        attachment: Option<&Attachment>,
        history: &[ConversationTurn],
    ) -> String {
        let request = match attachment {
            Some(doc @ Attachment::Document { .. }) => self.document_request(prompt, doc),
            Some(image) => self.image_request(prompt, image, history),
            None => {
                if prompt.trim().is_empty() {
                    tracing::warn!("Empty prompt without attachment, not calling the model");
                    return DEGRADED_REPLY.to_string();
                }
                self.text_request(prompt, history).await
            }
        };

        match self.router.call(&request).await {
            Ok(response) => {
                tracing::info!(
                    "Tutor reply from {} ({} chars)",
                    response.model,
                    response.text.len()
                );
                response.text
            }
            Err(e) => {
                tracing::error!(
                    "Tutor turn degraded after {:?} fault: {}",
                    e.class(),
                    e
                );
                DEGRADED_REPLY.to_string()
            }
        }
    }

    async fn text_request(&self, prompt: &str, history: &[ConversationTurn]) -> InferenceRequest {
        let context = match self.search.query(prompt, &self.profile.subject).await {
            Ok(results) => format_context(&results),
            Err(e) => {
                tracing::warn!("Search augmentation failed, continuing ungrounded: {}", e);
                None
            }
        };

        InferenceRequest::text(grounded_prompt(context.as_deref(), prompt))
            .with_system_instruction(self.profile.system_instruction())
            .with_history(format_history(history))
    }

    fn image_request(
        &self,
        prompt: &str,
        image: &Attachment,
        history: &[ConversationTurn],
    ) -> InferenceRequest {
        let mut parts = Vec::with_capacity(2);
        if !prompt.trim().is_empty() {
            parts.push(ContentPart::text(prompt));
        }
        parts.push(image.to_part());

        InferenceRequest::new(parts)
            .with_system_instruction(self.profile.system_instruction())
            .with_history(format_history(history))
    }

    fn document_request(&self, prompt: &str, document: &Attachment) -> InferenceRequest {
        InferenceRequest::new(vec![
            document.to_part(),
            ContentPart::text(document_prompt(prompt)),
        ])
        .with_system_instruction(self.profile.system_instruction())
    }
}
