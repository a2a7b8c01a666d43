//! Conversational tutoring
//!
//! History formatting, prompt construction, attachments and the
//! orchestrator that ties them to the model router.

pub mod attachment;
pub mod history;
pub mod orchestrator;
pub mod prompt;

pub use attachment::Attachment;
pub use history::format_history;
pub use orchestrator::{ConversationOrchestrator, DEGRADED_REPLY};
pub use prompt::TutorProfile;
