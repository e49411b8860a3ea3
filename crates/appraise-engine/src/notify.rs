//! Decision notifications.
//!
//! Renders the user-facing decision texts and pushes them through a
//! [`NotificationSink`]. The sink is fire-and-forget from the engine's
//! perspective: a failed notification is logged by the caller, never
//! retried, and never rolls back the persisted decision.

use std::sync::Arc;

use async_trait::async_trait;

use appraise_core::classify::{confidence_label, risk_label};
use appraise_core::outcome::Decision;

use crate::chat::{ChatApi, ChatError};

// ---------------------------------------------------------------------------
// NotificationSink
// ---------------------------------------------------------------------------

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, channel: &str, message: &str) -> Result<(), ChatError>;
}

/// Production sink: posts to a chat channel.
pub struct ChatNotifier {
    chat: Arc<ChatApi>,
}

impl ChatNotifier {
    pub fn new(chat: Arc<ChatApi>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl NotificationSink for ChatNotifier {
    async fn notify(&self, channel: &str, message: &str) -> Result<(), ChatError> {
        self.chat.post_message(channel, message).await
    }
}

// ---------------------------------------------------------------------------
// Message rendering
// ---------------------------------------------------------------------------

/// Reply posted when an initial or follow-up submission yields a decision.
/// Out-of-range scores render as "unknown" rather than failing the message
/// path.
pub fn decision_message(decision: &Decision) -> String {
    format!(
        "Thanks for your response! Based on this input, we've decided that this project is \
         *{}({})* with *{}({})*. {}.",
        risk_label(decision.risk),
        decision.risk,
        confidence_label(decision.confidence),
        decision.confidence,
        decision.justification
    )
}

/// Channel notification posted when reconciliation produces a new decision.
pub fn update_message(project_name: &str, decision: &Decision) -> String {
    format!(
        "Project {} has been updated and has a new decision:\n\n\
         This new decision for the project is that it is: *{}({})* with *{}({})*. {}.",
        project_name,
        risk_label(decision.risk),
        decision.risk,
        confidence_label(decision.confidence),
        decision.confidence,
        decision.justification
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(risk: i64, confidence: i64) -> Decision {
        Decision {
            risk,
            confidence,
            justification: "Scope is narrow and rollback is trivial".to_string(),
        }
    }

    #[test]
    fn decision_message_renders_bands_and_scores() {
        let message = decision_message(&decision(3, 8));
        assert_eq!(
            message,
            "Thanks for your response! Based on this input, we've decided that this project is \
             *low risk(3)* with *high confidence(8)*. Scope is narrow and rollback is trivial."
        );
    }

    #[test]
    fn update_message_leads_with_project_name() {
        let message = update_message("Foo", &decision(10, 1));
        assert!(message.starts_with("Project Foo has been updated"));
        assert!(message.contains("*critical risk(10)*"));
        assert!(message.contains("*extremely low confidence(1)*"));
    }

    #[test]
    fn out_of_range_scores_render_as_unknown() {
        let message = decision_message(&decision(42, 0));
        assert!(message.contains("*unknown(42)*"));
        assert!(message.contains("*unknown(0)*"));
    }
}
