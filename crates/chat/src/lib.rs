//! The conversational pipeline for AgriSense.
//!
//! A request flows through five stages: read the sensor snapshot, load the
//! trimmed history, compose the prompt, dispatch it to the completion
//! provider, and record the exchange. Each request is independent — the
//! only shared state is the store handle.

pub mod composer;
pub mod dispatcher;
pub mod images;

pub use dispatcher::{CompletionClient, CompletionOutcome, FAILED_REPLY, NO_RESPONSE_REPLY};
pub use images::ImageSearchClient;

use agrisense_store::Store;
use std::sync::Arc;
use tracing::{error, warn};

/// How many history messages ground each request.
pub const MAX_HISTORY_MESSAGES: i64 = 10;

/// The context-assembly and response pipeline.
pub struct ChatPipeline {
    store: Arc<Store>,
    completions: CompletionClient,
}

impl ChatPipeline {
    pub fn new(store: Arc<Store>, completions: CompletionClient) -> Self {
        Self { store, completions }
    }

    /// Answer one user message, optionally inside a conversation.
    ///
    /// Always produces a reply string — provider failures surface as the
    /// fixed sentinel replies, and persistence failures are logged without
    /// masking the computed reply.
    pub async fn respond(&self, user_message: &str, conversation_id: Option<&str>) -> String {
        // Grounding context: a failed or empty read degrades the prompt,
        // it does not fail the request.
        let snapshot = match self.store.sensor_snapshot().await {
            Ok(readings) => readings,
            Err(e) => {
                warn!(error = %e, "Sensor snapshot unavailable, continuing without it");
                Vec::new()
            }
        };

        let history = match conversation_id {
            Some(id) => match self.store.recent_history(id, MAX_HISTORY_MESSAGES).await {
                Ok(messages) => messages,
                Err(e) => {
                    warn!(error = %e, "History unavailable, continuing without it");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let prompt = composer::compose(&snapshot, &history, user_message);
        let reply = self.completions.complete(&prompt).await.into_reply();

        if let Some(id) = conversation_id {
            self.record_exchange(id, user_message, &reply).await;
        }

        reply
    }

    /// Append the exchange and bump the conversation's activity timestamp.
    ///
    /// Both calls are best-effort: a persistence failure must not mask a
    /// reply that was already computed. The two calls are deliberately not
    /// wrapped in a transaction.
    async fn record_exchange(&self, conversation_id: &str, user_message: &str, reply: &str) {
        if let Err(e) = self
            .store
            .insert_exchange(conversation_id, user_message, reply)
            .await
        {
            error!(error = %e, conversation_id, "Failed to record exchange");
            return;
        }

        if let Err(e) = self.store.touch_conversation(conversation_id).await {
            error!(error = %e, conversation_id, "Failed to update conversation activity");
        }
    }
}
