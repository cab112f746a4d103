//! Completion dispatch.
//!
//! One synchronous call per request to an OpenAI-compatible
//! `/chat/completions` endpoint with bearer auth and a hard 15 s timeout.
//! Every provider-side failure is converted to a `CompletionOutcome` here —
//! nothing provider-related ever propagates past this module. The HTTP
//! layer always answers 200 with some reply text, so the outcome maps to a
//! fixed sentinel string whenever there is no usable completion.

use agrisense_core::{ChatMessage, ProviderError};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

/// Upper bound on the provider call.
pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(15);

/// Sentinel reply when the provider answered but sent nothing usable.
pub const NO_RESPONSE_REPLY: &str = "No response received.";

/// Sentinel reply when the provider call itself failed.
pub const FAILED_REPLY: &str = "Failed to get AI response. Try again later.";

/// What actually happened on the wire. Internal consumers can tell the
/// cases apart; `into_reply` collapses them to the fixed user-facing
/// strings.
#[derive(Debug)]
pub enum CompletionOutcome {
    /// The provider returned reply text.
    Reply(String),
    /// 2xx response, but no choice content.
    NoContent,
    /// 2xx response whose body did not parse.
    Malformed(String),
    /// Network failure, timeout, or non-2xx status.
    Failed(ProviderError),
}

impl CompletionOutcome {
    /// Collapse the outcome to the reply string the user sees.
    pub fn into_reply(self) -> String {
        match self {
            CompletionOutcome::Reply(text) => text,
            CompletionOutcome::NoContent => NO_RESPONSE_REPLY.into(),
            CompletionOutcome::Malformed(reason) => {
                error!(reason = %reason, "Provider response was malformed");
                NO_RESPONSE_REPLY.into()
            }
            CompletionOutcome::Failed(e) => {
                error!(error = %e, "Completion request failed");
                FAILED_REPLY.into()
            }
        }
    }
}

/// Client for the chat-completion provider.
pub struct CompletionClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl CompletionClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(COMPLETION_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    /// Dispatch the composed prompt. Never returns an error — every failure
    /// mode is folded into the outcome.
    pub async fn complete(&self, messages: &[ChatMessage]) -> CompletionOutcome {
        let url = format!("{}/chat/completions", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        debug!(model = %self.model, messages = messages.len(), "Sending completion request");

        let response = match self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return CompletionOutcome::Failed(ProviderError::Timeout(e.to_string()));
            }
            Err(e) => {
                return CompletionOutcome::Failed(ProviderError::Network(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let message = response.text().await.unwrap_or_default();
            return CompletionOutcome::Failed(ProviderError::ApiError {
                status_code: status,
                message,
            });
        }

        let api_response: ApiResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => return CompletionOutcome::Malformed(e.to_string()),
        };

        match api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
        {
            Some(content) => CompletionOutcome::Reply(content),
            None => CompletionOutcome::NoContent,
        }
    }
}

// --- Provider API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}
