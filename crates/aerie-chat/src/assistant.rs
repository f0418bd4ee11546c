//! Client for the AI completion relay.
//!
//! One request, one JSON response. Any transport or decode failure maps
//! to a fixed fallback reply; the conversation view never sees an error,
//! only text.

use serde::{Deserialize, Serialize};
use tracing::warn;

use aerie_shared::constants::DEFAULT_RELAY_PORT;

/// Shown when the relay cannot be reached or returns garbage.
pub const FALLBACK_REPLY: &str =
    "I'm having trouble processing your request. Please try again later.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct ChatReply {
    response: String,
}

/// HTTP client for the `/api/chat` endpoint.
pub struct AssistantClient {
    http: reqwest::Client,
    endpoint: String,
}

impl AssistantClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Points at the relay's default local address.
    pub fn local() -> Self {
        Self::new(format!("http://localhost:{DEFAULT_RELAY_PORT}/api/chat"))
    }

    /// Ask the assistant. Never fails: errors collapse into
    /// [`FALLBACK_REPLY`].
    ///
    /// A relay-side failure arrives as a 500 whose body still carries a
    /// `response` field, so the relay's own apology text is passed
    /// through rather than replaced.
    pub async fn ask(&self, input: &str) -> String {
        match self.request(input).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "assistant request failed");
                FALLBACK_REPLY.to_string()
            }
        }
    }

    async fn request(&self, input: &str) -> Result<String, reqwest::Error> {
        let reply: ChatReply = self
            .http
            .post(&self.endpoint)
            .json(&ChatRequest { input })
            .send()
            .await?
            .json()
            .await?;
        Ok(reply.response)
    }
}
