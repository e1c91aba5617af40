//! Chat completion client abstraction and the HTTP implementation.
//!
//! [`HttpChatClient`] calls an OpenAI-style `/v1/chat/completions`
//! endpoint. Exactly one attempt per call, with a fixed timeout; failures
//! come back as typed [`ChatError`]s and the session layer decides how to
//! surface them.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::models::{Message, Role};

/// A `{role, content}` pair as sent over the wire.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl WireMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Issues chat completion requests against an external endpoint.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Complete the conversation, returning the assistant's reply text.
    async fn complete(
        &self,
        messages: &[WireMessage],
        max_tokens: u32,
    ) -> Result<String, ChatError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat client for OpenAI-style completion endpoints.
pub struct HttpChatClient {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpChatClient {
    /// Create a new client from configuration. Reads `OPENAI_API_KEY` from
    /// the environment once; optional for local endpoints.
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            model: config.model.clone(),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
        })
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn complete(
        &self,
        messages: &[WireMessage],
        max_tokens: u32,
    ) -> Result<String, ChatError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ChatError::Timeout
            } else {
                ChatError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status(status.as_u16()));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ChatError::MalformedResponse("missing content field".to_string()))
    }
}
