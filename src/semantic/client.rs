//! Chat-completion transport for the semantic diff step.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// One user turn: prompt text followed by images as data URLs.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub text: String,
    pub image_urls: Vec<String>,
    pub max_tokens: u32,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion API returned no content")]
    Empty,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the raw text of the first choice.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiCompletionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiCompletionClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    fn payload(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut content = vec![json!({ "type": "text", "text": request.text })];
        content.extend(request.image_urls.iter().map(|url| {
            json!({
                "type": "image_url",
                "image_url": { "url": url }
            })
        }));

        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": content }],
            "max_tokens": request.max_tokens,
            "response_format": { "type": "json_object" }
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        debug!(endpoint = %self.endpoint, model = %self.model, "requesting semantic analysis");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.payload(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::Empty)
    }
}
