//! Local chat through Ollama's `POST /api/chat` with streaming off.
//! `max_tokens` maps to `options.num_predict`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error_detail;
use crate::provider::{LlmError, LlmProvider, Message};

pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ReplyMessage>,
    done_reason: Option<String>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: String,
}

fn reply_text(resp: ChatResponse) -> Result<String, LlmError> {
    if resp.done_reason.as_deref() == Some("length") {
        warn!("Ollama stopped at num_predict; answer is truncated");
    }
    resp.message
        .map(|m| m.content)
        .ok_or_else(|| LlmError::ParseError("missing message.content".into()))
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.url);
        let request = ChatRequest {
            model: &self.model,
            messages: &messages,
            stream: false,
            options: ChatOptions {
                temperature,
                num_predict: max_tokens,
            },
        };

        debug!(model = %self.model, "Ollama request to {}", url);

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status,
                body: error_detail(&body),
            });
        }

        let resp: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;
        reply_text(resp)
    }
}
