pub mod ollama;
pub mod openai;

use parentkb_core::config::LlmConfig;

use crate::provider::{LlmError, LlmProvider};

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// The human-readable part of an error body.
///
/// OpenAI and Groq send `{"error": {"message": ..}}`, Ollama sends
/// `{"error": ".."}`. Anything else is returned as is.
pub(crate) fn error_detail(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };
    let error = &value["error"];
    error["message"]
        .as_str()
        .or_else(|| error.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

/// Create the appropriate LLM provider based on config.
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    match config.provider.as_str() {
        "groq" | "openai" => {
            let api_key = config.api_key.as_ref().ok_or_else(|| {
                LlmError::NotConfigured(format!(
                    "{} not set",
                    config.credential_key().unwrap_or("API key")
                ))
            })?;
            let default_url = if config.provider == "groq" {
                GROQ_BASE_URL
            } else {
                OPENAI_BASE_URL
            };
            let base_url = config.base_url.as_deref().unwrap_or(default_url);
            Ok(Box::new(openai::OpenAiProvider::new(
                api_key.clone(),
                config.model.clone(),
                base_url.to_string(),
            )))
        }
        "ollama" => Ok(Box::new(ollama::OllamaProvider::new(
            config.base_url.as_deref().unwrap_or(OLLAMA_BASE_URL).to_string(),
            config.model.clone(),
        ))),
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider: '{}'",
            other
        ))),
    }
}
