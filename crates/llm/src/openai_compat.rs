//! OpenAI-compatible chat-completions client
//!
//! Defaults to Gemini's OpenAI-compatible endpoint; any other compatible
//! base URL (OpenAI, OpenRouter, vLLM) works the same way.

use crate::*;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, trace};

pub const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub struct OpenAiCompatBackend {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
}

impl OpenAiCompatBackend {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        let api_base = api_base
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| GEMINI_OPENAI_BASE.to_string());

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            default_model: default_model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    fn build_request(&self, params: &ChatParams) -> serde_json::Value {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        let messages: Vec<serde_json::Value> = params
            .messages
            .iter()
            .map(|m| json!({ "role": &m.role, "content": &m.content }))
            .collect();

        json!({
            "model": model,
            "messages": messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        })
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ChatResponse> {
        let choice = json["choices"].get(0).ok_or(LlmError::InvalidResponse)?;
        let content = choice["message"]["content"].as_str().map(|s| s.to_string());
        let finish_reason = choice["finish_reason"]
            .as_str()
            .unwrap_or("stop")
            .to_string();

        let usage = if let Some(usage) = json["usage"].as_object() {
            let field = |name: &str| usage.get(name).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            Usage {
                prompt_tokens: field("prompt_tokens"),
                completion_tokens: field("completion_tokens"),
                total_tokens: field("total_tokens"),
            }
        } else {
            Usage::default()
        };

        Ok(ChatResponse {
            content,
            finish_reason,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl CompletionBackend for OpenAiCompatBackend {
    async fn complete(&self, params: ChatParams) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(LlmError::NoApiKey);
        }
        trace!("◆ COMPLETION REQUEST TO {}", self.api_base);

        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request(&params);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited);
        }

        let text = response.text().await?;

        if !status.is_success() {
            // Gateways answer with HTML or plain text as often as JSON
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|json| json["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| {
                    let body = text.trim();
                    if body.is_empty() {
                        status.to_string()
                    } else {
                        format!("{}: {}", status, body.chars().take(200).collect::<String>())
                    }
                });
            return Err(LlmError::Api(message));
        }

        let json: serde_json::Value = serde_json::from_str(&text)?;

        let parsed = self.parse_response(json)?;
        debug!(
            "◆ COMPLETION DONE: {} TOKENS, FINISH={}",
            parsed.usage.total_tokens, parsed.finish_reason
        );
        Ok(parsed)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
