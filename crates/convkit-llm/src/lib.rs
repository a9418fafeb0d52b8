//! convkit-llm
//!
//! Client for OpenAI-compatible Chat Completions endpoints
//! (`/v1/chat/completions`), implementing
//! [`LanguageModel`](convkit_core::traits::LanguageModel) with a single
//! non-streaming request per call.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use convkit_core::config::LlmConfig;
use convkit_core::traits::LanguageModel;
use convkit_core::types::{LlmMessage, Role};
use convkit_core::{Error, Result};

/// Requested shape of the completion text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Text,
    JsonObject,
}

/// Chat Completions client.
#[derive(Clone)]
pub struct OpenAiChat {
    http: reqwest::Client,
    settings: LlmConfig,
    response_format: ResponseFormat,
}

impl std::fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .field("temperature", &self.settings.temperature)
            .field("response_format", &self.response_format)
            .finish_non_exhaustive()
    }
}

impl OpenAiChat {
    #[must_use]
    pub fn new(settings: LlmConfig) -> Self {
        debug!(model = %settings.model, temperature = settings.temperature, "chat client configured");
        Self { http: reqwest::Client::new(), settings, response_format: ResponseFormat::Text }
    }

    /// Ask the endpoint for a JSON object reply (used for reranking and query expansion).
    #[must_use]
    pub fn with_response_format(mut self, response_format: ResponseFormat) -> Self {
        self.response_format = response_format;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.settings.temperature = temperature;
        self
    }

    fn url(&self) -> String {
        format!("{}/v1/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    /// Request body for `conversation`.
    pub fn request_body(&self, conversation: &[LlmMessage]) -> Value {
        let mut body = serde_json::json!({
            "model": self.settings.model,
            "messages": conversation,
            "temperature": self.settings.temperature,
            "response_format": self.response_format,
        });
        if let Some(seed) = self.settings.seed {
            body["seed"] = Value::from(seed);
        }
        body
    }
}

/// The clients a retrieval pipeline talks to, all built from one [`LlmConfig`].
///
/// Only `ranker` asks for `json_object` replies; the answer and utility
/// prompts expect plain text.
#[derive(Debug, Clone)]
pub struct ChatClients {
    pub answer: OpenAiChat,
    pub utility: OpenAiChat,
    pub ranker: OpenAiChat,
}

impl ChatClients {
    /// `None` when no API key is configured.
    pub fn from_config(settings: &LlmConfig) -> Option<Self> {
        settings.api_key.as_ref()?;
        let answer = OpenAiChat::new(settings.clone());
        Some(Self {
            utility: answer.clone().with_temperature(0.0),
            ranker: answer.clone().with_temperature(0.0).with_response_format(ResponseFormat::JsonObject),
            answer,
        })
    }
}

/// Extract the first choice of a Chat Completions response.
pub fn parse_completion(v: &Value) -> Result<LlmMessage> {
    let message = v
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| Error::Llm("response has no choices[0].message".into()))?;
    let role = match message.get("role") {
        Some(r) => serde_json::from_value::<Role>(r.clone())?,
        None => Role::Assistant,
    };
    let content = message.get("content").and_then(Value::as_str).unwrap_or_default().to_string();
    Ok(LlmMessage { role, content })
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn generate(&self, conversation: &[LlmMessage]) -> Result<LlmMessage> {
        let mut rb = self.http.post(self.url()).json(&self.request_body(conversation));
        if let Some(k) = &self.settings.api_key {
            rb = rb.bearer_auth(k);
        }

        let resp = rb
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::Llm(e.to_string()))?;
        let v: Value = resp.json().await.map_err(|e| Error::Llm(e.to_string()))?;

        if let Some(usage) = v.get("usage") {
            let model = v.get("model").and_then(Value::as_str).unwrap_or_default();
            debug!(model, %usage, "completion usage");
        }
        parse_completion(&v)
    }
}
