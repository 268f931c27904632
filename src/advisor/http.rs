//! HTTP advisor backend for OpenAI-compatible chat completions endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::prompt::SYSTEM_PROMPT;
use super::{AdvisorError, AdvisorPrompt, TacticalAdvisor};
use crate::config::AdvisorConfig;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatRequest<'a> {
    /// System persona followed by the prompt as the user turn
    fn new(model: &'a str, temperature: f32, prompt: &'a AdvisorPrompt) -> Self {
        Self {
            model,
            max_tokens: prompt.max_tokens,
            temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.text,
                },
            ],
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Advisor backed by a remote chat completions API
#[derive(Clone)]
pub struct HttpAdvisor {
    http: reqwest::Client,
    api_url: String,
    model: String,
    temperature: f32,
    timeout: Duration,
    api_key: Option<String>,
}

impl HttpAdvisor {
    /// Build from config. The API key is read once from the configured
    /// environment variable; without one the advisor reports `NotConfigured`.
    pub fn from_config(config: &AdvisorConfig) -> Result<Self, AdvisorError> {
        let timeout = config.timeout();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdvisorError::Http(e.to_string()))?;

        let api_key = config.api_key();
        if api_key.is_some() {
            info!(model = %config.model, "Tactical advisor enabled");
        } else {
            warn!(env = %config.api_key_env, "No advisor API key set, enrichment disabled");
        }

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TacticalAdvisor for HttpAdvisor {
    async fn generate(&self, prompt: &AdvisorPrompt) -> Result<String, AdvisorError> {
        let api_key = self.api_key.as_deref().ok_or(AdvisorError::NotConfigured)?;

        let body = ChatRequest::new(&self.model, self.temperature, prompt);

        let resp = self
            .http
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AdvisorError::Status(status.as_u16()));
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| self.transport_error(e))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AdvisorError::EmptyResponse)
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

impl HttpAdvisor {
    fn transport_error(&self, err: reqwest::Error) -> AdvisorError {
        if err.is_timeout() {
            AdvisorError::Timeout(self.timeout)
        } else if err.is_decode() {
            AdvisorError::Malformed(err.to_string())
        } else {
            AdvisorError::Http(err.to_string())
        }
    }
}
