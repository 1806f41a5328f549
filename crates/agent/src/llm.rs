use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use sentinel_core::config::{LlmConfig, LlmProvider};
use serde_json::{json, Value};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Single-shot text completion against one of the supported HTTP providers.
pub struct HttpLlmClient {
    http: Client,
    provider: LlmProvider,
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
}

impl HttpLlmClient {
    /// Returns `None` when the provider is disabled.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        let default_base = match config.provider {
            LlmProvider::Disabled => return Ok(None),
            LlmProvider::Gemini => GEMINI_BASE_URL,
            LlmProvider::OpenAi => OPENAI_BASE_URL,
            LlmProvider::Ollama => OLLAMA_BASE_URL,
        };

        if matches!(config.provider, LlmProvider::Gemini | LlmProvider::OpenAi)
            && config.api_key.is_none()
        {
            return Err(anyhow!("llm provider `{}` requires an api key", config.provider.as_str()));
        }

        // Per-request deadline lives with the caller; this only bounds a stuck socket.
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("failed to build llm http client")?;

        let base_url = config.base_url.as_deref().unwrap_or(default_base).trim_end_matches('/');

        Ok(Some(Self {
            http,
            provider: config.provider,
            api_key: config.api_key.clone(),
            base_url: base_url.to_string(),
            model: config.model.clone(),
        }))
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn endpoint(&self) -> String {
        match self.provider {
            LlmProvider::Gemini => {
                format!("{}/models/{}:generateContent", self.base_url, self.model)
            }
            LlmProvider::OpenAi => format!("{}/chat/completions", self.base_url),
            LlmProvider::Ollama | LlmProvider::Disabled => {
                format!("{}/api/generate", self.base_url)
            }
        }
    }

    pub fn request_body(&self, prompt: &str) -> Value {
        match self.provider {
            LlmProvider::Gemini => json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }),
            LlmProvider::OpenAi => json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }]
            }),
            LlmProvider::Ollama | LlmProvider::Disabled => json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false
            }),
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut request = self.http.post(self.endpoint()).json(&self.request_body(prompt));
        if let Some(api_key) = &self.api_key {
            request = match self.provider {
                LlmProvider::Gemini => request.header("x-goog-api-key", api_key.expose_secret()),
                _ => request.bearer_auth(api_key.expose_secret()),
            };
        }

        let response = request.send().await.context("llm request failed")?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "llm provider `{}` returned {}",
                self.provider.as_str(),
                response.status()
            ));
        }

        let body: Value = response.json().await.context("llm response was not json")?;
        extract_text(self.provider, &body).ok_or_else(|| {
            anyhow!("llm provider `{}` returned no completion text", self.provider.as_str())
        })
    }
}

/// Pulls the completion text out of a provider response body.
pub fn extract_text(provider: LlmProvider, body: &Value) -> Option<String> {
    let text = match provider {
        LlmProvider::Gemini => body
            .pointer("/candidates/0/content/parts")?
            .as_array()?
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        LlmProvider::OpenAi => body.pointer("/choices/0/message/content")?.as_str()?.to_string(),
        LlmProvider::Ollama => body.get("response")?.as_str()?.to_string(),
        LlmProvider::Disabled => return None,
    };

    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
