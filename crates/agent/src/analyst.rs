use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sentinel_core::config::LlmConfig;
use sentinel_core::{Explainer, ExplanationSummary, FALLBACK_EXPLANATION};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::guardrails::{GuardrailDecision, ResponseGuardrail};
use crate::llm::{HttpLlmClient, LlmClient};
use crate::prompts::PromptRenderer;

pub const CHAT_FALLBACK: &str =
    "Sorry, the analyst is unavailable right now. Please try again in a moment.";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_query: String,
    pub current_prediction: f64,
    pub item: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

/// Time-bounded access to the reasoning collaborator. Every failure path
/// degrades to a fixed string; callers never see an error.
pub struct AnalystService {
    client: Option<Arc<dyn LlmClient>>,
    prompts: PromptRenderer,
    timeout: Duration,
}

impl AnalystService {
    pub fn new(client: Option<Arc<dyn LlmClient>>, timeout: Duration) -> Result<Self> {
        Ok(Self { client, prompts: PromptRenderer::new()?, timeout })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = HttpLlmClient::from_config(config)?
            .map(|client| Arc::new(client) as Arc<dyn LlmClient>);
        Self::new(client, Duration::from_secs(config.timeout_secs))
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub async fn chat(&self, request: &ChatRequest) -> ChatReply {
        let prompt =
            match self.prompts.chat(&request.user_query, request.current_prediction, &request.item)
            {
                Ok(prompt) => prompt,
                Err(error) => {
                    warn!(event_name = "sentinel.agent.prompt_failed", purpose = "chat", error = %error);
                    return ChatReply { reply: CHAT_FALLBACK.to_string() };
                }
            };

        let reply = self
            .complete_bounded(&prompt, "chat", &ResponseGuardrail::chat())
            .await
            .unwrap_or_else(|| CHAT_FALLBACK.to_string());
        ChatReply { reply }
    }

    async fn complete_bounded(
        &self,
        prompt: &str,
        purpose: &'static str,
        guardrail: &ResponseGuardrail,
    ) -> Option<String> {
        let client = self.client.as_ref()?;

        let raw = match tokio::time::timeout(self.timeout, client.complete(prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(error)) => {
                warn!(event_name = "sentinel.agent.completion_failed", purpose, error = %error);
                return None;
            }
            Err(_) => {
                warn!(
                    event_name = "sentinel.agent.completion_timed_out",
                    purpose,
                    timeout_ms = self.timeout.as_millis() as u64
                );
                return None;
            }
        };

        match guardrail.evaluate(&raw) {
            GuardrailDecision::Allow(text) => Some(text),
            GuardrailDecision::Degrade { reason_code } => {
                debug!(event_name = "sentinel.agent.completion_degraded", purpose, reason_code);
                None
            }
        }
    }
}

#[async_trait]
impl Explainer for AnalystService {
    async fn explain(&self, summary: &ExplanationSummary) -> String {
        let prompt = match self.prompts.explanation(summary) {
            Ok(prompt) => prompt,
            Err(error) => {
                warn!(event_name = "sentinel.agent.prompt_failed", purpose = "explanation", error = %error);
                return FALLBACK_EXPLANATION.to_string();
            }
        };

        self.complete_bounded(&prompt, "explanation", &ResponseGuardrail::explanation())
            .await
            .unwrap_or_else(|| FALLBACK_EXPLANATION.to_string())
    }
}
