use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sentinel_agent::{AnalystService, ChatRequest, LlmClient, CHAT_FALLBACK};
use sentinel_core::pricing::AuditStatus;
use sentinel_core::{CostRegime, Explainer, ExplanationSummary, FALLBACK_EXPLANATION};

#[derive(Default)]
struct RecordingClient {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl LlmClient for RecordingClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().expect("prompt log").push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

struct FailingClient;

#[async_trait]
impl LlmClient for FailingClient {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(anyhow!("upstream returned 503"))
    }
}

struct SlowClient;

#[async_trait]
impl LlmClient for SlowClient {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("too late".to_string())
    }
}

fn summary() -> ExplanationSummary {
    ExplanationSummary {
        item: "BETIK BIASA".to_string(),
        region: "Kelantan".to_string(),
        fair_price: 3.9,
        currency_now: 4.47,
        fuel_now: 3.35,
        regime: CostRegime::Up,
        audit_status: AuditStatus::Safe,
        gap_sen: -5.0,
        is_controlled: false,
    }
}

fn service(client: Arc<dyn LlmClient>) -> AnalystService {
    AnalystService::new(Some(client), Duration::from_millis(200)).expect("analyst service")
}

#[tokio::test]
async fn explanation_uses_rendered_prompt_and_trimmed_completion() {
    let client = Arc::new(RecordingClient {
        reply: "  Papaya is steady. Lagged USD is flat. Extra sentence. ".to_string(),
        ..RecordingClient::default()
    });
    let analyst = service(client.clone());

    let text = analyst.explain(&summary()).await;

    assert_eq!(text, "Papaya is steady. Lagged USD is flat.");
    let prompts = client.prompts.lock().expect("prompt log");
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("Explain RM 3.90 price for BETIK BIASA in Kelantan."));
}

#[tokio::test]
async fn explanation_falls_back_on_collaborator_error() {
    let analyst = service(Arc::new(FailingClient));
    assert_eq!(analyst.explain(&summary()).await, FALLBACK_EXPLANATION);
}

#[tokio::test]
async fn explanation_falls_back_on_timeout() {
    let analyst = service(Arc::new(SlowClient));
    assert_eq!(analyst.explain(&summary()).await, FALLBACK_EXPLANATION);
}

#[tokio::test]
async fn disabled_collaborator_answers_with_fallbacks() {
    let analyst = AnalystService::new(None, Duration::from_secs(1)).expect("analyst service");
    let request = ChatRequest {
        user_query: "Is this fair?".to_string(),
        current_prediction: 9.8,
        item: "AYAM BERSIH - STANDARD".to_string(),
    };

    assert!(!analyst.is_enabled());
    assert_eq!(analyst.explain(&summary()).await, FALLBACK_EXPLANATION);
    assert_eq!(analyst.chat(&request).await.reply, CHAT_FALLBACK);
}

#[tokio::test]
async fn chat_returns_completion_or_apology() {
    let request = ChatRequest {
        user_query: "Why did chicken go up?".to_string(),
        current_prediction: 9.8,
        item: "AYAM BERSIH - STANDARD".to_string(),
    };

    let working = service(Arc::new(RecordingClient {
        reply: "Feed imports got pricier.".to_string(),
        ..RecordingClient::default()
    }));
    let empty = service(Arc::new(RecordingClient::default()));
    let failing = service(Arc::new(FailingClient));

    assert_eq!(working.chat(&request).await.reply, "Feed imports got pricier.");
    assert_eq!(empty.chat(&request).await.reply, CHAT_FALLBACK);
    assert_eq!(failing.chat(&request).await.reply, CHAT_FALLBACK);
}
