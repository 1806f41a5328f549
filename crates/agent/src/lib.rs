//! Generative reasoning collaborator for the pricing pipeline.
//!
//! The numeric pipeline in `sentinel-core` decides every price and verdict.
//! This crate only turns those computed fields into prose:
//! - `llm` - `LlmClient` and the HTTP client for Gemini, OpenAI and Ollama
//! - `prompts` - Tera templates for the explanation and chat prompts
//! - `guardrails` - bounds on what a completion may look like
//! - `analyst` - time-bounded explanation and chat with fixed fallbacks

pub mod analyst;
pub mod guardrails;
pub mod llm;
pub mod prompts;

pub use analyst::{AnalystService, ChatReply, ChatRequest, CHAT_FALLBACK};
pub use llm::{HttpLlmClient, LlmClient};
