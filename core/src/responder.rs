//! Conversational text responder.
//!
//! `LlmResponder` talks to any OpenAI-compatible Chat Completions endpoint
//! (Groq by default). One instance is built at startup and shared by every
//! call; `reqwest::Client` pools connections and is safe to use concurrently.
//!
//! Env overrides:
//! - LLM_BASE_URL, LLM_MODEL, LLM_API_KEY (or GROQ_API_KEY)
//! - REQUEST_TIMEOUT_MS, LLM_TEMPERATURE

use crate::{CallflowError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error};

/// Recognition placeholder forwarded when the caller said nothing
pub const NO_INPUT: &str = "No input";

const NO_INPUT_REPLY: &str = "I didn't catch that, please say again.";

#[async_trait]
pub trait Responder: Send + Sync {
    /// Reply text for one caller utterance in the given language tag
    async fn reply(&self, text: &str, language: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct LlmResponderConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    pub temperature: f32,
}

impl Default for LlmResponderConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("LLM_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "https://api.groq.com/openai/v1".to_string()),
            model: std::env::var("LLM_MODEL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "llama-3.3-70b-versatile".to_string()),
            api_key: std::env::var("LLM_API_KEY")
                .or_else(|_| std::env::var("GROQ_API_KEY"))
                .ok()
                .filter(|s| !s.is_empty()),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(10_000),
            temperature: std::env::var("LLM_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(0.7),
        }
    }
}

pub fn system_prompt(language: &str) -> String {
    format!(
        "You are an expert Ayurvedic doctor. \
         You provide natural home remedies and traditional herbal solutions for common ailments \
         like cough, cold, indigestion, stress, and skin issues. \
         Avoid recommending modern medicine. \
         Focus on lifestyle tips, dietary suggestions, and ancient Indian health practices. \
         Give very short (1 sentence max), practical responses with remedies first, in plain text \
         without any symbols. \
         Respond in the same language in which the question is asked. \
         User selected language is {language}. \
         Only answer questions about Ayurveda; politely refuse anything else."
    )
}

#[derive(Clone)]
pub struct LlmResponder {
    http: Client,
    cfg: LlmResponderConfig,
}

impl LlmResponder {
    pub fn new(cfg: LlmResponderConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| CallflowError::Responder(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, cfg })
    }
}

#[async_trait]
impl Responder for LlmResponder {
    async fn reply(&self, text: &str, language: &str) -> Result<String> {
        if text.trim().is_empty() || text == NO_INPUT {
            return Ok(NO_INPUT_REPLY.to_string());
        }

        let chat_url = format!(
            "{}/chat/completions",
            self.cfg.base_url.trim_end_matches('/')
        );
        debug!(target = "llm_client", "POST {} via Chat Completions", chat_url);

        let mut req = self
            .http
            .post(&chat_url)
            .header("content-type", "application/json");
        if let Some(key) = &self.cfg.api_key {
            req = req.bearer_auth(key);
        }

        let body = json!({
            "model": self.cfg.model,
            "messages": [
                {"role": "system", "content": system_prompt(language)},
                {"role": "user", "content": text},
            ],
            "max_tokens": 128,
            "temperature": self.cfg.temperature,
        });

        let resp = req
            .json(&body)
            .send()
            .await
            .map_err(|e| CallflowError::Responder(format!("Chat Completions HTTP error: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(target = "llm_client", %status, body = %text, "Chat Completions error");
            return Err(CallflowError::Responder(format!(
                "Chat Completions error: status={} body={}",
                status, text
            )));
        }

        let val: serde_json::Value = resp.json().await.map_err(|e| {
            CallflowError::Responder(format!("Failed to parse Chat Completions JSON: {e}"))
        })?;
        let reply = extract_text_from_chat_completions(&val).ok_or_else(|| {
            CallflowError::Responder("Missing choices[0].message.content in chat completions".into())
        })?;
        Ok(reply.trim().to_string())
    }
}

fn extract_text_from_chat_completions(v: &serde_json::Value) -> Option<String> {
    v.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
}
