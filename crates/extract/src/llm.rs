use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

use crate::prompt;

/// Text-generation backend used by every pipeline stage.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate and decode a JSON object from the model's reply.
    async fn generate_json(&self, prompt: &str) -> Result<serde_json::Value> {
        let response = self.generate(prompt).await?;
        parse_json_response(&response)
    }
}

#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>, // "json" for structured output
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(base_url: String, model: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Ollama HTTP client")?;
        Ok(Self {
            base_url,
            model,
            client,
        })
    }

    async fn send(&self, prompt: &str, format: Option<&str>) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            format: format.map(str::to_string),
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            anyhow::bail!("Ollama request failed: {}", response.status());
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(ollama_response.response)
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.send(prompt, None).await
    }

    async fn generate_json(&self, prompt: &str) -> Result<serde_json::Value> {
        let response = self.send(prompt, Some("json")).await?;
        parse_json_response(&response)
    }
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("fence pattern is valid")
    })
}

/// Decode the JSON object in a model reply.
///
/// Accepts bare JSON, JSON inside a markdown code fence, or JSON surrounded by
/// prose (the outermost `{ ... }` span is tried last).
pub fn parse_json_response(text: &str) -> Result<serde_json::Value> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return Ok(value);
    }

    if let Some(captures) = fence_regex().captures(trimmed) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&captures[1]) {
            return Ok(value);
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    anyhow::bail!("Model reply is not valid JSON: {}", truncate(trimmed, 200))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Generate with retry for invalid JSON
pub async fn generate_json_with_retry(
    llm: &dyn LanguageModel,
    prompt: &str,
    max_retries: usize,
) -> Result<serde_json::Value> {
    let attempts = max_retries.max(1);

    for attempt in 0..attempts {
        let response = llm.generate(prompt).await?;

        match parse_json_response(&response) {
            Ok(value) => return Ok(value),
            Err(e) => debug!(attempt = attempt + 1, error = %e, "Model returned invalid JSON"),
        }

        // If invalid, retry with correction prompt
        if attempt < attempts - 1 {
            let corrected = llm.generate(&prompt::build_retry_prompt(&response)).await?;
            if let Ok(value) = parse_json_response(&corrected) {
                return Ok(value);
            }
        }
    }

    warn!(attempts, "Giving up on JSON generation");
    anyhow::bail!("Failed to get valid JSON after {} retries", attempts)
}
