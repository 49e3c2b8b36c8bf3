//! Deterministic language model for tests.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

use crate::llm::LanguageModel;

enum Reply {
    Text(String),
    Fail(String),
}

/// Answers each prompt with the first rule whose needle the prompt contains.
pub struct ScriptedModel {
    rules: Vec<(String, Reply)>,
    fallback: Reply,
    calls: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: Reply::Fail("no scripted reply".to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_when(mut self, needle: &str, reply: &str) -> Self {
        self.rules.push((needle.to_string(), Reply::Text(reply.to_string())));
        self
    }

    pub fn fail_when(mut self, needle: &str, message: &str) -> Self {
        self.rules.push((needle.to_string(), Reply::Fail(message.to_string())));
        self
    }

    pub fn otherwise(mut self, reply: &str) -> Self {
        self.fallback = Reply::Text(reply.to_string());
        self
    }

    /// Prompts received so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_containing(&self, needle: &str) -> usize {
        self.calls().iter().filter(|p| p.contains(needle)).count()
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.lock().unwrap().push(prompt.to_string());

        let reply = self.rules.iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply)
            .unwrap_or(&self.fallback);

        match reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(message) => anyhow::bail!("{}", message),
        }
    }
}
