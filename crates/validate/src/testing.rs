//! Fixed similarity results for tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::similarity::PropertySimilarity;

/// Returns preloaded candidates per `(node_type, property, value)`; unknown keys yield none.
#[derive(Default)]
pub struct StaticSimilarity {
    candidates: HashMap<(String, String, String), Vec<String>>,
    fail: bool,
}

impl StaticSimilarity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, node_type: &str, property: &str, value: &str, candidates: &[&str]) -> Self {
        self.candidates.insert(
            (node_type.to_string(), property.to_string(), value.to_string()),
            candidates.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    /// Every lookup errors, as if the database were unreachable.
    pub fn unavailable() -> Self {
        Self {
            candidates: HashMap::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl PropertySimilarity for StaticSimilarity {
    async fn find_similar(&self, node_type: &str, property: &str, value: &str) -> Result<Vec<String>> {
        if self.fail {
            anyhow::bail!("similarity service unavailable");
        }
        let key = (node_type.to_string(), property.to_string(), value.to_string());
        Ok(self.candidates.get(&key).cloned().unwrap_or_default())
    }
}
