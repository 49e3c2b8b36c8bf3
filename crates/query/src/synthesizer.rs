use anyhow::{Context, Result};
use extract::{Document, LanguageModel};
use std::sync::Arc;
use tracing::info;

use crate::envelope::GraphResponse;

/// Writes prose from knowledge graph results.
pub struct AnswerSynthesizer {
    llm: Arc<dyn LanguageModel>,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    pub async fn answer_from_graph(
        &self,
        query: &str,
        document: &Document,
        graph: &GraphResponse,
    ) -> Result<String> {
        let json_query = serde_json::to_string_pretty(document)?;
        let kg_response = serde_json::to_string_pretty(graph)?;

        let prompt = format!(
            r#"Answer the question using the knowledge graph response below.

QUESTION: {query}

JSON QUERY SENT TO THE KNOWLEDGE GRAPH:
{json_query}

KNOWLEDGE GRAPH RESPONSE:
{kg_response}

INSTRUCTIONS:
- Address the question directly
- Use only information from the knowledge graph response
- If the response doesn't fully answer the question, say so clearly
- Use bullet points or numbered lists where they help
- Never expose error messages
- When a node has both an id and a name, show both
- Keep the answer concise

ANSWER:"#
        );

        let answer = self.llm
            .generate(&prompt)
            .await
            .context("Failed to provide final response")?;

        info!(chars = answer.len(), "Synthesized knowledge graph answer");
        Ok(answer)
    }

    /// Plain-language reading of the connections in the query document
    pub async fn explain_reasoning(&self, query: &str, document: &Document) -> Result<String> {
        let json_query = serde_json::to_string_pretty(document)?;

        let prompt = format!(
            r#"Explain how the question was mapped onto the graph query below.

QUESTION: {query}

CONSTRUCTED JSON:
{json_query}

RULES:
- Describe the connections as a readable path
- Only the connections matter, don't explain the nodes

EXPLANATION:"#
        );

        self.llm
            .generate(&prompt)
            .await
            .context("Failed to provide reasoning response")
    }
}
