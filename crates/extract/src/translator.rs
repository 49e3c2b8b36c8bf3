use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::llm::{self, LanguageModel};
use crate::prompt;
use crate::schema::Document;

/// Turns a natural-language question into a draft `Document` in two model calls.
pub struct Translator {
    llm: Arc<dyn LanguageModel>,
    schema: Arc<str>,
    json_retries: usize,
}

impl Translator {
    pub fn new(llm: Arc<dyn LanguageModel>, schema: Arc<str>) -> Self {
        Self {
            llm,
            schema,
            json_retries: 3,
        }
    }

    pub fn with_json_retries(mut self, json_retries: usize) -> Self {
        self.json_retries = json_retries;
        self
    }

    /// Free-text list of the nodes, properties and relationships the question needs
    pub async fn extract_relevant_information(&self, query: &str) -> Result<String> {
        info!("Extracting relevant information from the query");
        let prompt = prompt::build_extraction_prompt(&self.schema, query);

        let extracted = self.llm
            .generate(&prompt)
            .await
            .context("Failed to extract relevant information")?;

        debug!(extracted = %extracted, "Extracted information");
        Ok(extracted)
    }

    pub async fn convert_to_document(&self, extracted: &str, query: &str) -> Result<Document> {
        info!("Converting relevant information to a query document");
        let prompt = prompt::build_conversion_prompt(&self.schema, query, extracted);

        let value = llm::generate_json_with_retry(self.llm.as_ref(), &prompt, self.json_retries)
            .await
            .context("Failed to convert information to a query document")?;

        let document = decode_document(value)?;
        info!(
            nodes = document.nodes.len(),
            predicates = document.predicates.len(),
            "Converted query document"
        );
        Ok(document)
    }
}

/// Decode the model's JSON into a `Document`, rejecting shapes the validator cannot use.
pub fn decode_document(value: serde_json::Value) -> Result<Document> {
    if !value.is_object() {
        anyhow::bail!("Query document must be a JSON object");
    }

    let document: Document = serde_json::from_value(value)
        .context("Query document does not match the nodes/predicates format")?;

    let mut seen = HashSet::new();
    for node in &document.nodes {
        if !seen.insert(node.node_id.as_str()) {
            anyhow::bail!("Duplicate node_id '{}' in query document", node.node_id);
        }
    }

    Ok(document)
}
