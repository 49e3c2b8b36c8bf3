use extract::{LanguageModel, PropertyValue};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ValidationError;
use crate::similarity::PropertySimilarity;

/// What the validator should do with one property.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Blank value, delete the property
    Remove,
    /// Non-text value, leave as is
    Keep,
    /// Stored value the model picked; may equal the original
    Select {
        value: String,
        candidates: Vec<String>,
    },
}

#[derive(Deserialize)]
struct Selection {
    #[serde(default)]
    selected_value: Option<String>,
}

/// Maps free-text property values onto values the graph actually stores.
pub struct PropertyReconciler {
    similarity: Arc<dyn PropertySimilarity>,
    llm: Arc<dyn LanguageModel>,
}

impl PropertyReconciler {
    pub fn new(similarity: Arc<dyn PropertySimilarity>, llm: Arc<dyn LanguageModel>) -> Self {
        Self { similarity, llm }
    }

    pub async fn reconcile(
        &self,
        node_type: &str,
        property: &str,
        value: &PropertyValue,
    ) -> Result<Reconciliation, ValidationError> {
        if value.is_blank() {
            return Ok(Reconciliation::Remove);
        }

        let Some(text) = value.as_text() else {
            return Ok(Reconciliation::Keep);
        };

        let no_match = || ValidationError::NoSuitableValue {
            node_type: node_type.to_string(),
            property: property.to_string(),
            value: text.to_string(),
        };

        let candidates = self.similarity
            .find_similar(node_type, property, text)
            .await
            .map_err(|e| ValidationError::SimilarityLookup(format!("{:#}", e)))?;

        if candidates.is_empty() {
            return Err(no_match());
        }

        let selected = self.select_best_match(text, &candidates).await?;
        match selected {
            Some(value) => {
                info!(node_type, property, original = text, selected = %value, "Selected property value");
                Ok(Reconciliation::Select { value, candidates })
            }
            None => Err(no_match()),
        }
    }

    /// Ask the model which candidate the user meant. `None` means none fit.
    async fn select_best_match(
        &self,
        value: &str,
        candidates: &[String],
    ) -> Result<Option<String>, ValidationError> {
        let prompt = build_selection_prompt(value, candidates);

        let reply = self.llm
            .generate_json(&prompt)
            .await
            .map_err(|e| ValidationError::ValueSelection(format!("{:#}", e)))?;

        let selection: Selection = serde_json::from_value(reply)
            .map_err(|e| ValidationError::ValueSelection(e.to_string()))?;

        let selected = selection.selected_value
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"));

        debug!(value, selected = ?selected, "Model selection");
        Ok(selected)
    }
}

pub fn build_selection_prompt(value: &str, candidates: &[String]) -> String {
    let listed = candidates
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are given a search value and stored values that are similar to it by edit distance.
Select the most probable stored value the search value refers to.
If none of the stored values fit, set selected_value to an empty string ("").

SEARCH VALUE: {value}
STORED VALUES: [{listed}]

Output ONLY this JSON object:
{{"selected_value": "<one of the stored values or empty string>", "confidence_score": <0 to 1>}}"#
    )
}
