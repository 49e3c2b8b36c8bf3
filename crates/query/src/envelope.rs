use extract::Document;
use serde::{Deserialize, Serialize};
use validate::ValidationReport;

use crate::web_search::SearchResult;

/// Answer text used until some path produces one.
pub const NO_RESULT: &str = "No result found";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    KnowledgeGraph,
    Web,
    Llm,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphResponse {
    pub nodes: Vec<serde_json::Value>,
    #[serde(default)]
    pub edges: Vec<serde_json::Value>,
}

/// What the annotation service gave back, kept verbatim for inspection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum QueriedGraph {
    Response(GraphResponse),
    Error { error: String },
}

/// Everything one query produced, whichever path answered it.
///
/// Starts out with neutral defaults and is filled in stage by stage, so a query
/// that stops early still returns every value captured up to that point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultEnvelope {
    pub relevant_information: String,
    pub initial_document: Option<Document>,
    pub validation_report: Option<ValidationReport>,
    pub validated_document: Option<Document>,
    pub reasoning: String,
    pub queried_graph: Option<QueriedGraph>,
    pub web_search_results: Option<Vec<SearchResult>>,
    pub answer: String,
    pub source: AnswerSource,
}

impl Default for ResultEnvelope {
    fn default() -> Self {
        Self {
            relevant_information: String::new(),
            initial_document: None,
            validation_report: None,
            validated_document: None,
            reasoning: String::new(),
            queried_graph: None,
            web_search_results: None,
            answer: NO_RESULT.to_string(),
            source: AnswerSource::KnowledgeGraph,
        }
    }
}
