use thiserror::Error;

/// Stage failures. The orchestrator turns each into a fallback transition.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to extract relevant information: {0}")]
    Extraction(String),

    #[error("Failed to translate the query into a document: {0}")]
    Translation(String),

    #[error("Query document failed validation: {0}")]
    Validation(String),

    #[error("Knowledge graph returned no usable answer: {0}")]
    GraphExecution(String),

    #[error("Web search produced no answer: {0}")]
    WebSearch(String),

    #[error("Language model fallback failed: {0}")]
    Fallback(String),
}
