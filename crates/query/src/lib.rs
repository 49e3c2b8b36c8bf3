pub mod envelope;
pub mod error;
pub mod graph_client;
pub mod orchestrator;
pub mod synthesizer;
pub mod web_search;

pub use envelope::{AnswerSource, GraphResponse, QueriedGraph, ResultEnvelope, NO_RESULT};
pub use error::PipelineError;
pub use graph_client::{AnnotationServiceClient, KnowledgeGraph};
pub use orchestrator::Orchestrator;
pub use synthesizer::AnswerSynthesizer;
pub use web_search::{GoogleCustomSearch, SearchResult, WebSearch, NO_RESULT_SENTINEL};
