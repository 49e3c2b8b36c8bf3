pub mod schema;
pub mod llm;
pub mod prompt;
pub mod translator;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use schema::{Document, Node, Predicate, PropertyValue};
pub use llm::{LanguageModel, OllamaClient};
pub use translator::Translator;
