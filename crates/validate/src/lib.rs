pub mod error;
pub mod reconciler;
pub mod report;
pub mod schema_index;
pub mod similarity;
pub mod validator;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::ValidationError;
pub use reconciler::{PropertyReconciler, Reconciliation};
pub use report::{
    DirectionChange, PropertyChange, RemovedProperty, ValidationOutcome, ValidationReport, ValidationStatus,
};
pub use schema_index::SchemaIndex;
pub use similarity::{Neo4jSimilarity, PropertySimilarity};
pub use validator::DocumentValidator;
