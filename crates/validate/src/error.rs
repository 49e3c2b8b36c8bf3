use thiserror::Error;

/// Node- or predicate-level problems. Any of these fails the whole document.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("No suitable property found for {node_type} with key {property} and value {value}.")]
    NoSuitableValue {
        node_type: String,
        property: String,
        value: String,
    },

    #[error("Invalid source {source_type} and target {target_type} for predicate {relation}")]
    SchemaViolation {
        relation: String,
        source_type: String,
        target_type: String,
    },

    #[error("Predicate {relation} references unknown node {node_id}")]
    DanglingEndpoint {
        relation: String,
        node_id: String,
    },

    #[error("Property similarity lookup failed: {0}")]
    SimilarityLookup(String),

    #[error("Property value selection failed: {0}")]
    ValueSelection(String),
}
