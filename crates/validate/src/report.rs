use extract::{Document, PropertyValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyChange {
    pub node_type: String,
    pub node_id: String,
    pub property: String,
    pub original_value: String,
    pub new_value: String,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectionChange {
    pub relation_type: String,
    pub original_orientation: String,
    pub corrected_orientation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemovedProperty {
    pub node_type: String,
    pub node_id: String,
    pub property: String,
    pub original_value: PropertyValue,
}

/// Record of every correction made during one validation pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    pub property_changes: Vec<PropertyChange>,
    pub direction_changes: Vec<DirectionChange>,
    pub removed_properties: Vec<RemovedProperty>,
    pub status: ValidationStatus,
    #[serde(default)]
    pub error_message: String,
}

impl ValidationReport {
    pub(crate) fn new() -> Self {
        Self {
            property_changes: Vec::new(),
            direction_changes: Vec::new(),
            removed_properties: Vec::new(),
            status: ValidationStatus::Success,
            error_message: String::new(),
        }
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.status = ValidationStatus::Failed;
        self.error_message = message;
    }

    pub fn is_success(&self) -> bool {
        self.status == ValidationStatus::Success
    }

    /// No property or direction was touched.
    pub fn is_clean(&self) -> bool {
        self.property_changes.is_empty()
            && self.direction_changes.is_empty()
            && self.removed_properties.is_empty()
    }
}

/// Result of validating one document.
///
/// On failure `document` is the untouched input, never a partial repair.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub document: Document,
    pub report: ValidationReport,
}

pub(crate) fn orientation(source_type: &str, relation: &str, target_type: &str) -> String {
    format!("({})-[{}]->({})", source_type, relation, target_type)
}
