use extract::{Document, PropertyValue};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::ValidationError;
use crate::reconciler::{PropertyReconciler, Reconciliation};
use crate::report::{
    orientation, DirectionChange, PropertyChange, RemovedProperty, ValidationOutcome, ValidationReport,
};
use crate::schema_index::SchemaIndex;

/// Repairs a draft document against the schema and the stored property values.
pub struct DocumentValidator {
    schema: Arc<SchemaIndex>,
    reconciler: PropertyReconciler,
}

impl DocumentValidator {
    pub fn new(schema: Arc<SchemaIndex>, reconciler: PropertyReconciler) -> Self {
        Self { schema, reconciler }
    }

    /// Single fail-fast pass over properties, then predicate directions.
    ///
    /// A failed pass returns the input document unchanged alongside a report whose
    /// entries cover what was done before the failure.
    pub async fn validate(&self, document: &Document) -> ValidationOutcome {
        info!("Validating and updating the query document");
        let mut updated = document.clone();
        let mut report = ValidationReport::new();

        match self.apply(&mut updated, &mut report).await {
            Ok(()) => {
                info!(
                    property_changes = report.property_changes.len(),
                    direction_changes = report.direction_changes.len(),
                    removed_properties = report.removed_properties.len(),
                    "Validation succeeded"
                );
                ValidationOutcome { document: updated, report }
            }
            Err(e) => {
                error!(error = %e, "Validation of the query document failed");
                report.fail(e.to_string());
                ValidationOutcome {
                    document: document.clone(),
                    report,
                }
            }
        }
    }

    async fn apply(&self, document: &mut Document, report: &mut ValidationReport) -> Result<(), ValidationError> {
        let mut node_types: HashMap<String, String> = HashMap::new();

        for node in &mut document.nodes {
            node_types.insert(node.node_id.clone(), node.node_type.clone());

            let keys: Vec<String> = node.properties.keys().cloned().collect();
            for key in keys {
                let Some(value) = node.properties.get(&key).cloned() else {
                    continue;
                };

                match self.reconciler.reconcile(&node.node_type, &key, &value).await? {
                    Reconciliation::Remove => {
                        node.properties.remove(&key);
                        report.removed_properties.push(RemovedProperty {
                            node_type: node.node_type.clone(),
                            node_id: node.node_id.clone(),
                            property: key,
                            original_value: value,
                        });
                    }
                    Reconciliation::Keep => {}
                    Reconciliation::Select { value: selected, candidates } => {
                        if value.as_text() != Some(selected.as_str()) {
                            report.property_changes.push(PropertyChange {
                                node_type: node.node_type.clone(),
                                node_id: node.node_id.clone(),
                                property: key.clone(),
                                original_value: value.to_string(),
                                new_value: selected.clone(),
                                candidates,
                            });
                        }
                        node.properties.insert(key, PropertyValue::Text(selected));
                    }
                }
            }
        }

        for predicate in &mut document.predicates {
            let endpoint_type = |node_id: &str| {
                node_types.get(node_id).cloned().ok_or_else(|| ValidationError::DanglingEndpoint {
                    relation: predicate.relation.clone(),
                    node_id: node_id.to_string(),
                })
            };
            let source_type = endpoint_type(&predicate.source)?;
            let target_type = endpoint_type(&predicate.target)?;
            let relation = predicate.relation.as_str();

            if self.schema.has_relation(&source_type, relation, &target_type) {
                continue;
            }

            if !self.schema.has_relation(&target_type, relation, &source_type) {
                return Err(ValidationError::SchemaViolation {
                    relation: relation.to_string(),
                    source_type,
                    target_type,
                });
            }

            warn!(relation, source_type = %source_type, target_type = %target_type, "Reversing predicate direction");
            report.direction_changes.push(DirectionChange {
                relation_type: relation.to_string(),
                original_orientation: orientation(&source_type, relation, &target_type),
                corrected_orientation: orientation(&target_type, relation, &source_type),
            });
            std::mem::swap(&mut predicate.source, &mut predicate.target);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ValidationStatus;
    use crate::testing::StaticSimilarity;
    use extract::testing::ScriptedModel;
    use extract::{Node, Predicate};
    use std::collections::BTreeMap;

    fn schema() -> Arc<SchemaIndex> {
        Arc::new(SchemaIndex::parse(
            "(gene)-[transcribed_to]->(transcript)\n(gene)-[belongs_to]->(go)",
        ))
    }

    fn validator(similarity: StaticSimilarity, model: ScriptedModel) -> DocumentValidator {
        DocumentValidator::new(
            schema(),
            PropertyReconciler::new(Arc::new(similarity), Arc::new(model)),
        )
    }

    fn node(node_id: &str, node_type: &str, properties: &[(&str, PropertyValue)]) -> Node {
        Node {
            node_id: node_id.to_string(),
            external_id: String::new(),
            node_type: node_type.to_string(),
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn predicate(relation: &str, source: &str, target: &str) -> Predicate {
        Predicate {
            relation: relation.to_string(),
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    #[tokio::test]
    async fn test_trivial_document_is_unchanged() {
        let doc = Document {
            nodes: vec![
                node("gene_1", "gene", &[("start", PropertyValue::Integer(100))]),
                node("go_1", "go", &[]),
            ],
            predicates: vec![],
        };

        let outcome = validator(StaticSimilarity::new(), ScriptedModel::new()).validate(&doc).await;
        assert_eq!(outcome.report.status, ValidationStatus::Success);
        assert!(outcome.report.is_clean());
        assert_eq!(outcome.document, doc);
    }

    #[tokio::test]
    async fn test_zero_survives_and_blanks_are_removed() {
        let doc = Document {
            nodes: vec![node(
                "gene_1",
                "gene",
                &[
                    ("start", PropertyValue::Integer(0)),
                    ("gene_name", PropertyValue::Text(String::new())),
                    ("chr", PropertyValue::Null),
                    ("is_marker", PropertyValue::Bool(false)),
                ],
            )],
            predicates: vec![],
        };

        let outcome = validator(StaticSimilarity::new(), ScriptedModel::new()).validate(&doc).await;
        assert!(outcome.report.is_success());

        let props = &outcome.document.nodes[0].properties;
        assert_eq!(props.len(), 1);
        assert_eq!(props["start"], PropertyValue::Integer(0));

        let mut removed: Vec<_> = outcome.report.removed_properties.iter().map(|r| r.property.as_str()).collect();
        removed.sort();
        assert_eq!(removed, vec!["chr", "gene_name", "is_marker"]);
    }

    #[tokio::test]
    async fn test_substitution_is_recorded_only_when_changed() {
        let similarity = StaticSimilarity::new()
            .with("gene", "gene_name", "brca1", &["BRCA1", "BRCA2"])
            .with("gene", "gene_type", "protein_coding", &["protein_coding"]);
        let model = ScriptedModel::new()
            .respond_when("SEARCH VALUE: brca1", r#"{"selected_value": "BRCA1"}"#)
            .respond_when("SEARCH VALUE: protein_coding", r#"{"selected_value": "protein_coding"}"#);

        let doc = Document {
            nodes: vec![node(
                "gene_1",
                "gene",
                &[
                    ("gene_name", PropertyValue::Text("brca1".into())),
                    ("gene_type", PropertyValue::Text("protein_coding".into())),
                ],
            )],
            predicates: vec![],
        };

        let outcome = validator(similarity, model).validate(&doc).await;
        assert!(outcome.report.is_success());
        assert_eq!(outcome.report.property_changes.len(), 1);

        let change = &outcome.report.property_changes[0];
        assert_eq!(change.property, "gene_name");
        assert_eq!(change.original_value, "brca1");
        assert_eq!(change.new_value, "BRCA1");
        assert_eq!(change.candidates, vec!["BRCA1", "BRCA2"]);
        assert_eq!(
            outcome.document.nodes[0].properties["gene_name"],
            PropertyValue::Text("BRCA1".into())
        );
    }

    #[tokio::test]
    async fn test_forward_predicate_is_untouched() {
        let doc = Document {
            nodes: vec![node("gene_1", "gene", &[]), node("transcript_1", "transcript", &[])],
            predicates: vec![predicate("transcribed_to", "gene_1", "transcript_1")],
        };

        let outcome = validator(StaticSimilarity::new(), ScriptedModel::new()).validate(&doc).await;
        assert!(outcome.report.is_success());
        assert!(outcome.report.direction_changes.is_empty());
        assert_eq!(outcome.document.predicates[0], doc.predicates[0]);
    }

    #[tokio::test]
    async fn test_reversed_predicate_is_swapped() {
        let doc = Document {
            nodes: vec![node("go_1", "go", &[]), node("gene_1", "gene", &[])],
            predicates: vec![predicate("belongs_to", "go_1", "gene_1")],
        };

        let outcome = validator(StaticSimilarity::new(), ScriptedModel::new()).validate(&doc).await;
        assert!(outcome.report.is_success());
        assert_eq!(outcome.report.direction_changes.len(), 1);

        let change = &outcome.report.direction_changes[0];
        assert_eq!(change.relation_type, "belongs_to");
        assert_eq!(change.original_orientation, "(go)-[belongs_to]->(gene)");
        assert_eq!(change.corrected_orientation, "(gene)-[belongs_to]->(go)");

        let fixed = &outcome.document.predicates[0];
        assert_eq!(fixed.source, "gene_1");
        assert_eq!(fixed.target, "go_1");
    }

    #[tokio::test]
    async fn test_each_predicate_is_checked_independently() {
        let doc = Document {
            nodes: vec![
                node("gene_1", "gene", &[]),
                node("transcript_1", "transcript", &[]),
                node("transcript_2", "transcript", &[]),
            ],
            predicates: vec![
                predicate("transcribed_to", "gene_1", "transcript_1"),
                predicate("transcribed_to", "transcript_2", "gene_1"),
            ],
        };

        let outcome = validator(StaticSimilarity::new(), ScriptedModel::new()).validate(&doc).await;
        assert!(outcome.report.is_success());
        assert_eq!(outcome.report.direction_changes.len(), 1);
        assert_eq!(outcome.document.predicates[0], doc.predicates[0]);
        assert_eq!(outcome.document.predicates[1].source, "gene_1");
    }

    #[tokio::test]
    async fn test_unresolvable_predicate_returns_original() {
        let similarity = StaticSimilarity::new().with("gene", "gene_name", "brca1", &["BRCA1"]);
        let model = ScriptedModel::new().otherwise(r#"{"selected_value": "BRCA1"}"#);

        let doc = Document {
            nodes: vec![
                node("gene_1", "gene", &[("gene_name", PropertyValue::Text("brca1".into()))]),
                node("go_1", "go", &[]),
                node("transcript_1", "transcript", &[]),
            ],
            predicates: vec![
                predicate("belongs_to", "go_1", "gene_1"),
                predicate("translates_to", "gene_1", "transcript_1"),
            ],
        };
        let before = serde_json::to_vec(&doc).unwrap();

        let outcome = validator(similarity, model).validate(&doc).await;
        assert_eq!(outcome.report.status, ValidationStatus::Failed);
        assert_eq!(
            outcome.report.error_message,
            "Invalid source gene and target transcript for predicate translates_to"
        );
        assert_eq!(serde_json::to_vec(&outcome.document).unwrap(), before);
    }

    #[tokio::test]
    async fn test_unmatched_property_fails_document() {
        let doc = Document {
            nodes: vec![node("gene_1", "gene", &[("gene_name", PropertyValue::Text("zzz".into()))])],
            predicates: vec![],
        };

        let outcome = validator(StaticSimilarity::new(), ScriptedModel::new()).validate(&doc).await;
        assert!(!outcome.report.is_success());
        assert!(outcome.report.error_message.contains("No suitable property found for gene"));
        assert_eq!(outcome.document, doc);
    }

    #[tokio::test]
    async fn test_dangling_endpoint_fails_document() {
        let doc = Document {
            nodes: vec![node("gene_1", "gene", &[])],
            predicates: vec![predicate("transcribed_to", "gene_1", "transcript_9")],
        };

        let outcome = validator(StaticSimilarity::new(), ScriptedModel::new()).validate(&doc).await;
        assert!(!outcome.report.is_success());
        assert!(outcome.report.error_message.contains("transcript_9"));
    }
}
