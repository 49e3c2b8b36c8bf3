use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Closed set of valid `(source_type, relation, target_type)` triples.
///
/// Built once at startup and only read afterwards, so it can be shared behind an
/// `Arc` across concurrent queries without locking.
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    triples: HashSet<(String, String, String)>,
}

fn triple_regex() -> &'static Regex {
    static TRIPLE: OnceLock<Regex> = OnceLock::new();
    TRIPLE.get_or_init(|| {
        Regex::new(r"\(\s*:?([\w.]+)\s*\)\s*-\s*\[\s*:?([\w.]+)\s*\]\s*->\s*\(\s*:?([\w.]+)\s*\)")
            .expect("triple pattern is valid")
    })
}

impl SchemaIndex {
    /// Collect every `(source)-[relation]->(target)` occurrence in schema text.
    ///
    /// Lines without a triple (headings, property listings) are skipped, so the
    /// same text can be handed to the model verbatim.
    pub fn parse(schema_text: &str) -> Self {
        let triples = triple_regex()
            .captures_iter(schema_text)
            .map(|c| (c[1].to_string(), c[2].to_string(), c[3].to_string()))
            .collect();
        Self { triples }
    }

    pub fn has_relation(&self, source_type: &str, relation: &str, target_type: &str) -> bool {
        self.triples.contains(&(
            source_type.to_string(),
            relation.to_string(),
            target_type.to_string(),
        ))
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
# Nodes
gene: gene_name, gene_type, chr, start, end
transcript: transcript_name

# Relationships
(gene)-[transcribed_to]->(transcript)
(transcript)-[translates_to]->(protein)
(gene)-[ belongs_to ]->( go )
"#;

    #[test]
    fn test_parse_schema_text() {
        let index = SchemaIndex::parse(SCHEMA);
        assert_eq!(index.len(), 3);
        assert!(index.has_relation("gene", "transcribed_to", "transcript"));
        assert!(index.has_relation("gene", "belongs_to", "go"));
    }

    #[test]
    fn test_relation_is_directed() {
        let index = SchemaIndex::parse(SCHEMA);
        assert!(!index.has_relation("transcript", "transcribed_to", "gene"));
    }

    #[test]
    fn test_parse_ignores_duplicates() {
        let index = SchemaIndex::parse("(gene)-[belongs_to]->(go)\n(gene)-[belongs_to]->(go)");
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_text_without_triples_is_empty() {
        assert!(SchemaIndex::parse("gene: gene_name").is_empty());
    }

    #[test]
    fn test_bundled_schema() {
        let index = SchemaIndex::parse(include_str!("../../../schema/schema.txt"));
        assert_eq!(index.len(), 12);
        assert!(index.has_relation("protein", "interacts_with", "protein"));
        assert!(!index.has_relation("source", "predicate", "target"));
    }
}
