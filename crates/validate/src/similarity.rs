use anyhow::{Context, Result};
use async_trait::async_trait;
use neo4rs::{Graph, Query};
use tracing::debug;

/// Looks up stored property values close to a requested one.
#[async_trait]
pub trait PropertySimilarity: Send + Sync {
    /// Candidates ordered best match first; empty when nothing is close.
    async fn find_similar(&self, node_type: &str, property: &str, value: &str) -> Result<Vec<String>>;
}

/// Fuzzy matching over the values actually stored in Neo4j.
pub struct Neo4jSimilarity {
    graph: Graph,
    candidate_limit: usize,
    scan_limit: usize,
}

impl Neo4jSimilarity {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            candidate_limit: 10,
            scan_limit: 10_000,
        }
    }

    pub fn with_limits(mut self, candidate_limit: usize, scan_limit: usize) -> Self {
        self.candidate_limit = candidate_limit;
        self.scan_limit = scan_limit;
        self
    }

    async fn stored_values(&self, node_type: &str, property: &str) -> Result<Vec<String>> {
        // Labels and property keys can't be query parameters
        let cypher = format!(
            "MATCH (n:{label}) WHERE n.{key} IS NOT NULL RETURN DISTINCT toString(n.{key}) AS value LIMIT $limit",
            label = escape_identifier(node_type),
            key = escape_identifier(property),
        );
        let query = Query::new(cypher).param("limit", self.scan_limit as i64);

        let mut result = self.graph.execute(query).await
            .with_context(|| format!("Failed to read {}.{} values from Neo4j", node_type, property))?;

        let mut values = Vec::new();
        while let Some(row) = result.next().await? {
            if let Ok(value) = row.get::<String>("value") {
                values.push(value);
            }
        }

        Ok(values)
    }
}

#[async_trait]
impl PropertySimilarity for Neo4jSimilarity {
    async fn find_similar(&self, node_type: &str, property: &str, value: &str) -> Result<Vec<String>> {
        let stored = self.stored_values(node_type, property).await?;
        let scanned = stored.len();
        let candidates = rank_candidates(value, stored, self.candidate_limit);

        debug!(
            node_type,
            property,
            value,
            scanned,
            candidates = candidates.len(),
            "Similar property values"
        );
        Ok(candidates)
    }
}

fn escape_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Keep stored values within half the longer string's length (case-insensitive
/// edit distance) of `value`, closest first, ties broken alphabetically.
pub fn rank_candidates(value: &str, stored: Vec<String>, limit: usize) -> Vec<String> {
    let needle: Vec<char> = value.to_lowercase().chars().collect();

    let mut scored: Vec<(usize, String)> = stored
        .into_iter()
        .filter_map(|candidate| {
            let hay: Vec<char> = candidate.to_lowercase().chars().collect();
            let distance = levenshtein(&needle, &hay);
            let bound = needle.len().max(hay.len()) / 2;
            (distance <= bound).then_some((distance, candidate))
        })
        .collect();

    scored.sort();
    scored.dedup_by(|a, b| a.1 == b.1);

    scored.into_iter().take(limit).map(|(_, c)| c).collect()
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }

    let mut prev: Vec<usize> = (0..=a.len()).collect();
    let mut curr: Vec<usize> = vec![0; a.len() + 1];

    for (i, cb) in b.iter().enumerate() {
        curr[0] = i + 1;
        for j in 1..=a.len() {
            let cost = if a[j - 1] == *cb { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[a.len()]
}
