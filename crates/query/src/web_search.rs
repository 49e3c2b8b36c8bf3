use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Reply the synthesis prompt asks for when the results don't answer the question.
pub const NO_RESULT_SENTINEL: &str = "No result found.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Ranked results; empty when the search found nothing.
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>>;
}

/// Google Custom Search JSON API client.
#[derive(Clone)]
pub struct GoogleCustomSearch {
    api_key: String,
    search_engine_id: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
}

impl GoogleCustomSearch {
    pub fn new(api_key: String, search_engine_id: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build web search HTTP client")?;

        Ok(Self {
            api_key,
            search_engine_id,
            base_url: "https://www.googleapis.com/customsearch/v1".to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl WebSearch for GoogleCustomSearch {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>> {
        let num = num_results.to_string();
        let url = reqwest::Url::parse_with_params(
            &self.base_url,
            &[
                ("key", self.api_key.as_str()),
                ("cx", self.search_engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ],
        )
        .context("Invalid web search URL")?;

        let response = self.client
            .get(url)
            .send()
            .await
            .context("Failed to send web search request")?;

        if !response.status().is_success() {
            let status = response.status();
            error!(%status, "Web search failed");
            anyhow::bail!("Web search failed: {}", status);
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse web search response")?;

        let results: Vec<SearchResult> = body.items
            .into_iter()
            .map(|item| SearchResult {
                title: item.title,
                snippet: item.snippet,
                link: item.link,
            })
            .collect();

        info!(results = results.len(), "Web search completed");
        Ok(results)
    }
}

pub fn build_search_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| format!("Title: {}\nDescription: {}\nSource: {}\n", r.title, r.snippet, r.link))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_synthesis_prompt(query: &str, results: &[SearchResult]) -> String {
    let context = build_search_context(results);
    format!(
        r#"You are a helpful assistant. The user asked the question below and web search results are provided as reference.

QUESTION: "{query}"

SEARCH RESULTS:
{context}

INSTRUCTIONS:
- Synthesize the key findings, prioritizing the most relevant sources
- Cite the source for every major claim
- Distinguish established facts from preliminary findings
- Keep source citations separate from the main text
- If the search results don't contain enough information to answer the question, reply exactly:
{NO_RESULT_SENTINEL}

ANSWER:"#
    )
}

pub fn is_no_result(answer: &str) -> bool {
    let answer = answer.trim();
    answer.is_empty() || answer == NO_RESULT_SENTINEL
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn search_client(server: &MockServer) -> GoogleCustomSearch {
        GoogleCustomSearch::new("key-1".to_string(), "cx-1".to_string(), Duration::from_secs(5))
            .unwrap()
            .with_base_url(format!("{}/customsearch/v1", server.uri()))
    }

    #[tokio::test]
    async fn test_search_maps_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("key", "key-1"))
            .and(query_param("cx", "cx-1"))
            .and(query_param("q", "BRCA1 function"))
            .and(query_param("num", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"title": "BRCA1 gene", "snippet": "DNA repair", "link": "https://ncbi.nlm.nih.gov/gene/672"}
                ]
            })))
            .mount(&server)
            .await;

        let results = search_client(&server).search("BRCA1 function", 3).await.unwrap();
        assert_eq!(
            results,
            vec![SearchResult {
                title: "BRCA1 gene".to_string(),
                snippet: "DNA repair".to_string(),
                link: "https://ncbi.nlm.nih.gov/gene/672".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_items_means_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"kind": "customsearch#search"})))
            .mount(&server)
            .await;

        let results = search_client(&server).search("nothing", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_quota_error_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        assert!(search_client(&server).search("q", 5).await.is_err());
    }

    #[test]
    fn test_synthesis_prompt_lists_sources() {
        let results = vec![SearchResult {
            title: "T".to_string(),
            snippet: "S".to_string(),
            link: "L".to_string(),
        }];
        let prompt = build_synthesis_prompt("what?", &results);
        assert!(prompt.contains("Title: T\nDescription: S\nSource: L"));
        assert!(prompt.contains(NO_RESULT_SENTINEL));
    }

    #[test]
    fn test_sentinel_detection() {
        assert!(is_no_result("No result found."));
        assert!(is_no_result("  No result found.\n"));
        assert!(is_no_result(""));
        assert!(!is_no_result("BRCA1 repairs DNA [1]."));
    }
}
