use anyhow::{Context, Result};
use async_trait::async_trait;
use extract::Document;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::envelope::{GraphResponse, QueriedGraph};

/// Runs a validated document against the knowledge graph.
#[async_trait]
pub trait KnowledgeGraph: Send + Sync {
    async fn execute(&self, document: &Document) -> Result<GraphResponse>;
}

/// HTTP client for the annotation service.
#[derive(Clone)]
pub struct AnnotationServiceClient {
    url: String,
    auth_token: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct AnnotationRequest<'a> {
    requests: &'a Document,
}

impl AnnotationServiceClient {
    pub fn new(url: String, auth_token: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build annotation service HTTP client")?;

        Ok(Self {
            url,
            auth_token,
            client,
        })
    }
}

#[async_trait]
impl KnowledgeGraph for AnnotationServiceClient {
    async fn execute(&self, document: &Document) -> Result<GraphResponse> {
        info!("Starting knowledge graph query");
        debug!(url = %self.url, "Sending query document to the annotation service");

        let response = self.client
            .post(&self.url)
            .bearer_auth(&self.auth_token)
            .json(&AnnotationRequest { requests: document })
            .send()
            .await
            .context("Failed to send request to the annotation service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(%status, body = %body, "Annotation service request failed");
            anyhow::bail!("Failed to query knowledge graph: {} {}", status, body);
        }

        let body: QueriedGraph = response
            .json()
            .await
            .context("Failed to parse annotation service response")?;

        match body {
            QueriedGraph::Response(graph) => {
                info!(nodes = graph.nodes.len(), edges = graph.edges.len(), "Queried the knowledge graph");
                Ok(graph)
            }
            QueriedGraph::Error { error } => anyhow::bail!("Annotation service error: {}", error),
        }
    }
}
