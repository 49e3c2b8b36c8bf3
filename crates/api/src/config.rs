use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Process-wide settings, read once at startup and handed to every collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub neo4j: Neo4jConfig,
    pub annotation_service: AnnotationServiceConfig,
    pub web_search: WebSearchConfig,
    pub schema_path: PathBuf,
    pub concurrency: ConcurrencyConfig,
    pub retry: RetryConfig,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    pub uri: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub candidate_limit: usize,
    pub scan_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationServiceConfig {
    pub url: String,
    #[serde(skip_serializing)]
    pub auth_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub search_engine_id: String,
    pub num_results: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    pub max_concurrent_queries: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("unknown log format '{}'", other),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0:3000".to_string(),
            },
            llm: LlmConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "llama3".to_string(),
            },
            neo4j: Neo4jConfig {
                uri: "bolt://localhost:7687".to_string(),
                username: "neo4j".to_string(),
                password: String::new(),
                candidate_limit: 10,
                scan_limit: 10_000,
            },
            annotation_service: AnnotationServiceConfig {
                url: "http://localhost:5000/query".to_string(),
                auth_token: String::new(),
            },
            web_search: WebSearchConfig {
                api_key: String::new(),
                search_engine_id: String::new(),
                num_results: 5,
            },
            schema_path: PathBuf::from("schema/schema.txt"),
            concurrency: ConcurrencyConfig {
                max_concurrent_queries: 8,
                request_timeout_secs: 60,
            },
            retry: RetryConfig {
                max_retries: 3,
                initial_backoff_ms: 1000,
                max_backoff_ms: 10000,
            },
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let text = |key: &str, target: &mut String| {
            if let Some(value) = lookup(key) {
                *target = value;
            }
        };

        text("BIND_ADDR", &mut config.server.bind_addr);
        text("OLLAMA_URL", &mut config.llm.base_url);
        text("OLLAMA_MODEL", &mut config.llm.model);
        text("NEO4J_URI", &mut config.neo4j.uri);
        text("NEO4J_USERNAME", &mut config.neo4j.username);
        text("NEO4J_PASSWORD", &mut config.neo4j.password);
        text("ANNOTATION_SERVICE_URL", &mut config.annotation_service.url);
        text("ANNOTATION_AUTH_TOKEN", &mut config.annotation_service.auth_token);
        text("GOOGLE_API_KEY", &mut config.web_search.api_key);
        text("GOOGLE_CUSTOM_SEARCH_ID", &mut config.web_search.search_engine_id);

        if let Some(path) = lookup("SCHEMA_PATH") {
            config.schema_path = PathBuf::from(path);
        }

        parse_into(&lookup, "NEO4J_CANDIDATE_LIMIT", &mut config.neo4j.candidate_limit)?;
        parse_into(&lookup, "NEO4J_SCAN_LIMIT", &mut config.neo4j.scan_limit)?;
        parse_into(&lookup, "WEB_SEARCH_RESULTS", &mut config.web_search.num_results)?;
        parse_into(&lookup, "MAX_CONCURRENT_QUERIES", &mut config.concurrency.max_concurrent_queries)?;
        parse_into(&lookup, "REQUEST_TIMEOUT_SECS", &mut config.concurrency.request_timeout_secs)?;
        parse_into(&lookup, "MAX_RETRIES", &mut config.retry.max_retries)?;
        parse_into(&lookup, "INITIAL_BACKOFF_MS", &mut config.retry.initial_backoff_ms)?;
        parse_into(&lookup, "MAX_BACKOFF_MS", &mut config.retry.max_backoff_ms)?;
        parse_into(&lookup, "LOG_FORMAT", &mut config.log_format)?;

        if config.concurrency.max_concurrent_queries == 0 {
            anyhow::bail!("MAX_CONCURRENT_QUERIES must be at least 1");
        }
        // Custom Search serves at most 10 results per request
        if !(1..=10).contains(&config.web_search.num_results) {
            anyhow::bail!(
                "WEB_SEARCH_RESULTS must be between 1 and 10, got {}",
                config.web_search.num_results
            );
        }

        Ok(config)
    }
}

fn parse_into<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e: T::Err| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid value '{}' for {}", raw, key))?;
    }
    Ok(())
}
