mod config;
mod metrics;
mod retry;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use extract::{LanguageModel, OllamaClient, Translator};
use query::{AnnotationServiceClient, GoogleCustomSearch, Orchestrator, ResultEnvelope};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Instrument;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use validate::{DocumentValidator, Neo4jSimilarity, PropertyReconciler, SchemaIndex};

use config::{AppConfig, LogFormat};
use metrics::{Metrics, MetricsSnapshot, TimedOperation};
use retry::{RetryPolicy, RetryingModel};

struct AppState {
    orchestrator: Orchestrator,
    schema: Arc<SchemaIndex>,
    metrics: Arc<Metrics>,
    limiter: Semaphore,
}

#[derive(Deserialize)]
struct QueryRequest {
    #[serde(default)]
    query: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    schema_relations: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    tracing::info!(
        config = %serde_json::to_string(&config).unwrap_or_default(),
        "Loaded configuration"
    );

    let state = Arc::new(build_state(&config).await?);

    let app = app(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    tracing::info!("Server listening on http://{}", config.server.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/query", post(process_query))
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn build_state(config: &AppConfig) -> Result<AppState> {
    let schema_text = tokio::fs::read_to_string(&config.schema_path)
        .await
        .with_context(|| format!("Failed to read schema {}", config.schema_path.display()))?;

    let schema = Arc::new(SchemaIndex::parse(&schema_text));
    if schema.is_empty() {
        anyhow::bail!("Schema {} defines no relationships", config.schema_path.display());
    }
    tracing::info!(relations = schema.len(), "Loaded schema");

    let timeout = Duration::from_secs(config.concurrency.request_timeout_secs);

    // Create LLM client
    let ollama = OllamaClient::with_timeout(config.llm.base_url.clone(), config.llm.model.clone(), timeout)?;
    let llm: Arc<dyn LanguageModel> = Arc::new(RetryingModel::new(
        ollama,
        RetryPolicy::from_config(&config.retry),
    ));

    // Connect to Neo4j
    let neo4j_graph = neo4rs::Graph::new(
        &config.neo4j.uri,
        &config.neo4j.username,
        &config.neo4j.password,
    )
    .await
    .context("Failed to connect to Neo4j")?;

    let similarity = Neo4jSimilarity::new(neo4j_graph)
        .with_limits(config.neo4j.candidate_limit, config.neo4j.scan_limit);

    let validator = DocumentValidator::new(
        schema.clone(),
        PropertyReconciler::new(Arc::new(similarity), llm.clone()),
    );

    let translator = Translator::new(llm.clone(), Arc::from(schema_text.as_str()))
        .with_json_retries(config.retry.max_retries.max(1));

    let graph = AnnotationServiceClient::new(
        config.annotation_service.url.clone(),
        config.annotation_service.auth_token.clone(),
        timeout,
    )?;

    let web = GoogleCustomSearch::new(
        config.web_search.api_key.clone(),
        config.web_search.search_engine_id.clone(),
        timeout,
    )?;

    let orchestrator = Orchestrator::new(translator, validator, Arc::new(graph), Arc::new(web), llm)
        .with_web_results(config.web_search.num_results);

    Ok(AppState {
        orchestrator,
        schema,
        metrics: Metrics::new(),
        limiter: Semaphore::new(config.concurrency.max_concurrent_queries),
    })
}

async fn process_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<ResultEnvelope>, (StatusCode, Json<ErrorResponse>)> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse { error: "No query provided".to_string() }),
        ));
    }

    let _permit = state.limiter.acquire().await.map_err(|_| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse { error: "Server is shutting down".to_string() }),
        )
    })?;

    let query_id = Uuid::new_v4();
    let timer = TimedOperation::start();

    let envelope = state.orchestrator
        .answer(query)
        .instrument(tracing::info_span!("query", %query_id))
        .await;

    let elapsed = timer.elapsed();
    state.metrics.record_query(&envelope, elapsed);
    tracing::info!(
        %query_id,
        source = ?envelope.source,
        elapsed_ms = elapsed.as_millis() as u64,
        "Query answered"
    );

    Ok(Json(envelope))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        schema_relations: state.schema.len(),
    })
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
