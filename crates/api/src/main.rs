mod config;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use communities::{CommunityDetector, CommunityReport, LouvainDetector};
use config::{AppConfig, LogFormat};
use store::{
    BookDegreeStatistics, BookInteractionCount, DegreeStatistics, GraphStats, Neo4jConnection,
};

struct AppState {
    conn: Neo4jConnection,
    louvain_seed: Option<u64>,
}

#[derive(Serialize)]
struct HealthResponse {
    neo4j: String,
}

#[derive(Serialize)]
struct VerifyResponse {
    verified: bool,
    expected_node_count: i64,
}

#[derive(Serialize)]
struct CountResponse {
    count: i64,
}

#[derive(Deserialize)]
struct CommunityParams {
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = AppConfig::from_env()?;

    init_tracing(config.log_format);

    let conn = Neo4jConnection::connect(&config.neo4j).await?;

    let state = Arc::new(AppState {
        conn,
        louvain_seed: config.louvain_seed,
    });

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    info!(addr = %config.listen_addr, "Server listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/verify", get(verify))
        .route("/characters/count", get(count_characters))
        .route("/interactions/count", get(count_interactions))
        .route("/interactions/by-book", get(interactions_by_book))
        .route("/graph/stats", get(graph_stats))
        .route("/stats", get(summary_statistics))
        .route("/stats/by-book", get(summary_statistics_by_book))
        .route("/communities", get(detect_communities))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn internal_error(operation: &'static str) -> impl FnOnce(anyhow::Error) -> StatusCode {
    move |e| {
        error!(operation, error = %format!("{:#}", e), "Request failed");
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let neo4j = match state.conn.ping().await {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("error: {:#}", e),
    };

    Json(HealthResponse { neo4j })
}

async fn verify(State(state): State<Arc<AppState>>) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        verified: state.conn.verify_connection().await,
        expected_node_count: state.conn.expected_node_count(),
    })
}

async fn count_characters(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, StatusCode> {
    let count = state
        .conn
        .count_characters()
        .await
        .map_err(internal_error("count_characters"))?;

    Ok(Json(CountResponse { count }))
}

async fn count_interactions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, StatusCode> {
    let count = state
        .conn
        .count_interactions()
        .await
        .map_err(internal_error("count_interactions"))?;

    Ok(Json(CountResponse { count }))
}

async fn interactions_by_book(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BookInteractionCount>>, StatusCode> {
    let rows = state
        .conn
        .count_interactions_by_book()
        .await
        .map_err(internal_error("count_interactions_by_book"))?;

    Ok(Json(rows))
}

async fn graph_stats(State(state): State<Arc<AppState>>) -> Result<Json<GraphStats>, StatusCode> {
    let stats = state
        .conn
        .get_stats()
        .await
        .map_err(internal_error("get_stats"))?;

    Ok(Json(stats))
}

async fn summary_statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DegreeStatistics>, StatusCode> {
    state
        .conn
        .network_summary_statistics()
        .await
        .map_err(internal_error("network_summary_statistics"))?
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn summary_statistics_by_book(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BookDegreeStatistics>>, StatusCode> {
    let rows = state
        .conn
        .network_summary_statistics_by_book()
        .await
        .map_err(internal_error("network_summary_statistics_by_book"))?;

    Ok(Json(rows))
}

async fn detect_communities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CommunityParams>,
) -> Result<Json<CommunityReport>, StatusCode> {
    let louvain = LouvainDetector::new().with_seed(params.seed.or(state.louvain_seed));
    let detector = CommunityDetector::new(state.conn.clone(), louvain);

    let report = detector
        .detect()
        .await
        .map_err(internal_error("detect_communities"))?;

    info!(
        communities = report.community_count,
        modularity = report.modularity,
        "Community report built"
    );
    Ok(Json(report))
}
