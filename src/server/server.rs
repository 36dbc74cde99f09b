use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::metrics::{make_metrics_app, set_catalog_items};
use super::state::{GuardedEntityStore, GuardedSyncEngine, ServerState};
use super::{log_requests, ServerConfig};
use crate::entity_store::EntityStats;
use crate::error::CatalogError;
use crate::upstream::SearchKind;

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    uptime_sec: u64,
    entities: EntityStats,
}

#[derive(Deserialize)]
struct SearchParams {
    name: Option<String>,
}

fn bad_request(message: &str, error: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"message": message, "error": error})),
    )
        .into_response()
}

fn internal_error(err: CatalogError) -> Response {
    error!("Request failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "message": "Internal server error",
            "error": err.to_string(),
            "kind": err.kind(),
        })),
    )
        .into_response()
}

/// Upstream ids are base62: non-empty and ASCII alphanumeric.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}

fn parse_search_kind(kind: &str) -> Option<SearchKind> {
    match kind {
        "artist" => Some(SearchKind::Artist),
        "album" => Some(SearchKind::Album),
        "track" => Some(SearchKind::Track),
        _ => None,
    }
}

async fn health(State(state): State<ServerState>) -> Response {
    match state.entity_store.get_stats().await {
        Ok(entities) => {
            set_catalog_items(entities.artists, entities.albums, entities.tracks);
            Json(HealthStatus {
                status: "ok",
                uptime_sec: state.start_time.elapsed().as_secs(),
                entities,
            })
            .into_response()
        }
        Err(e) => internal_error(e.into()),
    }
}

async fn get_artist(State(engine): State<GuardedSyncEngine>, Path(id): Path<String>) -> Response {
    if !is_valid_id(&id) {
        return bad_request("Invalid artist ID", format!("{:?} is not a valid id", id));
    }
    match engine.get_artist_view(&id).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn get_album(State(engine): State<GuardedSyncEngine>, Path(id): Path<String>) -> Response {
    if !is_valid_id(&id) {
        return bad_request("Invalid album ID", format!("{:?} is not a valid id", id));
    }
    match engine.get_album_view(&id).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn get_track(State(engine): State<GuardedSyncEngine>, Path(id): Path<String>) -> Response {
    if !is_valid_id(&id) {
        return bad_request("Invalid track ID", format!("{:?} is not a valid id", id));
    }
    match engine.get_track_view(&id).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn search(
    State(engine): State<GuardedSyncEngine>,
    Path(kind): Path<String>,
    Query(params): Query<SearchParams>,
) -> Response {
    let Some(kind) = parse_search_kind(&kind) else {
        return bad_request(
            "Invalid search type",
            format!("{:?} is not one of artist, album, track", kind),
        );
    };
    let query = match params.name.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => return bad_request("Invalid search query", "name is required".to_string()),
    };

    match engine.search(kind, &query).await {
        Ok(results) => Json(results).into_response(),
        Err(e) => internal_error(e),
    }
}

pub fn make_app(
    config: ServerConfig,
    sync_engine: GuardedSyncEngine,
    entity_store: GuardedEntityStore,
) -> Router {
    let state = ServerState {
        config,
        start_time: Instant::now(),
        sync_engine,
        entity_store,
    };

    let catalog_routes: Router = Router::new()
        .route("/artist/{id}", get(get_artist))
        .route("/album/{id}", get(get_album))
        .route("/track/{id}", get(get_track))
        .route("/search/{kind}", get(search))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health))
        .with_state(state.clone())
        .nest("/v1", catalog_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

/// Serve the catalog routes and the metrics endpoint until `shutdown` is cancelled.
pub async fn run_server(
    config: ServerConfig,
    sync_engine: GuardedSyncEngine,
    entity_store: GuardedEntityStore,
    shutdown: CancellationToken,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, sync_engine, entity_store);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Serving catalog on port {}", port);
    info!("Metrics available at port {}", metrics_port);

    let metrics_shutdown = shutdown.clone();
    let metrics_server = axum::serve(metrics_listener, make_metrics_app())
        .with_graceful_shutdown(async move { metrics_shutdown.cancelled().await });
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await });

    tokio::try_join!(
        async { server.await.context("Catalog server failed") },
        async { metrics_server.await.context("Metrics server failed") },
    )?;
    Ok(())
}
