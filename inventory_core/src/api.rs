//! HTTP invocation surface: two POST entrypoints over the dispatcher
//! and the competitor aggregator.
//!
//! Auth and tenant provisioning are external collaborators; the only tenant
//! context this layer handles is the `X-Tenant-Id` header the competitor
//! endpoint needs to scope its writes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::db::connection::connect_sqlite;
use crate::pipeline::PipelineContext;
use crate::repo::RepoError;
use crate::{competitor, dispatcher};

/// Shared handler state. Connections are opened per request; the pipeline
/// context (HTTP clients, settings) is long-lived.
#[derive(Clone)]
pub struct AppState {
    pub database_url: String,
    pub ctx: Arc<PipelineContext>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/inventory/scrape", post(scrape_inventory))
        .route("/competitor/scrape", post(scrape_competitor))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScrapeRequest {
    tenant: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompetitorRequest {
    competitor_url: String,
}

/// `POST /inventory/scrape` — body `{}` runs every eligible tenant,
/// `{"tenant": "<id>"}` runs one.
async fn scrape_inventory(
    State(state): State<AppState>,
    Json(req): Json<ScrapeRequest>,
) -> Response {
    let mut conn = match connect_sqlite(&state.database_url) {
        Ok(conn) => conn,
        Err(e) => return internal_error(e.to_string()),
    };

    let outcome = match &req.tenant {
        Some(tenant) => dispatcher::run_single(&state.ctx, &mut conn, tenant).await,
        None => dispatcher::run_all(&state.ctx, &mut conn).await,
    };

    match outcome {
        Ok(response) => Json(response).into_response(),
        // dispatcher-level failures (unknown tenant, store unavailable) are
        // 500-class with the error's message
        Err(e) => internal_error(e.to_string()),
    }
}

/// `POST /competitor/scrape` — scans one competitor URL for the tenant named
/// in `X-Tenant-Id` and returns the aggregated statistics record.
async fn scrape_competitor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CompetitorRequest>,
) -> Response {
    let Some(tenant_id) = headers
        .get("x-tenant-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    else {
        return bad_request("missing X-Tenant-Id header".to_string());
    };

    let mut conn = match connect_sqlite(&state.database_url) {
        Ok(conn) => conn,
        Err(e) => return internal_error(e.to_string()),
    };

    // the tenant must exist before any writes are scoped to it
    if let Err(e) = crate::repo::get_tenant(&mut conn, tenant_id) {
        return match e {
            RepoError::TenantNotFound(id) => bad_request(format!("unknown tenant: {id}")),
            other => internal_error(other.to_string()),
        };
    }

    match competitor::scan(&state.ctx, &mut conn, tenant_id, &req.competitor_url).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => internal_error(e.to_string()),
    }
}

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"success": false, "message": message})),
    )
        .into_response()
}

fn internal_error(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"success": false, "message": message})),
    )
        .into_response()
}
