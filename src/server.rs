//! # HTTP Server
//!
//! Serves the tenant API alongside the operational endpoints: liveness and
//! readiness probes and the Prometheus metrics scrape. Readiness flips on
//! only after the listener is bound.
//!
//! Callers identify themselves with the `x-owner-id` header; authentication
//! is terminated upstream and the header is trusted here.

use crate::error::LifecycleError;
use crate::lifecycle::TenantController;
use crate::observability::metrics;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

const OWNER_HEADER: &str = "x-owner-id";

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct ServerState {
    pub is_ready: Arc<AtomicBool>,
    pub controller: Arc<TenantController>,
}

impl ServerState {
    pub fn new(controller: Arc<TenantController>) -> Self {
        Self {
            is_ready: Arc::new(AtomicBool::new(false)),
            controller,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateTenantRequest {
    name: String,
}

/// Bind the listener and serve until shutdown
pub async fn start_server(port: u16, state: ServerState) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .route("/tenants", post(create_tenant).get(list_tenants))
        .route("/tenants/{id}", delete(delete_tenant))
        .route("/tenants/{id}/status", get(tenant_status))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    state.is_ready.store(true, Ordering::SeqCst);
    info!(port, "HTTP server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn readyz(State(state): State<ServerState>) -> StatusCode {
    if state.is_ready.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics_handler() -> Response {
    match metrics::render() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn create_tenant(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(request): Json<CreateTenantRequest>,
) -> Response {
    let owner = match owner_id(&headers) {
        Ok(owner) => owner,
        Err(response) => return response,
    };

    match state.controller.create(&owner, &request.name).await {
        Ok(tenant) => (StatusCode::CREATED, Json(tenant)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_tenants(State(state): State<ServerState>, headers: HeaderMap) -> Response {
    let owner = match owner_id(&headers) {
        Ok(owner) => owner,
        Err(response) => return response,
    };

    match state.controller.list(&owner).await {
        Ok(tenants) => Json(tenants).into_response(),
        Err(e) => error_response(e),
    }
}

async fn delete_tenant(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let owner = match owner_id(&headers) {
        Ok(owner) => owner,
        Err(response) => return response,
    };

    match state.controller.delete(&owner, &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn tenant_status(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let owner = match owner_id(&headers) {
        Ok(owner) => owner,
        Err(response) => return response,
    };

    match state.controller.component_statuses(&owner, &id).await {
        Ok(statuses) => Json(json!({ "components": statuses })).into_response(),
        Err(e) => error_response(e),
    }
}

fn owner_id(headers: &HeaderMap) -> Result<String, Response> {
    headers
        .get(OWNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "missing x-owner-id header" })),
            )
                .into_response()
        })
}

fn error_response(error: LifecycleError) -> Response {
    let status = match &error {
        LifecycleError::Validation(_) => StatusCode::BAD_REQUEST,
        LifecycleError::TenantNotFound(_) => StatusCode::NOT_FOUND,
        LifecycleError::NotOwner { .. } => StatusCode::FORBIDDEN,
        LifecycleError::Store(_) | LifecycleError::Internal(_) => {
            error!(error = %error, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}
