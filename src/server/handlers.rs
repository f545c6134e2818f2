//! Request handlers.

use crate::aggregator;
use crate::registry::PluginDescriptor;
use crate::server::error::ApiError;
use crate::server::models::{ScanAccepted, ScanRequest, ScanResultsResponse, ScanStatusResponse};
use crate::server::AppState;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

fn parse_scan_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("invalid scan id '{}'", raw)))
}

/// `POST /api/v1/scan`
pub async fn submit_scan(
    State(state): State<AppState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ScanAccepted>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let (target, config) = request.into_parts(state.orchestrator.config());

    let job = state.orchestrator.start_scan(target, config).await?;

    tracing::info!(
        job_id = %job.id,
        plugins = job.dispatched_plugins.len(),
        "Scan accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(ScanAccepted {
            scan_id: job.id,
            status: job.status,
        }),
    ))
}

/// `GET /api/v1/scan/{scan_id}/status`
pub async fn scan_status(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<Json<ScanStatusResponse>, ApiError> {
    let id = parse_scan_id(&scan_id)?;
    let job = state.orchestrator.get_status(id)?;
    Ok(Json(job.into()))
}

/// `GET /api/v1/scan/{scan_id}/results`
pub async fn scan_results(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<Json<ScanResultsResponse>, ApiError> {
    let id = parse_scan_id(&scan_id)?;
    let job = state.orchestrator.get_status(id)?;

    if !job.is_finished() {
        return Err(ApiError::conflict(format!(
            "scan {} is still {}",
            id, job.status
        )));
    }

    let findings = aggregator::aggregate_job(&job);
    Ok(Json(ScanResultsResponse::new(id, job.status, findings)))
}

/// `GET /api/v1/plugins`
pub async fn list_plugins(State(state): State<AppState>) -> Json<Vec<PluginDescriptor>> {
    Json(state.orchestrator.registry().descriptors())
}

/// `GET /health`
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
