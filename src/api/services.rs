// Service status and control endpoints

use super::AppState;
use crate::error::SwitchError;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/services/status", get(all_status))
        .route("/api/services/:key/status", get(service_status))
        .route("/api/services/:key/start", post(start_service))
        .route("/api/services/:key/stop", post(stop_service))
        .route("/api/services/:key/restart", post(restart_service))
}

#[derive(Debug, Serialize)]
pub struct StatusEntry {
    pub name: String,
    pub active: bool,
    pub unit: String,
    pub port: u16,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatusResponse {
    pub service: String,
    pub name: String,
    pub active: bool,
    pub port: u16,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub status: &'static str,
    pub service: String,
}

/// GET /api/services/status
async fn all_status(State(coordinator): State<AppState>) -> Json<BTreeMap<String, StatusEntry>> {
    let statuses = coordinator
        .status_all()
        .await
        .into_iter()
        .map(|status| {
            (
                status.key,
                StatusEntry {
                    name: status.name,
                    active: status.active,
                    unit: status.unit,
                    port: status.port,
                },
            )
        })
        .collect();

    Json(statuses)
}

/// GET /api/services/:key/status
async fn service_status(
    State(coordinator): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ServiceStatusResponse>, SwitchError> {
    let status = coordinator.status_of(&key).await?;
    Ok(Json(ServiceStatusResponse {
        service: status.key,
        name: status.name,
        active: status.active,
        port: status.port,
    }))
}

/// POST /api/services/:key/start
async fn start_service(
    State(coordinator): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ActionResponse>, SwitchError> {
    coordinator.start(&key).await?;
    Ok(Json(ActionResponse {
        status: "started",
        service: key,
    }))
}

/// POST /api/services/:key/stop
async fn stop_service(
    State(coordinator): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ActionResponse>, SwitchError> {
    coordinator.stop(&key).await?;
    Ok(Json(ActionResponse {
        status: "stopped",
        service: key,
    }))
}

/// POST /api/services/:key/restart
async fn restart_service(
    State(coordinator): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ActionResponse>, SwitchError> {
    coordinator.restart(&key).await?;
    Ok(Json(ActionResponse {
        status: "restarted",
        service: key,
    }))
}
