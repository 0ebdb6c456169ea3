// HTTP API: handlers and router assembly

pub mod dashboard;
pub mod resources;
pub mod services;


use crate::coordinator::ServiceCoordinator;
use crate::error::SwitchError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared handler state
pub type AppState = Arc<ServiceCoordinator>;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for SwitchError {
    fn into_response(self) -> Response {
        let status = match &self {
            SwitchError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the complete API router
pub fn router(coordinator: AppState) -> Router {
    Router::new()
        .merge(dashboard::router())
        .merge(services::router())
        .merge(resources::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(coordinator)
}
