// Resource telemetry endpoint

use super::AppState;
use crate::coordinator::ResourceSnapshot;
use crate::error::SwitchError;
use axum::{extract::State, routing::get, Json, Router};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/resources/stats", get(resource_stats))
}

/// GET /api/resources/stats
async fn resource_stats(
    State(coordinator): State<AppState>,
) -> Result<Json<ResourceSnapshot>, SwitchError> {
    Ok(Json(coordinator.snapshot().await?))
}
