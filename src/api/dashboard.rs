// Browser control panel

use super::AppState;
use axum::{response::Html, routing::get, Router};

const CONTROL_PANEL: &str = include_str!("dashboard.html");

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(control_panel))
}

/// GET /
async fn control_panel() -> Html<&'static str> {
    Html(CONTROL_PANEL)
}
