// HTTP + WebSocket routes for the histogram widget

mod error;
mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::usage_repo::UsageRepo;
use crate::widget::WidgetHandle;

pub use error::ApiError;
pub use ws::ClientMessage;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) widget: WidgetHandle,
    pub(crate) usage_repo: Arc<UsageRepo>,
}

pub fn app(widget: WidgetHandle, usage_repo: Arc<UsageRepo>) -> Router {
    let state = AppState { widget, usage_repo };
    Router::new()
        .route("/", get(|| async { "usage-histogram: API usage summary" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/histogram", get(http::histogram_handler)) // GET /api/histogram
        .route(
            "/api/histogram/granularity",
            post(http::select_granularity_handler),
        ) // POST /api/histogram/granularity
        .route("/api/histogram/drill-down", post(http::drill_down_handler)) // POST /api/histogram/drill-down
        .route("/api/requests", post(http::ingest_handler)) // POST /api/requests
        .route("/ws/histogram", get(ws::ws_histogram)) // WS /ws/histogram
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
