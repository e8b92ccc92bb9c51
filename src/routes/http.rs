// GET/POST handlers: version, histogram view, granularity, drill-down, ingest

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;
use crate::models::{ApiRequest, Granularity, HistogramView};
use crate::version::{NAME, VERSION};

/// GET /version: service name and version from Cargo.toml.
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/histogram: latest published view.
pub(super) async fn histogram_handler(State(state): State<AppState>) -> Json<HistogramView> {
    Json(state.widget.current_view())
}

#[derive(Debug, Deserialize)]
pub(super) struct SelectGranularityBody {
    /// Selector name, singular or plural ("minute", "minutes").
    granularity: String,
}

/// POST /api/histogram/granularity
pub(super) async fn select_granularity_handler(
    State(state): State<AppState>,
    Json(body): Json<SelectGranularityBody>,
) -> Result<StatusCode, ApiError> {
    let granularity: Granularity = body.granularity.parse()?;
    state.widget.select_granularity(granularity).await?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
pub(super) struct DrillDownBody {
    timestamp: i64,
}

/// POST /api/histogram/drill-down: `applied` is false at the finest granularity.
pub(super) async fn drill_down_handler(
    State(state): State<AppState>,
    Json(body): Json<DrillDownBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let applied = state.widget.drill_down(body.timestamp).await?;
    Ok(Json(serde_json::json!({ "applied": applied })))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum IngestBody {
    Many(Vec<ApiRequest>),
    One(ApiRequest),
}

/// POST /api/requests: record one request event or a batch.
pub(super) async fn ingest_handler(
    State(state): State<AppState>,
    Json(body): Json<IngestBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let requests = match body {
        IngestBody::Many(v) => v,
        IngestBody::One(r) => vec![r],
    };
    if let Some(bad) = requests.iter().find(|r| r.api_name.trim().is_empty()) {
        return Err(ApiError::Validation(format!(
            "apiName must be non-empty (requestedAt {})",
            bad.requested_at
        )));
    }
    state.usage_repo.record_requests(&requests).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "recorded": requests.len() })),
    ))
}
