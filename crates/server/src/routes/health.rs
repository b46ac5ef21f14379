use axum::{
    Router, extract::State, http::StatusCode, response::Json as ResponseJson, routing::get,
};
use services::services::schema_check::{SchemaReport, check_schema};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// GET /api/health
/// 503 while the schema is incomplete.
pub async fn health(
    State(state): State<AppState>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<SchemaReport>>), ApiError> {
    let report = check_schema(&state.db().pool).await?;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok((status, ResponseJson(ApiResponse::success(report))))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
