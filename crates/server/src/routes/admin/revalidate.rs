use axum::{
    Json, Router, extract::State, response::Json as ResponseJson, routing::post,
};
use services::services::revalidation::{RevalidateOutcome, RevalidateRequest};
use tracing::{info, warn};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, routes::revalidate::invalidate};

/// POST /api/admin/revalidate
/// Clears this server's cache under `path`, then asks the front end to do
/// the same when a front-end URL is configured.
pub async fn revalidate(
    State(state): State<AppState>,
    request: Option<Json<RevalidateRequest>>,
) -> Result<ResponseJson<ApiResponse<RevalidateOutcome>>, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let invalidated = invalidate(&state, request.path.as_deref()).await;

    let frontend_notified = match state.frontend() {
        Some(client) => {
            client.revalidate(request.path.as_deref()).await?;
            true
        }
        None => {
            warn!("No front-end revalidation URL configured; only the local cache was cleared");
            false
        }
    };
    info!(path = ?request.path, invalidated, frontend_notified, "Admin revalidation");

    Ok(ResponseJson(ApiResponse::success(RevalidateOutcome {
        path: request.path,
        invalidated,
        frontend_notified,
    })))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/revalidate", post(revalidate))
}
