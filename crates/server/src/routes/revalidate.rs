use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    response::Json as ResponseJson,
    routing::post,
};
use serde::Deserialize;
use services::services::revalidation::{RevalidateOutcome, RevalidateRequest, TOKEN_HEADER};
use tracing::{info, warn};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct RevalidateParams {
    pub secret: Option<String>,
    pub path: Option<String>,
}

/// Drops cached responses under `path`, or all of them.
pub async fn invalidate(state: &AppState, path: Option<&str>) -> usize {
    match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(prefix) => state.cache().invalidate_prefix(prefix).await,
        None => {
            state.cache().invalidate_all().await;
            0
        }
    }
}

/// POST /api/revalidate
/// Token in the `x-revalidate-token` header or `?secret=`; path in the JSON
/// body or `?path=`.
pub async fn revalidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<RevalidateParams>,
    body: Bytes,
) -> Result<ResponseJson<ApiResponse<RevalidateOutcome>>, ApiError> {
    let presented = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .or(params.secret.as_deref())
        .unwrap_or_default();
    if !state.token().verify(presented) {
        warn!("Revalidation rejected: bad or missing token");
        return Err(ApiError::Unauthorized);
    }

    let request: RevalidateRequest = if body.is_empty() {
        RevalidateRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid revalidate body: {e}")))?
    };
    let path = request.path.or(params.path);
    let invalidated = invalidate(&state, path.as_deref()).await;
    info!(path = ?path, invalidated, "Cache revalidated");

    Ok(ResponseJson(ApiResponse::success(RevalidateOutcome {
        path,
        invalidated,
        frontend_notified: false,
    })))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/revalidate", post(revalidate))
}
