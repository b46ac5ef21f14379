use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::post,
};
use db::models::access_request::{AccessRequest, CreateAccessRequest};
use services::services::user_admin::UserAdmin;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// POST /api/access-requests
/// Public sign-up form for dashboard access.
pub async fn submit_access_request(
    State(state): State<AppState>,
    Json(payload): Json<CreateAccessRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<AccessRequest>>), ApiError> {
    let request = UserAdmin::new(state.admin()).submit_request(payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(request))))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/access-requests", post(submit_access_request))
}
