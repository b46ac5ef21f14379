use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    access_request::{AccessRequest, AccessRequestStatus},
    profile::{Profile, ProfileRole},
};
use serde::Deserialize;
use services::services::user_admin::{ApproveRequest, UserAdmin};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct RoleChange {
    pub role: ProfileRole,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestFilter {
    pub status: Option<AccessRequestStatus>,
}

fn admin(state: &AppState) -> UserAdmin {
    UserAdmin::new(state.admin())
}

pub async fn list_profiles(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Profile>>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).profiles().await?)))
}

/// PUT /api/admin/profiles/{id}/role
/// The last admin keeps the admin role.
pub async fn change_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(change): Json<RoleChange>,
) -> Result<ResponseJson<ApiResponse<Profile>>, ApiError> {
    let profile = admin(&state).set_role(id, change.role).await?;
    Ok(ResponseJson(ApiResponse::success(profile)))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    admin(&state).delete_profile(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn list_requests(
    State(state): State<AppState>,
    Query(filter): Query<RequestFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<AccessRequest>>>, ApiError> {
    let requests = admin(&state).requests(filter.status).await?;
    Ok(ResponseJson(ApiResponse::success(requests)))
}

/// POST /api/admin/access-requests/{id}/approve
/// Creates the profile (editor unless a role is given) and closes the request.
pub async fn approve_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    approval: Option<Json<ApproveRequest>>,
) -> Result<ResponseJson<ApiResponse<Profile>>, ApiError> {
    let approval = approval.map(|Json(a)| a).unwrap_or_default();
    let profile = admin(&state).approve(id, approval).await?;
    Ok(ResponseJson(ApiResponse::success(profile)))
}

pub async fn reject_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<AccessRequest>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).reject(id).await?)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profiles", get(list_profiles))
        .route("/profiles/{id}", axum::routing::delete(delete_profile))
        .route("/profiles/{id}/role", put(change_role))
        .route("/access-requests", get(list_requests))
        .route("/access-requests/{id}/approve", post(approve_request))
        .route("/access-requests/{id}/reject", post(reject_request))
}
