use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::post::PostStatus;
use serde::Deserialize;
use services::services::post_admin::{PostAdmin, PostForm, PostRecord};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
}

fn admin(state: &AppState) -> PostAdmin {
    PostAdmin::new(state.admin())
}

/// GET /api/admin/posts
pub async fn list_posts(
    State(state): State<AppState>,
    Query(filter): Query<PostFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<PostRecord>>>, ApiError> {
    let posts = admin(&state).list(filter.status).await?;
    Ok(ResponseJson(ApiResponse::success(posts)))
}

/// POST /api/admin/posts
/// Always creates a draft.
pub async fn create_post(
    State(state): State<AppState>,
    Json(form): Json<PostForm>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<PostRecord>>), ApiError> {
    let post = admin(&state).create_draft(form).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(post))))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<PostRecord>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).get(id).await?)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<PostForm>,
) -> Result<ResponseJson<ApiResponse<PostRecord>>, ApiError> {
    let post = admin(&state).update(id, form).await?;
    Ok(ResponseJson(ApiResponse::success(post)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    admin(&state).delete(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// POST /api/admin/posts/{id}/publish
pub async fn publish_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<PostRecord>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).publish(id).await?)))
}

/// POST /api/admin/posts/{id}/unpublish
pub async fn unpublish_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<PostRecord>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).unpublish(id).await?)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/posts/{id}/publish", post(publish_post))
        .route("/posts/{id}/unpublish", post(unpublish_post))
}
