use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use services::services::category_admin::{CategoryAdmin, CategoryForm, CategoryRecord};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

fn admin(state: &AppState) -> CategoryAdmin {
    CategoryAdmin::new(state.admin())
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<CategoryRecord>>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).list().await?)))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(form): Json<CategoryForm>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<CategoryRecord>>), ApiError> {
    let category = admin(&state).create(form).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(category))))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<CategoryRecord>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).get(id).await?)))
}

/// PUT /api/admin/categories/{id}
/// Rejects a parent inside the category's own subtree.
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<CategoryForm>,
) -> Result<ResponseJson<ApiResponse<CategoryRecord>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).update(id, form).await?)))
}

/// DELETE /api/admin/categories/{id}
/// Children move up one level; its posts become uncategorized.
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    admin(&state).delete(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
}
