use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use services::services::practice_admin::{PracticeAdmin, PracticeForm, PracticeRecord};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

fn admin(state: &AppState) -> PracticeAdmin {
    PracticeAdmin::new(state.admin())
}

pub async fn list_practices(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<PracticeRecord>>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).list().await?)))
}

/// POST /api/admin/practices
/// Icon and cover image are both required.
pub async fn create_practice(
    State(state): State<AppState>,
    Json(form): Json<PracticeForm>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<PracticeRecord>>), ApiError> {
    let practice = admin(&state).create(form).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(practice))))
}

pub async fn get_practice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<PracticeRecord>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).get(id).await?)))
}

pub async fn update_practice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<PracticeForm>,
) -> Result<ResponseJson<ApiResponse<PracticeRecord>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).update(id, form).await?)))
}

pub async fn delete_practice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    admin(&state).delete(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/practices", get(list_practices).post(create_practice))
        .route(
            "/practices/{id}",
            get(get_practice).put(update_practice).delete(delete_practice),
        )
}
