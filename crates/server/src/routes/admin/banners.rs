use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::news_banner::NewsBanner;
use services::services::banner_admin::{BannerAdmin, BannerForm};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

fn admin(state: &AppState) -> BannerAdmin {
    BannerAdmin::new(state.admin())
}

pub async fn list_banners(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<NewsBanner>>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).list().await?)))
}

pub async fn create_banner(
    State(state): State<AppState>,
    Json(form): Json<BannerForm>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<NewsBanner>>), ApiError> {
    let banner = admin(&state).create(form).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(banner))))
}

pub async fn get_banner(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<NewsBanner>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).get(id).await?)))
}

pub async fn update_banner(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<BannerForm>,
) -> Result<ResponseJson<ApiResponse<NewsBanner>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).update(id, form).await?)))
}

pub async fn delete_banner(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    admin(&state).delete(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/banners", get(list_banners).post(create_banner))
        .route(
            "/banners/{id}",
            get(get_banner).put(update_banner).delete(delete_banner),
        )
}
