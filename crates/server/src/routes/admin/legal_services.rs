use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use serde::Deserialize;
use services::services::service_admin::{ServiceAdmin, ServiceForm, ServiceRecord};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct ServiceFilter {
    pub practice_id: Option<Uuid>,
}

fn admin(state: &AppState) -> ServiceAdmin {
    ServiceAdmin::new(state.admin())
}

pub async fn list_services(
    State(state): State<AppState>,
    Query(filter): Query<ServiceFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<ServiceRecord>>>, ApiError> {
    let services = admin(&state).list(filter.practice_id).await?;
    Ok(ResponseJson(ApiResponse::success(services)))
}

pub async fn create_service(
    State(state): State<AppState>,
    Json(form): Json<ServiceForm>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<ServiceRecord>>), ApiError> {
    let service = admin(&state).create(form).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(service))))
}

pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ServiceRecord>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).get(id).await?)))
}

pub async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<ServiceForm>,
) -> Result<ResponseJson<ApiResponse<ServiceRecord>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(admin(&state).update(id, form).await?)))
}

pub async fn delete_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    admin(&state).delete(id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services).post(create_service))
        .route(
            "/services/{id}",
            get(get_service).put(update_service).delete(delete_service),
        )
}
