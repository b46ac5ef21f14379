use axum::{
    Router,
    extract::{OriginalUri, Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::locale::Locale;
use serde::Deserialize;
use serde_json::Value;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::{ListParams, cached};
use crate::{AppState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct LocaleParams {
    pub locale: Option<Locale>,
    pub practice_id: Option<Uuid>,
}

/// GET /api/practices
/// Display order unless a search text or sort is given.
pub async fn get_practices(
    State(state): State<AppState>,
    uri: OriginalUri,
    Query(params): Query<ListParams>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    let query = params.list_query()?;
    let refine = !params.q.trim().is_empty() || params.sort.is_some();
    cached(&state, &uri, async {
        Ok::<_, ApiError>(state
            .directory()
            .practices(params.locale(), refine.then_some(&query))
            .await?)
    })
    .await
}

/// GET /api/practices/{slug}
/// Accepts the slug of any locale's translation or the canonical slug.
pub async fn get_practice(
    State(state): State<AppState>,
    uri: OriginalUri,
    Path(slug): Path<String>,
    Query(params): Query<LocaleParams>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    let locale = params.locale.unwrap_or_default();
    cached(&state, &uri, async {
        state
            .directory()
            .practice_detail(&slug, locale)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("practice '{slug}'")))
    })
    .await
}

/// GET /api/services
pub async fn get_services(
    State(state): State<AppState>,
    uri: OriginalUri,
    Query(params): Query<LocaleParams>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    let locale = params.locale.unwrap_or_default();
    cached(&state, &uri, async {
        Ok::<_, ApiError>(state
            .directory()
            .services(locale, params.practice_id)
            .await?)
    })
    .await
}

/// GET /api/banners
/// Active banners of one locale, in position order.
pub async fn get_banners(
    State(state): State<AppState>,
    uri: OriginalUri,
    Query(params): Query<LocaleParams>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    let locale = params.locale.unwrap_or_default();
    cached(&state, &uri, async {
        Ok::<_, ApiError>(state.directory().banners(locale).await?)
    })
    .await
}

/// GET /api/team
pub async fn get_team(
    State(state): State<AppState>,
    uri: OriginalUri,
    Query(params): Query<LocaleParams>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    let locale = params.locale.unwrap_or_default();
    cached(&state, &uri, async {
        Ok::<_, ApiError>(state.directory().team(locale).await?)
    })
    .await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/practices", get(get_practices))
        .route("/practices/{slug}", get(get_practice))
        .route("/services", get(get_services))
        .route("/banners", get(get_banners))
        .route("/team", get(get_team))
}
