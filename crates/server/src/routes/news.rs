use axum::{
    Router,
    extract::{OriginalUri, Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use serde_json::Value;
use utils::response::ApiResponse;

use super::{ListParams, cached};
use crate::{AppState, error::ApiError};

/// GET /api/news
/// Published posts grouped under their root category.
pub async fn get_news(
    State(state): State<AppState>,
    uri: OriginalUri,
    Query(params): Query<ListParams>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    let query = params.list_query()?;
    cached(&state, &uri, async {
        let snapshot = state.news().snapshot(params.locale()).await?;
        let groups = snapshot.grouped(&query)?;
        Ok::<_, ApiError>(serde_json::to_value(groups)?)
    })
    .await
}

/// GET /api/news/archive
/// Paged archive; selecting a category includes its subcategories.
pub async fn get_archive(
    State(state): State<AppState>,
    uri: OriginalUri,
    Query(params): Query<ListParams>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    let query = params.list_query()?;
    let pagination = params.pagination(state.config().page_size);
    cached(&state, &uri, async {
        let snapshot = state.news().snapshot(params.locale()).await?;
        Ok::<_, ApiError>(serde_json::to_value(snapshot.archive(&query, pagination))?)
    })
    .await
}

/// GET /api/posts
/// Paged list of every published post; category matching is exact.
pub async fn get_posts(
    State(state): State<AppState>,
    uri: OriginalUri,
    Query(params): Query<ListParams>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    let query = params.list_query()?;
    let pagination = params.pagination(state.config().page_size);
    cached(&state, &uri, async {
        let snapshot = state.news().snapshot(params.locale()).await?;
        Ok::<_, ApiError>(serde_json::to_value(snapshot.all_posts(&query, pagination))?)
    })
    .await
}

/// GET /api/posts/{slug}
pub async fn get_post(
    State(state): State<AppState>,
    uri: OriginalUri,
    Path(slug): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    cached(&state, &uri, async {
        state
            .news()
            .post_by_slug(&slug, params.locale())
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("post '{slug}'")))
    })
    .await
}

/// GET /api/categories
/// Category tree with post counts that include subcategories.
pub async fn get_categories(
    State(state): State<AppState>,
    uri: OriginalUri,
    Query(params): Query<ListParams>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    cached(&state, &uri, async {
        let snapshot = state.news().snapshot(params.locale()).await?;
        Ok::<_, ApiError>(snapshot.category_tree()?)
    })
    .await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/news", get(get_news))
        .route("/news/archive", get(get_archive))
        .route("/posts", get(get_posts))
        .route("/posts/{slug}", get(get_post))
        .route("/categories", get(get_categories))
}
