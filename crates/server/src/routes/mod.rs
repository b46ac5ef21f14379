use axum::{
    Router,
    extract::OriginalUri,
    http::{HeaderValue, Method},
    response::Json as ResponseJson,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use services::services::listing::{ListQuery, Pagination, SortKey};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub mod access_requests;
pub mod admin;
pub mod directory;
pub mod health;
pub mod news;
pub mod revalidate;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(health::router())
        .merge(news::router())
        .merge(directory::router())
        .merge(access_requests::router())
        .merge(revalidate::router())
        .nest("/admin", admin::router());

    Router::new()
        .nest("/api", api)
        .nest_service("/storage", ServeDir::new(&state.config().storage_root))
        .layer(cors(&state.config().cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if parsed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(parsed)
    }
}

/// Query string shared by the public list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub locale: Option<db::models::locale::Locale>,
    #[serde(default)]
    pub q: String,
    /// Comma-separated category ids.
    pub categories: Option<String>,
    pub sort: Option<String>,
    /// Results currently shown; "load more" sends the previous value plus a page.
    pub shown: Option<usize>,
}

impl ListParams {
    pub fn locale(&self) -> db::models::locale::Locale {
        self.locale.unwrap_or_default()
    }

    pub fn list_query(&self) -> Result<ListQuery, ApiError> {
        let sort = match self.sort.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<SortKey>()
                .map_err(|_| ApiError::BadRequest(format!("unknown sort '{raw}'")))?,
            None => SortKey::default(),
        };
        let categories = self
            .categories
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<Uuid>()
                    .map_err(|_| ApiError::BadRequest(format!("invalid category id '{s}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ListQuery::new(self.q.clone())
            .with_categories(categories)
            .sorted_by(sort))
    }

    pub fn pagination(&self, page_size: usize) -> Pagination {
        match self.shown {
            Some(shown) => Pagination::showing(page_size, shown),
            None => Pagination::new(page_size),
        }
    }
}

/// Serves the response for `uri` from the site cache, building it on a miss.
pub async fn cached<T, F>(
    state: &AppState,
    uri: &OriginalUri,
    build: F,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError>
where
    T: Serialize,
    F: Future<Output = Result<T, ApiError>>,
{
    let key = services::services::site_cache::SiteCache::key(uri.0.path(), uri.0.query());
    let value = state
        .cache()
        .get_or_try_insert(key, async { Ok::<_, ApiError>(serde_json::to_value(build.await?)?) })
        .await?;
    Ok(ResponseJson(ApiResponse::success((*value).clone())))
}
