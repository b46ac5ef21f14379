//! Dashboard endpoints. Authentication happens in front of this server.

use axum::Router;

use crate::AppState;

pub mod banners;
pub mod categories;
pub mod drafts;
pub mod legal_services;
pub mod posts;
pub mod practices;
pub mod revalidate;
pub mod users;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(posts::router())
        .merge(categories::router())
        .merge(practices::router())
        .merge(legal_services::router())
        .merge(banners::router())
        .merge(users::router())
        .merge(drafts::router())
        .merge(revalidate::router())
}
