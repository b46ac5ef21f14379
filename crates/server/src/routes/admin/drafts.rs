use std::{convert::Infallible, time::Duration};

use axum::{
    Router,
    extract::State,
    response::{
        Json as ResponseJson,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures_util::{Stream, stream};
use serde::Serialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::AppState;

#[derive(Debug, Clone, Copy, Serialize, TS)]
pub struct DraftCount {
    pub drafts: i64,
}

/// GET /api/admin/drafts/count
pub async fn draft_count(State(state): State<AppState>) -> ResponseJson<ApiResponse<DraftCount>> {
    ResponseJson(ApiResponse::success(DraftCount {
        drafts: state.drafts().current(),
    }))
}

/// GET /api/admin/drafts/stream
/// Sends the current count, then every change to it.
pub async fn draft_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut updates = state.drafts().subscribe();
    updates.mark_changed();

    let events = stream::unfold(updates, |mut updates| async move {
        updates.changed().await.ok()?;
        let drafts = *updates.borrow_and_update();
        let event = Event::default()
            .event("drafts")
            .json_data(DraftCount { drafts })
            .unwrap_or_else(|_| Event::default().event("drafts").data(drafts.to_string()));
        Some((Ok(event), updates))
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/drafts/count", get(draft_count))
        .route("/drafts/stream", get(draft_stream))
}
