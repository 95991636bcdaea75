use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

/// Stream the notifications of every session.
pub async fn all_events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = sse_service::subscribe(&state);
    info!("New SSE connection");
    let handshake = sse_service::handshake(&state, None).await;
    sse_service::to_sse_stream(receiver, None, handshake)
}

/// Stream the notifications of one session.
pub async fn session_events(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = sse_service::subscribe(&state);
    info!(session = %key, "New session SSE connection");
    let handshake = sse_service::handshake(&state, Some(&key)).await;
    sse_service::to_sse_stream(receiver, Some(key), handshake)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/events", get(all_events))
        .route("/sessions/{key}/events", get(session_events))
}
