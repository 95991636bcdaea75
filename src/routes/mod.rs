use axum::Router;

use crate::state::SharedState;

/// Health endpoint.
pub mod health;
/// Session commands, messages and snapshots.
pub mod sessions;
/// Server-sent event streams.
pub mod sse;

/// Compose all route trees, wiring in shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(sessions::router())
        .merge(sse::router())
        .with_state(state)
}
