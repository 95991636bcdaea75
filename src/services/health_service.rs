use tracing::warn;

use crate::{dto::health::HealthResponse, error::ServiceError, state::SharedState};

/// Probe the installed phrase store, if any.
async fn probe_store(state: &SharedState) -> Result<(), ServiceError> {
    let store = state.require_phrase_store().await?;
    store.health_check().await?;
    Ok(())
}

/// Report degraded mode while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if let Err(err) = probe_store(state).await {
        warn!(error = %err, "phrase store unavailable");
    }

    let dictionary_size = state.dictionary().len();
    let rooms = state.registry().len();
    if state.is_degraded().await {
        HealthResponse::degraded(dictionary_size, rooms)
    } else {
        HealthResponse::ok(dictionary_size, rooms)
    }
}
