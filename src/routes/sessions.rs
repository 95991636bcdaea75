use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::{
        command::{CommandRequest, DeliveryResponse, MessageRequest},
        room::RoomSnapshot,
    },
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Transport boundary: inbound commands, player messages and room snapshots.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions/{key}", get(get_session))
        .route("/sessions/{key}/commands", post(post_command))
        .route("/sessions/{key}/messages", post(post_message))
}

/// Open, join, begin or stop the session's lobby/match.
pub async fn post_command(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Json(payload): Json<CommandRequest>,
) -> Result<(StatusCode, Json<DeliveryResponse>), AppError> {
    payload.validate()?;
    let outcome =
        session_service::on_command(&state, &key, &payload.player_id, payload.command).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(DeliveryResponse {
            session: key,
            outcome,
        }),
    ))
}

/// Submit a phrase on behalf of a player.
pub async fn post_message(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Json(payload): Json<MessageRequest>,
) -> Result<(StatusCode, Json<DeliveryResponse>), AppError> {
    payload.validate()?;
    let outcome =
        session_service::on_player_message(&state, &key, &payload.player_id, &payload.text)
            .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(DeliveryResponse {
            session: key,
            outcome,
        }),
    ))
}

/// Current state of the session's room.
pub async fn get_session(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot = session_service::snapshot(&state, &key).await?;
    Ok(Json(snapshot))
}
