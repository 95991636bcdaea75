//! Inbound transport operations: commands and player messages routed to rooms.

use tracing::{debug, info};

use crate::{
    dto::{
        command::{CommandKind, DeliveryOutcome},
        notification::{Notification, NotificationKind},
        room::RoomSnapshot,
    },
    error::ServiceError,
    services::room::RoomCommand,
    state::{Notifier, RegistryError, SharedState},
};

/// Route a lobby/match command from `player` to the session's room.
///
/// `open` creates or resets the lobby; the other commands need a live room.
pub async fn on_command(
    state: &SharedState,
    key: &str,
    player: &str,
    command: CommandKind,
) -> Result<DeliveryOutcome, ServiceError> {
    let registry = state.registry();
    let player = player.to_string();
    let message = match command {
        CommandKind::Open => {
            let handle = registry.open_lobby(key, &player).await?;
            info!(session = %key, %player, room = %handle.id(), "lobby open");
            return Ok(DeliveryOutcome::Delivered);
        }
        CommandKind::Join => RoomCommand::Join {
            player: player.clone(),
        },
        CommandKind::Begin => RoomCommand::Begin {
            player: player.clone(),
        },
        CommandKind::Stop => RoomCommand::Stop {
            player: player.clone(),
        },
    };

    let Some(handle) = registry.get(key) else {
        debug!(session = %key, %player, ?command, "no room for command");
        match command {
            CommandKind::Stop => return Ok(DeliveryOutcome::Ignored),
            CommandKind::Join => state
                .notifications()
                .notify(Notification::new(key, NotificationKind::NoLobby { player })),
            _ => {}
        }
        return Err(RegistryError::NoSuchRoom.into());
    };

    handle.send(message).await?;
    Ok(DeliveryOutcome::Delivered)
}

/// Forward a free-text message to the session's room.
///
/// Out-of-turn input is dropped by the room itself, so delivery says nothing
/// about acceptance.
pub async fn on_player_message(
    state: &SharedState,
    key: &str,
    player: &str,
    text: &str,
) -> Result<DeliveryOutcome, ServiceError> {
    let Some(handle) = state.registry().get(key) else {
        return Err(RegistryError::NoSuchRoom.into());
    };
    handle
        .send(RoomCommand::Phrase {
            player: player.to_string(),
            text: text.to_string(),
        })
        .await?;
    Ok(DeliveryOutcome::Delivered)
}

/// Ask the session's room for a snapshot.
pub async fn snapshot(state: &SharedState, key: &str) -> Result<RoomSnapshot, ServiceError> {
    let handle = state.registry().get(key).ok_or(RegistryError::NoSuchRoom)?;
    Ok(handle.snapshot().await?)
}
