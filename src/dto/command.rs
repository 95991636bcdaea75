//! Inbound transport payloads and their acknowledgements.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::validation::validate_player_id;

/// Lobby and match control commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Open (or re-open) the lobby.
    Open,
    /// Join the open lobby.
    Join,
    /// Close the lobby and start playing.
    Begin,
    /// Stop whatever is running.
    Stop,
}

/// Body of `POST /sessions/{key}/commands`.
#[derive(Debug, Deserialize, Validate)]
pub struct CommandRequest {
    /// Issuing player.
    #[validate(length(max = 128), custom(function = "validate_player_id"))]
    pub player_id: String,
    /// Command to run.
    pub command: CommandKind,
}

/// Body of `POST /sessions/{key}/messages`.
#[derive(Debug, Deserialize, Validate)]
pub struct MessageRequest {
    /// Sending player.
    #[validate(length(max = 128), custom(function = "validate_player_id"))]
    pub player_id: String,
    /// Raw phrase as typed.
    #[validate(length(min = 1, max = 256))]
    pub text: String,
}

/// What happened to an inbound request once routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Queued on the room actor.
    Delivered,
    /// Dropped before reaching a room (e.g. nothing to stop).
    Ignored,
}

/// Acknowledgement returned by the inbound endpoints.
#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    /// Session the request was routed to.
    pub session: String,
    /// Whether the request reached a room.
    pub outcome: DeliveryOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_request_parses_snake_case() {
        let request: CommandRequest =
            serde_json::from_str(r#"{"player_id": "alice", "command": "begin"}"#).unwrap();
        assert_eq!(request.command, CommandKind::Begin);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn message_request_rejects_blank_player_and_empty_text() {
        let request = MessageRequest {
            player_id: " ".into(),
            text: String::new(),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("player_id"));
        assert!(fields.contains_key("text"));
    }
}
