use std::time::SystemTime;

use serde::Serialize;

use crate::{
    config::ChainMode,
    dto::format_system_time,
    services::validation::Rejection,
    state::game::MatchMode,
};

/// Outbound message addressed to one session.
///
/// Adapters render their own wording from the typed `kind`; nothing here is
/// user-facing text.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// Session key the notification belongs to.
    pub session: String,
    /// RFC 3339 emission timestamp.
    pub at: String,
    /// What happened.
    #[serde(flatten)]
    pub kind: NotificationKind,
}

impl Notification {
    /// Stamp `kind` with the current time.
    pub fn new(session: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            session: session.into(),
            at: format_system_time(SystemTime::now()),
            kind,
        }
    }
}

/// Why a player left the alive set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EliminationCause {
    /// The turn budget ran out.
    Timeout,
    /// A rejected phrase with no strike budget left.
    Rejected {
        /// Category of the final rejection.
        reason: Rejection,
    },
}

/// Every event a room can emit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationKind {
    /// A lobby opened (or was reset) for the session.
    LobbyOpened {
        /// Player who issued the open.
        opened_by: String,
        /// Seconds until the lobby begins on its own.
        auto_begin_secs: u64,
        /// Whether an existing lobby was reset.
        reopened: bool,
    },
    /// A player entered the lobby.
    PlayerJoined {
        /// Player concerned.
        player: String,
        /// Lobby size after the join.
        participants: usize,
    },
    /// The player was already in the lobby.
    AlreadyJoined {
        /// Player concerned.
        player: String,
    },
    /// Join or begin arrived while no lobby was open.
    NoLobby {
        /// Player concerned.
        player: String,
    },
    /// The lobby closed and turns begin.
    MatchStarted {
        /// Solo or multiplayer.
        mode: MatchMode,
        /// Turn order.
        order: Vec<String>,
        /// Tokens required per phrase.
        word_count: usize,
        /// Minimum characters per token.
        min_token_len: usize,
        /// Chaining rule in force.
        chain_mode: ChainMode,
        /// Seconds per turn.
        turn_secs: u64,
    },
    /// A player is now on turn.
    TurnStarted {
        /// Player concerned.
        player: String,
        /// Token (or rhyme) the next phrase must start with; `None` on the opening move.
        required_link: Option<String>,
        /// Seconds per turn.
        turn_secs: u64,
    },
    /// The current player has not answered yet.
    Reminder {
        /// Player concerned.
        player: String,
        /// Seconds left in the turn.
        remaining_secs: u64,
    },
    /// A phrase joined the chain.
    Accepted {
        /// Player concerned.
        player: String,
        /// Normalized phrase.
        phrase: String,
    },
    /// The bot answered in a solo match.
    BotMoved {
        /// Normalized phrase.
        phrase: String,
    },
    /// A phrase was refused and the player is out.
    Rejected {
        /// Player concerned.
        player: String,
        /// Rejection category.
        reason: Rejection,
    },
    /// Rejection absorbed by the strike budget; the player keeps the turn.
    Strike {
        /// Player concerned.
        player: String,
        /// Rejection category.
        reason: Rejection,
        /// Strikes left before a rejection eliminates.
        remaining: u32,
    },
    /// A player left the alive set.
    Eliminated {
        /// Player concerned.
        player: String,
        /// Why the player left.
        cause: EliminationCause,
    },
    /// The match ended with a single survivor.
    Winner {
        /// Player concerned.
        player: String,
    },
    /// The match ended without a human survivor (the bot won a solo match).
    NoWinner,
    /// The lobby closed without starting a match.
    LobbyCancelled,
    /// The match was stopped on request.
    Stopped {
        /// Player who issued the stop.
        by: String,
    },
}

impl NotificationKind {
    /// Event name used on the SSE stream.
    pub fn name(&self) -> &'static str {
        match self {
            NotificationKind::LobbyOpened { .. } => "lobby_opened",
            NotificationKind::PlayerJoined { .. } => "player_joined",
            NotificationKind::AlreadyJoined { .. } => "already_joined",
            NotificationKind::NoLobby { .. } => "no_lobby",
            NotificationKind::MatchStarted { .. } => "match_started",
            NotificationKind::TurnStarted { .. } => "turn_started",
            NotificationKind::Reminder { .. } => "reminder",
            NotificationKind::Accepted { .. } => "accepted",
            NotificationKind::BotMoved { .. } => "bot_moved",
            NotificationKind::Rejected { .. } => "rejected",
            NotificationKind::Strike { .. } => "strike",
            NotificationKind::Eliminated { .. } => "eliminated",
            NotificationKind::Winner { .. } => "winner",
            NotificationKind::NoWinner => "no_winner",
            NotificationKind::LobbyCancelled => "lobby_cancelled",
            NotificationKind::Stopped { .. } => "stopped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_flat_with_type_tag() {
        let notification = Notification::new(
            "room-1",
            NotificationKind::Eliminated {
                player: "alice".into(),
                cause: EliminationCause::Rejected {
                    reason: Rejection::ChainMismatch,
                },
            },
        );
        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["session"], "room-1");
        assert_eq!(value["type"], "eliminated");
        assert_eq!(value["player"], "alice");
        assert_eq!(value["cause"]["kind"], "rejected");
        assert_eq!(value["cause"]["reason"], "chain_mismatch");
        assert!(value["at"].as_str().is_some_and(|at| at.contains('T')));
    }

    #[test]
    fn name_matches_serde_tag() {
        for kind in [
            NotificationKind::NoWinner,
            NotificationKind::LobbyCancelled,
            NotificationKind::BotMoved {
                phrase: "mèo mướp".into(),
            },
        ] {
            let value = serde_json::to_value(&kind).unwrap();
            assert_eq!(value["type"], kind.name());
        }
    }
}
