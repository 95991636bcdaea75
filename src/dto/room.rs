use serde::Serialize;

use crate::state::{game::MatchMode, state_machine::MatchPhase};

/// Point-in-time view of one room, answered by its actor.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    /// Session key.
    pub session: String,
    /// Current match phase.
    pub phase: MatchPhase,
    /// Fixed once the lobby closes.
    pub mode: Option<MatchMode>,
    /// Join order in the lobby, shuffled turn order afterwards.
    pub participants: Vec<String>,
    /// Players still in the match.
    pub alive: Vec<String>,
    /// Player on turn, if a match is running.
    pub current_player: Option<String>,
    /// Last accepted phrase.
    pub chain: Option<String>,
    /// Number of phrases played so far.
    pub used_count: usize,
    /// A move is waiting on the remote dictionary.
    pub pending_move: bool,
    /// Generation of the armed timers.
    pub timer_generation: u64,
    /// State machine version.
    pub version: usize,
}
