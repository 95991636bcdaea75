use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use rand::{Rng, seq::SliceRandom};
use serde::Serialize;

use crate::services::validation::ChainContext;

/// Who the single human plays against, fixed when the lobby closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Two or more humans take turns.
    Multiplayer,
    /// One human answers, the bot replies.
    SoloVsBot,
}

/// Per-room runtime data for the lobby and the match that follows it.
///
/// The alive ordering is the shuffled participant order minus everyone
/// eliminated so far; the cursor always indexes into it modulo its length.
#[derive(Debug, Clone)]
pub struct Match {
    participants: IndexSet<String>,
    alive: IndexSet<String>,
    cursor: usize,
    chain: Option<String>,
    used: HashSet<String>,
    strikes: HashMap<String, u32>,
    spoke_in_turn: bool,
    mode: MatchMode,
}

impl Default for Match {
    fn default() -> Self {
        Self {
            participants: IndexSet::new(),
            alive: IndexSet::new(),
            cursor: 0,
            chain: None,
            used: HashSet::new(),
            strikes: HashMap::new(),
            spoke_in_turn: false,
            mode: MatchMode::Multiplayer,
        }
    }
}

impl Match {
    /// Empty lobby.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant; returns `false` if they had already joined.
    pub fn join(&mut self, player: &str) -> bool {
        self.participants.insert(player.to_string())
    }

    /// Forget every participant of a lobby that is being re-opened.
    pub fn reset_lobby(&mut self) {
        *self = Self::default();
    }

    /// Lobby members, in turn order once started.
    pub fn participants(&self) -> &IndexSet<String> {
        &self.participants
    }

    /// Players still in the match, in turn order.
    pub fn alive(&self) -> &IndexSet<String> {
        &self.alive
    }

    /// Solo or multiplayer, fixed when the match starts.
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Index of the current player in the alive set.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Shuffle participants once and seed the alive ordering.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<String> = self.participants.drain(..).collect();
        order.shuffle(rng);
        self.participants = order.into_iter().collect();
        self.alive = self.participants.clone();
        self.cursor = 0;
        self.spoke_in_turn = false;
        self.mode = if self.participants.len() == 1 {
            MatchMode::SoloVsBot
        } else {
            MatchMode::Multiplayer
        };
    }

    /// Participant whose turn it is.
    pub fn current_player(&self) -> Option<&str> {
        self.alive.get_index(self.cursor).map(String::as_str)
    }

    /// Whether `player` is on turn.
    pub fn is_current(&self, player: &str) -> bool {
        self.current_player() == Some(player)
    }

    /// Move the turn to the next alive participant.
    pub fn advance(&mut self) {
        if !self.alive.is_empty() {
            self.cursor = (self.cursor + 1) % self.alive.len();
        }
        self.spoke_in_turn = false;
    }

    /// Remove the current player; the next player slides into the cursor slot.
    pub fn eliminate_current(&mut self) -> Option<String> {
        let removed = self.alive.shift_remove_index(self.cursor)?;
        self.cursor = if self.alive.is_empty() {
            0
        } else {
            self.cursor % self.alive.len()
        };
        self.spoke_in_turn = false;
        Some(removed)
    }

    /// Fold an accepted phrase into the chain.
    pub fn record(&mut self, phrase: String) {
        self.used.insert(phrase.clone());
        self.chain = Some(phrase);
    }

    /// Last accepted phrase, `None` before the opening move.
    pub fn chain(&self) -> Option<&str> {
        self.chain.as_deref()
    }

    /// Phrases played in this match.
    pub fn used(&self) -> &HashSet<String> {
        &self.used
    }

    /// Inputs for chain and repeat checks.
    pub fn chain_context(&self) -> ChainContext<'_> {
        ChainContext {
            previous: self.chain(),
            used: &self.used,
        }
    }

    /// Count a strike against a player, returning their total so far.
    pub fn add_strike(&mut self, player: &str) -> u32 {
        let strikes = self.strikes.entry(player.to_string()).or_insert(0);
        *strikes += 1;
        *strikes
    }

    /// Record that the current player answered during this turn.
    pub fn mark_spoke(&mut self) {
        self.spoke_in_turn = true;
    }

    /// Give the current player a fresh turn after a strike.
    pub fn renew_turn(&mut self) {
        self.spoke_in_turn = false;
    }

    /// Whether the current player answered during this turn.
    pub fn has_spoken(&self) -> bool {
        self.spoke_in_turn
    }

    /// Sole surviving human of a multiplayer match.
    pub fn survivor(&self) -> Option<&str> {
        match (self.mode, self.alive.len()) {
            (MatchMode::Multiplayer, 1) => self.alive.first().map(String::as_str),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn started(players: &[&str]) -> Match {
        let mut game = Match::new();
        for player in players {
            game.join(player);
        }
        game.start(&mut StdRng::seed_from_u64(7));
        game
    }

    #[test]
    fn duplicate_join_is_noop() {
        let mut game = Match::new();
        assert!(game.join("alice"));
        assert!(!game.join("alice"));
        assert_eq!(game.participants().len(), 1);
    }

    #[test]
    fn start_keeps_every_participant_alive() {
        let game = started(&["a", "b", "c", "d"]);
        assert_eq!(game.participants().len(), 4);
        assert_eq!(game.alive(), game.participants());
        assert_eq!(game.mode(), MatchMode::Multiplayer);
        assert_eq!(game.cursor(), 0);
    }

    #[test]
    fn single_participant_plays_the_bot() {
        let game = started(&["solo"]);
        assert_eq!(game.mode(), MatchMode::SoloVsBot);
        assert_eq!(game.current_player(), Some("solo"));
        assert_eq!(game.survivor(), None);
    }

    #[test]
    fn advance_wraps_around() {
        let mut game = started(&["a", "b", "c"]);
        let order: Vec<String> = game.alive().iter().cloned().collect();
        game.advance();
        game.advance();
        assert_eq!(game.current_player(), Some(order[2].as_str()));
        game.advance();
        assert_eq!(game.current_player(), Some(order[0].as_str()));
    }

    #[test]
    fn cursor_stays_in_range_after_eliminations() {
        let mut game = started(&["a", "b", "c", "d"]);
        let order: Vec<String> = game.alive().iter().cloned().collect();

        game.advance();
        game.advance();
        game.advance();
        assert_eq!(game.eliminate_current().as_deref(), Some(order[3].as_str()));
        assert_eq!(game.cursor(), 0);
        assert_eq!(game.current_player(), Some(order[0].as_str()));

        game.advance();
        assert_eq!(game.eliminate_current().as_deref(), Some(order[1].as_str()));
        assert_eq!(game.current_player(), Some(order[2].as_str()));
        assert!(game.alive().iter().all(|p| game.participants().contains(p)));

        game.eliminate_current();
        assert_eq!(game.survivor(), Some(order[0].as_str()));
        game.eliminate_current();
        assert_eq!(game.current_player(), None);
        assert_eq!(game.cursor(), 0);
    }

    #[test]
    fn record_updates_chain_and_used() {
        let mut game = started(&["a", "b"]);
        assert_eq!(game.chain(), None);
        game.record("con mèo".into());
        game.record("mèo mướp".into());
        assert_eq!(game.chain(), Some("mèo mướp"));
        assert!(game.used().contains("con mèo"));
        assert_eq!(game.chain_context().previous, Some("mèo mướp"));
    }

    #[test]
    fn strikes_accumulate_per_player() {
        let mut game = started(&["a", "b"]);
        assert_eq!(game.add_strike("a"), 1);
        assert_eq!(game.add_strike("a"), 2);
        assert_eq!(game.add_strike("b"), 1);
    }

    #[test]
    fn advancing_clears_spoke_flag() {
        let mut game = started(&["a", "b"]);
        game.mark_spoke();
        assert!(game.has_spoken());
        game.advance();
        assert!(!game.has_spoken());
    }

    #[test]
    fn renewed_turn_forgets_the_answer() {
        let mut game = started(&["a", "b"]);
        game.mark_spoke();
        assert!(game.has_spoken());
        game.renew_turn();
        assert!(!game.has_spoken());
    }
}
