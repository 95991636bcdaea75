use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// High-level phases a room's match can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "reason", rename_all = "snake_case")]
pub enum MatchPhase {
    /// Players are joining; no turns are running yet.
    Lobby,
    /// Two or more humans are taking turns.
    Active,
    /// A single human plays against the bot.
    Solo,
    /// The match is over. Absorbing.
    Terminal(EndReason),
}

impl MatchPhase {
    /// Whether turns are currently being played.
    pub fn is_running(&self) -> bool {
        matches!(self, MatchPhase::Active | MatchPhase::Solo)
    }

    /// Whether the match is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchPhase::Terminal(_))
    }
}

/// Why a match reached [`MatchPhase::Terminal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Eliminations left at most one survivor (or the bot ran dry).
    Finished,
    /// The lobby closed without enough participants.
    LobbyCancelled,
    /// Someone issued an explicit stop.
    Stopped,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// The lobby closes with the given number of participants.
    Begin {
        /// Participants registered when the lobby closed.
        participants: usize,
    },
    /// The lobby deadline elapsed below the auto-begin minimum.
    Cancel,
    /// The lobby was opened again while still collecting players.
    Reopen,
    /// A phrase was accepted for the current player.
    MoveAccepted,
    /// A player was removed from the alive set.
    Eliminated {
        /// Humans still alive after the removal.
        remaining: usize,
    },
    /// The bot has no legal continuation.
    BotExhausted,
    /// Explicit stop command.
    Stop,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: MatchPhase,
    /// The event that cannot be applied from this phase.
    pub event: MatchEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending (it was superseded or never existed).
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition (the pending-move id).
pub type PlanId = Uuid;

/// A planned transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine will transition to.
    pub to: MatchPhase,
}

/// Lifecycle of one room's match.
///
/// Moves awaiting a remote meaning check are held as a pending [`Plan`];
/// any event fired directly (expiry, stop) supersedes it, so a late
/// verification result fails to apply and is dropped.
#[derive(Debug, Clone)]
pub struct MatchStateMachine {
    phase: MatchPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for MatchStateMachine {
    fn default() -> Self {
        Self {
            phase: MatchPhase::Lobby,
            version: 0,
            pending: None,
        }
    }
}

impl MatchStateMachine {
    /// Create a new state machine initialised in the lobby.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Number of transitions applied so far.
    pub fn version(&self) -> usize {
        self.version
    }

    /// The plan awaiting application, if any.
    pub fn pending(&self) -> Option<&Plan> {
        self.pending.as_ref()
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: MatchEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            to: next,
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<MatchPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        self.phase = plan.to;
        self.version += 1;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Apply an event immediately, discarding any pending plan.
    pub fn fire(&mut self, event: MatchEvent) -> Result<MatchPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.pending = None;
        self.phase = next;
        self.version += 1;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: MatchEvent) -> Result<MatchPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (MatchPhase::Lobby, MatchEvent::Begin { participants: 0 }) => {
                MatchPhase::Terminal(EndReason::LobbyCancelled)
            }
            (MatchPhase::Lobby, MatchEvent::Begin { participants: 1 }) => MatchPhase::Solo,
            (MatchPhase::Lobby, MatchEvent::Begin { .. }) => MatchPhase::Active,
            (MatchPhase::Lobby, MatchEvent::Cancel) => {
                MatchPhase::Terminal(EndReason::LobbyCancelled)
            }
            (MatchPhase::Lobby, MatchEvent::Reopen) => MatchPhase::Lobby,
            (phase @ (MatchPhase::Active | MatchPhase::Solo), MatchEvent::MoveAccepted) => phase,
            (MatchPhase::Active, MatchEvent::Eliminated { remaining }) if remaining > 1 => {
                MatchPhase::Active
            }
            (MatchPhase::Active | MatchPhase::Solo, MatchEvent::Eliminated { .. }) => {
                MatchPhase::Terminal(EndReason::Finished)
            }
            (MatchPhase::Solo, MatchEvent::BotExhausted) => {
                MatchPhase::Terminal(EndReason::Finished)
            }
            (MatchPhase::Lobby | MatchPhase::Active | MatchPhase::Solo, MatchEvent::Stop) => {
                MatchPhase::Terminal(EndReason::Stopped)
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fire(sm: &mut MatchStateMachine, event: MatchEvent) -> MatchPhase {
        sm.fire(event).unwrap()
    }

    #[test]
    fn initial_state_is_lobby() {
        let sm = MatchStateMachine::new();
        assert_eq!(sm.phase(), MatchPhase::Lobby);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn begin_picks_phase_from_participant_count() {
        for (participants, expected) in [
            (0, MatchPhase::Terminal(EndReason::LobbyCancelled)),
            (1, MatchPhase::Solo),
            (2, MatchPhase::Active),
            (5, MatchPhase::Active),
        ] {
            let mut sm = MatchStateMachine::new();
            assert_eq!(fire(&mut sm, MatchEvent::Begin { participants }), expected);
        }
    }

    #[test]
    fn elimination_down_to_one_finishes() {
        let mut sm = MatchStateMachine::new();
        fire(&mut sm, MatchEvent::Begin { participants: 3 });
        assert_eq!(
            fire(&mut sm, MatchEvent::Eliminated { remaining: 2 }),
            MatchPhase::Active
        );
        assert_eq!(
            fire(&mut sm, MatchEvent::Eliminated { remaining: 1 }),
            MatchPhase::Terminal(EndReason::Finished)
        );
    }

    #[test]
    fn solo_ends_on_human_elimination_or_bot_exhaustion() {
        let mut sm = MatchStateMachine::new();
        fire(&mut sm, MatchEvent::Begin { participants: 1 });
        assert_eq!(fire(&mut sm, MatchEvent::MoveAccepted), MatchPhase::Solo);
        assert_eq!(
            fire(&mut sm, MatchEvent::BotExhausted),
            MatchPhase::Terminal(EndReason::Finished)
        );

        let mut sm = MatchStateMachine::new();
        fire(&mut sm, MatchEvent::Begin { participants: 1 });
        assert_eq!(
            fire(&mut sm, MatchEvent::Eliminated { remaining: 0 }),
            MatchPhase::Terminal(EndReason::Finished)
        );
    }

    #[test]
    fn terminal_is_absorbing() {
        let mut sm = MatchStateMachine::new();
        fire(&mut sm, MatchEvent::Stop);
        for event in [
            MatchEvent::Begin { participants: 2 },
            MatchEvent::Reopen,
            MatchEvent::MoveAccepted,
            MatchEvent::Stop,
        ] {
            let err = sm.fire(event).unwrap_err();
            assert_eq!(err.from, MatchPhase::Terminal(EndReason::Stopped));
        }
    }

    #[test]
    fn running_match_never_reenters_lobby() {
        let mut sm = MatchStateMachine::new();
        fire(&mut sm, MatchEvent::Begin { participants: 2 });
        assert!(sm.fire(MatchEvent::Reopen).is_err());
        assert!(sm.fire(MatchEvent::Begin { participants: 2 }).is_err());
    }

    #[test]
    fn pending_move_applies_once() {
        let mut sm = MatchStateMachine::new();
        fire(&mut sm, MatchEvent::Begin { participants: 2 });
        let plan = sm.plan(MatchEvent::MoveAccepted).unwrap();
        assert_eq!(sm.pending().map(|p| p.to), Some(MatchPhase::Active));
        assert_eq!(sm.plan(MatchEvent::MoveAccepted).unwrap_err(), PlanError::AlreadyPending);

        assert_eq!(sm.apply(plan.id).unwrap(), MatchPhase::Active);
        assert_eq!(sm.apply(plan.id).unwrap_err(), ApplyError::NoPending);
        assert_eq!(sm.version(), 2);
    }

    #[test]
    fn fired_event_supersedes_pending_move() {
        let mut sm = MatchStateMachine::new();
        fire(&mut sm, MatchEvent::Begin { participants: 2 });
        let plan = sm.plan(MatchEvent::MoveAccepted).unwrap();

        fire(&mut sm, MatchEvent::Stop);
        assert!(sm.pending().is_none());
        assert_eq!(sm.apply(plan.id).unwrap_err(), ApplyError::NoPending);
        assert_eq!(sm.abort(plan.id).unwrap_err(), AbortError::NoPending);
    }

    #[test]
    fn mismatched_plan_id_keeps_pending() {
        let mut sm = MatchStateMachine::new();
        fire(&mut sm, MatchEvent::Begin { participants: 2 });
        let plan = sm.plan(MatchEvent::MoveAccepted).unwrap();
        let other = Uuid::new_v4();
        assert!(matches!(sm.apply(other), Err(ApplyError::IdMismatch { .. })));
        assert!(matches!(sm.abort(other), Err(AbortError::IdMismatch { .. })));
        sm.abort(plan.id).unwrap();
        assert!(sm.pending().is_none());
    }

    #[test]
    fn invalid_transition_returns_error() {
        let mut sm = MatchStateMachine::new();
        let err = sm.plan(MatchEvent::MoveAccepted).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, MatchPhase::Lobby);
                assert_eq!(invalid.event, MatchEvent::MoveAccepted);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
