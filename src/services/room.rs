//! Per-room actor: the single writer of a room's lobby and match.
//!
//! Every inbound command, timer firing and remote-lookup result is a message
//! on the room's inbox, so accepted phrases and expiries are totally ordered.
//! The only suspension point (the remote meaning check) runs on a separate
//! task and comes back as [`RoomCommand::Verified`] tagged with its plan id.

use std::{ops::ControlFlow, sync::Arc};

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::{
    config::GameConfig,
    dto::{
        notification::{EliminationCause, Notification, NotificationKind},
        room::RoomSnapshot,
    },
    services::{
        bot::BotMoveGenerator,
        scheduler::{TimerFired, TimerStage, TurnScheduler},
        validation::{Rejection, ValidationPipeline},
    },
    state::{
        game::{Match, MatchMode},
        notify::Notifier,
        registry::{RegistryError, RoomRegistry},
        state_machine::{EndReason, MatchEvent, MatchPhase, MatchStateMachine, PlanId},
    },
};

const INBOX_CAPACITY: usize = 64;

/// Messages accepted by a room actor.
#[derive(Debug)]
pub enum RoomCommand {
    /// Enter the lobby.
    Join {
        /// Player concerned.
        player: String,
    },
    /// Close the lobby now.
    Begin {
        /// Player concerned.
        player: String,
    },
    /// Reset a lobby that is still collecting players.
    Reopen {
        /// Player concerned.
        player: String,
        /// Channel for the answer.
        reply: oneshot::Sender<Result<(), RegistryError>>,
    },
    /// End the lobby or match.
    Stop {
        /// Player concerned.
        player: String,
    },
    /// Candidate phrase from a player.
    Phrase {
        /// Player concerned.
        player: String,
        /// Raw input as typed.
        text: String,
    },
    /// A scheduler timer elapsed.
    Timer(TimerFired),
    /// Outcome of a remote meaning check started for a pending move.
    Verified {
        /// Pending move the result belongs to.
        plan_id: PlanId,
        /// Player concerned.
        player: String,
        /// Normalized phrase that was checked.
        phrase: String,
        /// Lookup verdict.
        meaningful: bool,
    },
    /// Report the current state.
    Snapshot {
        /// Channel for the answer.
        reply: oneshot::Sender<RoomSnapshot>,
    },
}

/// Collaborators shared by every room.
pub struct RoomContext {
    /// Game configuration.
    pub config: Arc<GameConfig>,
    /// Phrase validation shared with the bot.
    pub pipeline: Arc<ValidationPipeline>,
    /// Solo-mode opponent.
    pub bot: Arc<BotMoveGenerator>,
    /// Outbound notification sink.
    pub notifier: Arc<dyn Notifier>,
}

impl RoomContext {
    /// Bundle the collaborators; the bot is built from the pipeline.
    pub fn new(
        config: Arc<GameConfig>,
        pipeline: Arc<ValidationPipeline>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let bot = Arc::new(BotMoveGenerator::new(pipeline.clone()));
        Self {
            config,
            pipeline,
            bot,
            notifier,
        }
    }
}

/// Cheap, cloneable address of a running room actor.
#[derive(Clone, Debug)]
pub struct RoomHandle {
    id: Uuid,
    key: Arc<str>,
    tx: mpsc::Sender<RoomCommand>,
    phase: watch::Receiver<MatchPhase>,
}

impl RoomHandle {
    /// Identity of this actor instance; a re-created room gets a new one.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Session key the room serves.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Last phase published by the actor.
    pub fn phase(&self) -> MatchPhase {
        *self.phase.borrow()
    }

    /// Whether the actor has stopped reading its inbox.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queue a command; fails once the actor has terminated.
    pub async fn send(&self, command: RoomCommand) -> Result<(), RegistryError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| RegistryError::NoSuchRoom)
    }

    /// Ask a lobby to reset itself.
    pub async fn reopen(&self, player: &str) -> Result<(), RegistryError> {
        let (reply, response) = oneshot::channel();
        self.send(RoomCommand::Reopen {
            player: player.to_string(),
            reply,
        })
        .await?;
        response.await.map_err(|_| RegistryError::NoSuchRoom)?
    }

    /// Ask the actor for a point-in-time view of the room.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, RegistryError> {
        let (reply, response) = oneshot::channel();
        self.send(RoomCommand::Snapshot { reply }).await?;
        response.await.map_err(|_| RegistryError::NoSuchRoom)
    }
}

/// Start a room with an open lobby and return its handle.
pub(crate) fn spawn_room(
    key: &str,
    opened_by: &str,
    ctx: Arc<RoomContext>,
    registry: RoomRegistry,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
    let (phase_tx, phase_rx) = watch::channel(MatchPhase::Lobby);
    let id = Uuid::new_v4();
    let key: Arc<str> = Arc::from(key);

    let mut actor = RoomActor {
        id,
        key: key.clone(),
        timers: TurnScheduler::new(
            tx.clone(),
            RoomCommand::Timer,
            ctx.config.reminder_fraction,
        ),
        inbox: tx.clone(),
        ctx,
        registry,
        machine: MatchStateMachine::new(),
        game: Match::new(),
        phase_tx,
    };
    actor.open_lobby(opened_by, false);
    tokio::spawn(actor.run(rx));

    RoomHandle {
        id,
        key,
        tx,
        phase: phase_rx,
    }
}

struct RoomActor {
    id: Uuid,
    key: Arc<str>,
    ctx: Arc<RoomContext>,
    registry: RoomRegistry,
    machine: MatchStateMachine,
    game: Match,
    timers: TurnScheduler<RoomCommand>,
    inbox: mpsc::Sender<RoomCommand>,
    phase_tx: watch::Sender<MatchPhase>,
}

impl RoomActor {
    async fn run(mut self, mut rx: mpsc::Receiver<RoomCommand>) {
        info!(session = %self.key, room = %self.id, "room opened");
        while let Some(command) = rx.recv().await {
            if self.handle(command).is_break() {
                break;
            }
        }

        self.timers.cancel();
        self.registry.remove_if_current(&self.key, self.id);
        info!(session = %self.key, room = %self.id, phase = ?self.machine.phase(), "room closed");
    }

    fn handle(&mut self, command: RoomCommand) -> ControlFlow<()> {
        match command {
            RoomCommand::Join { player } => self.on_join(player),
            RoomCommand::Begin { player } => self.on_begin(player),
            RoomCommand::Reopen { player, reply } => self.on_reopen(player, reply),
            RoomCommand::Stop { player } => self.on_stop(player),
            RoomCommand::Phrase { player, text } => self.on_phrase(player, text),
            RoomCommand::Timer(fired) => self.on_timer(fired),
            RoomCommand::Verified {
                plan_id,
                player,
                phrase,
                meaningful,
            } => self.on_verified(plan_id, player, phrase, meaningful),
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
                ControlFlow::Continue(())
            }
        }
    }

    fn notify(&self, kind: NotificationKind) {
        self.ctx
            .notifier
            .notify(Notification::new(self.key.as_ref(), kind));
    }

    /// Fire an event on the state machine and publish the resulting phase.
    fn fire(&mut self, event: MatchEvent) -> Option<MatchPhase> {
        match self.machine.fire(event) {
            Ok(phase) => {
                self.phase_tx.send_replace(phase);
                Some(phase)
            }
            Err(err) => {
                warn!(session = %self.key, error = %err, "ignored invalid match transition");
                None
            }
        }
    }

    fn open_lobby(&mut self, opened_by: &str, reopened: bool) {
        self.game.reset_lobby();
        let auto_begin = self.ctx.config.auto_begin;
        self.timers.arm_single(TimerStage::AutoBegin, auto_begin);
        self.notify(NotificationKind::LobbyOpened {
            opened_by: opened_by.to_string(),
            auto_begin_secs: auto_begin.as_secs(),
            reopened,
        });
    }

    fn on_join(&mut self, player: String) -> ControlFlow<()> {
        if self.machine.phase() != MatchPhase::Lobby {
            debug!(session = %self.key, %player, "join outside lobby ignored");
            self.notify(NotificationKind::NoLobby { player });
            return ControlFlow::Continue(());
        }

        if self.game.join(&player) {
            info!(session = %self.key, %player, "player joined");
            let participants = self.game.participants().len();
            self.notify(NotificationKind::PlayerJoined {
                player,
                participants,
            });
        } else {
            self.notify(NotificationKind::AlreadyJoined { player });
        }
        ControlFlow::Continue(())
    }

    fn on_begin(&mut self, player: String) -> ControlFlow<()> {
        if self.machine.phase() != MatchPhase::Lobby {
            debug!(session = %self.key, %player, "begin outside lobby ignored");
            return ControlFlow::Continue(());
        }
        self.begin()
    }

    fn on_reopen(
        &mut self,
        player: String,
        reply: oneshot::Sender<Result<(), RegistryError>>,
    ) -> ControlFlow<()> {
        if self.machine.phase() != MatchPhase::Lobby {
            let _ = reply.send(Err(RegistryError::AlreadyRunning));
            return ControlFlow::Continue(());
        }

        self.fire(MatchEvent::Reopen);
        self.open_lobby(&player, true);
        let _ = reply.send(Ok(()));
        ControlFlow::Continue(())
    }

    fn on_stop(&mut self, player: String) -> ControlFlow<()> {
        if self.fire(MatchEvent::Stop).is_none() {
            return ControlFlow::Continue(());
        }
        self.timers.cancel();
        info!(session = %self.key, %player, "match stopped");
        self.notify(NotificationKind::Stopped { by: player });
        ControlFlow::Break(())
    }

    /// Close the lobby with whoever has joined.
    fn begin(&mut self) -> ControlFlow<()> {
        self.timers.cancel();
        let participants = self.game.participants().len();
        match self.fire(MatchEvent::Begin { participants }) {
            Some(MatchPhase::Terminal(EndReason::LobbyCancelled)) => {
                info!(session = %self.key, "lobby closed without participants");
                self.notify(NotificationKind::LobbyCancelled);
                ControlFlow::Break(())
            }
            Some(_) => {
                self.game.start(&mut rand::rng());
                let config = &self.ctx.config;
                info!(
                    session = %self.key,
                    participants,
                    mode = ?self.game.mode(),
                    "match started"
                );
                self.notify(NotificationKind::MatchStarted {
                    mode: self.game.mode(),
                    order: self.game.participants().iter().cloned().collect(),
                    word_count: config.word_count,
                    min_token_len: config.min_token_len,
                    chain_mode: config.chain_mode,
                    turn_secs: config.turn_duration.as_secs(),
                });
                self.start_turn();
                ControlFlow::Continue(())
            }
            None => ControlFlow::Continue(()),
        }
    }

    /// Announce the current player and give them a fresh time budget.
    fn start_turn(&mut self) {
        let Some(player) = self.game.current_player().map(str::to_string) else {
            return;
        };
        let required_link = self
            .ctx
            .pipeline
            .rules()
            .required_link(self.game.chain());
        let turn = self.ctx.config.turn_duration;
        let generation = self.timers.arm(turn);
        trace!(session = %self.key, %player, generation, "turn started");
        self.notify(NotificationKind::TurnStarted {
            player,
            required_link,
            turn_secs: turn.as_secs(),
        });
    }

    fn on_phrase(&mut self, player: String, text: String) -> ControlFlow<()> {
        if !self.machine.phase().is_running() {
            return ControlFlow::Continue(());
        }
        if !self.game.is_current(&player) {
            trace!(session = %self.key, %player, "not your turn; ignored");
            return ControlFlow::Continue(());
        }
        if self.machine.pending().is_some() {
            debug!(session = %self.key, %player, "move already awaiting verification; ignored");
            return ControlFlow::Continue(());
        }

        self.game.mark_spoke();
        let checked = self
            .ctx
            .pipeline
            .precheck(&text, &self.game.chain_context());
        let phrase = match checked {
            Ok(phrase) => phrase.into_normalized(),
            Err(reason) => return self.reject(player, reason),
        };

        if self.ctx.pipeline.dictionary().has(&phrase) {
            if self.fire(MatchEvent::MoveAccepted).is_none() {
                return ControlFlow::Continue(());
            }
            return self.after_accept(player, phrase);
        }

        self.defer_meaning(player, phrase);
        ControlFlow::Continue(())
    }

    /// Hold the move as a pending plan while the remote lookup runs off-actor.
    fn defer_meaning(&mut self, player: String, phrase: String) {
        let plan = match self.machine.plan(MatchEvent::MoveAccepted) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(session = %self.key, error = ?err, "could not plan pending move");
                return;
            }
        };
        // The player answered within budget; the lookup has its own timeout.
        self.timers.cancel();
        debug!(session = %self.key, %player, %phrase, plan_id = %plan.id, "awaiting remote lookup");

        let dictionary = self.ctx.pipeline.dictionary().clone();
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let meaningful = dictionary.verify(&phrase).await;
            // The room may be gone by now; late results are dropped.
            let _ = inbox
                .send(RoomCommand::Verified {
                    plan_id: plan.id,
                    player,
                    phrase,
                    meaningful,
                })
                .await;
        });
    }

    fn on_verified(
        &mut self,
        plan_id: PlanId,
        player: String,
        phrase: String,
        meaningful: bool,
    ) -> ControlFlow<()> {
        if self.machine.pending().map(|plan| plan.id) != Some(plan_id) {
            debug!(session = %self.key, %plan_id, "stale verification result dropped");
            return ControlFlow::Continue(());
        }

        if !meaningful {
            if let Err(err) = self.machine.abort(plan_id) {
                warn!(session = %self.key, error = ?err, "failed to abort pending move");
            }
            return self.reject(player, Rejection::NotMeaningful);
        }

        match self.machine.apply(plan_id) {
            Ok(phase) => {
                self.phase_tx.send_replace(phase);
                self.after_accept(player, phrase)
            }
            Err(err) => {
                warn!(session = %self.key, error = ?err, "failed to apply pending move");
                ControlFlow::Continue(())
            }
        }
    }

    fn after_accept(&mut self, player: String, phrase: String) -> ControlFlow<()> {
        info!(session = %self.key, %player, %phrase, "phrase accepted");
        self.game.record(phrase.clone());
        self.notify(NotificationKind::Accepted { player, phrase });

        match self.game.mode() {
            MatchMode::Multiplayer => {
                self.game.advance();
                self.start_turn();
                ControlFlow::Continue(())
            }
            MatchMode::SoloVsBot => self.bot_reply(),
        }
    }

    /// The bot answers in the same logical turn and is never timed.
    fn bot_reply(&mut self) -> ControlFlow<()> {
        let pick = self
            .ctx
            .bot
            .pick(&self.game.chain_context(), &mut rand::rng());

        let Some(phrase) = pick else {
            self.fire(MatchEvent::BotExhausted);
            self.timers.cancel();
            let winner = self.game.current_player().unwrap_or_default().to_string();
            info!(session = %self.key, player = %winner, "bot out of moves");
            self.notify(NotificationKind::Winner { player: winner });
            return ControlFlow::Break(());
        };

        self.fire(MatchEvent::MoveAccepted);
        self.game.record(phrase.clone());
        self.notify(NotificationKind::BotMoved { phrase });
        self.game.advance();
        self.start_turn();
        ControlFlow::Continue(())
    }

    /// Spend a strike or eliminate the current player.
    fn reject(&mut self, player: String, reason: Rejection) -> ControlFlow<()> {
        let budget = self.ctx.config.strikes_before_elimination;
        let strikes = self.game.add_strike(&player);
        debug!(session = %self.key, %player, %reason, strikes, "phrase rejected");

        if strikes <= budget {
            self.notify(NotificationKind::Strike {
                player,
                reason,
                remaining: budget - strikes,
            });
            self.game.renew_turn();
            self.timers.arm(self.ctx.config.turn_duration);
            return ControlFlow::Continue(());
        }

        self.notify(NotificationKind::Rejected { player, reason });
        self.eliminate_current(EliminationCause::Rejected { reason })
    }

    fn eliminate_current(&mut self, cause: EliminationCause) -> ControlFlow<()> {
        let Some(player) = self.game.eliminate_current() else {
            return ControlFlow::Continue(());
        };
        info!(session = %self.key, %player, ?cause, "player eliminated");
        self.notify(NotificationKind::Eliminated { player, cause });

        let remaining = self.game.alive().len();
        match self.fire(MatchEvent::Eliminated { remaining }) {
            Some(MatchPhase::Terminal(_)) => {
                self.timers.cancel();
                match self.game.survivor().map(str::to_string) {
                    Some(winner) => {
                        info!(session = %self.key, player = %winner, "match won");
                        self.notify(NotificationKind::Winner { player: winner });
                    }
                    None => self.notify(NotificationKind::NoWinner),
                }
                ControlFlow::Break(())
            }
            Some(_) => {
                self.start_turn();
                ControlFlow::Continue(())
            }
            None => ControlFlow::Continue(()),
        }
    }

    fn on_timer(&mut self, fired: TimerFired) -> ControlFlow<()> {
        if !self.timers.is_current(&fired) {
            trace!(session = %self.key, generation = fired.generation, "stale timer dropped");
            return ControlFlow::Continue(());
        }

        match fired.stage {
            TimerStage::AutoBegin if self.machine.phase() == MatchPhase::Lobby => {
                let joined = self.game.participants().len();
                if joined >= self.ctx.config.min_participants_to_auto_begin {
                    self.begin()
                } else {
                    self.timers.cancel();
                    self.fire(MatchEvent::Cancel);
                    info!(session = %self.key, joined, "lobby cancelled below auto-begin minimum");
                    self.notify(NotificationKind::LobbyCancelled);
                    ControlFlow::Break(())
                }
            }
            TimerStage::Reminder if self.machine.phase().is_running() => {
                if !self.game.has_spoken() {
                    if let Some(player) = self.game.current_player().map(str::to_string) {
                        let config = &self.ctx.config;
                        let remaining = config.turn_duration.saturating_sub(config.reminder_delay());
                        self.notify(NotificationKind::Reminder {
                            player,
                            remaining_secs: remaining.as_secs(),
                        });
                    }
                }
                ControlFlow::Continue(())
            }
            TimerStage::Expiry if self.machine.phase().is_running() => {
                self.timers.cancel();
                self.eliminate_current(EliminationCause::Timeout)
            }
            _ => ControlFlow::Continue(()),
        }
    }

    fn snapshot(&self) -> RoomSnapshot {
        let phase = self.machine.phase();
        RoomSnapshot {
            session: self.key.to_string(),
            phase,
            mode: (phase != MatchPhase::Lobby).then(|| self.game.mode()),
            participants: self.game.participants().iter().cloned().collect(),
            alive: self.game.alive().iter().cloned().collect(),
            current_player: self.game.current_player().map(str::to_string),
            chain: self.game.chain().map(str::to_string),
            used_count: self.game.used().len(),
            pending_move: self.machine.pending().is_some(),
            timer_generation: self.timers.generation(),
            version: self.machine.version(),
        }
    }
}
