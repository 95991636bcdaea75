//! Generation-checked turn timers delivered as messages to a room actor.

use std::time::Duration;

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tracing::trace;

/// Which deadline a timer message represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStage {
    /// Part of the turn budget has elapsed.
    Reminder,
    /// The turn budget is exhausted.
    Expiry,
    /// The lobby deadline elapsed.
    AutoBegin,
}

/// Message posted to the owning actor when a timer elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    /// Generation the timer was armed under.
    pub generation: u64,
    /// Which timer elapsed.
    pub stage: TimerStage,
}

/// At most one armed timer pair, identified by a generation counter.
///
/// Every `arm`/`cancel` bumps the generation, so a message that was already
/// queued for a previous pair is recognized as stale by [`is_current`].
///
/// [`is_current`]: TurnScheduler::is_current
pub struct TurnScheduler<M: Send + 'static> {
    tx: mpsc::Sender<M>,
    wrap: fn(TimerFired) -> M,
    reminder_fraction: f64,
    generation: u64,
    armed: Option<JoinHandle<()>>,
}

impl<M: Send + 'static> TurnScheduler<M> {
    /// Timers post `wrap(fired)` on `tx`; reminders fire at `reminder_fraction` of a turn.
    pub fn new(tx: mpsc::Sender<M>, wrap: fn(TimerFired) -> M, reminder_fraction: f64) -> Self {
        Self {
            tx,
            wrap,
            reminder_fraction,
            generation: 0,
            armed: None,
        }
    }

    /// Replace any armed pair with a reminder and an expiry for `duration`.
    pub fn arm(&mut self, duration: Duration) -> u64 {
        self.cancel();
        let generation = self.generation;
        let start = Instant::now();
        let reminder_at = start + duration.mul_f64(self.reminder_fraction);
        let expiry_at = start + duration;
        let tx = self.tx.clone();
        let wrap = self.wrap;

        self.armed = Some(tokio::spawn(async move {
            sleep_until(reminder_at).await;
            let reminder = TimerFired {
                generation,
                stage: TimerStage::Reminder,
            };
            if tx.send(wrap(reminder)).await.is_err() {
                return;
            }
            sleep_until(expiry_at).await;
            let expiry = TimerFired {
                generation,
                stage: TimerStage::Expiry,
            };
            let _ = tx.send(wrap(expiry)).await;
        }));
        trace!(generation, ?duration, "turn timers armed");
        generation
    }

    /// Replace any armed timer with a single deadline.
    pub fn arm_single(&mut self, stage: TimerStage, duration: Duration) -> u64 {
        self.cancel();
        let generation = self.generation;
        let deadline = Instant::now() + duration;
        let tx = self.tx.clone();
        let wrap = self.wrap;

        self.armed = Some(tokio::spawn(async move {
            sleep_until(deadline).await;
            let _ = tx.send(wrap(TimerFired { generation, stage })).await;
        }));
        generation
    }

    /// Drop the armed timers, if any. Always invalidates queued firings.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.armed.take() {
            handle.abort();
        }
        self.generation += 1;
    }

    /// Whether a firing belongs to the currently armed timers.
    pub fn is_current(&self, fired: &TimerFired) -> bool {
        self.armed.is_some() && fired.generation == self.generation
    }

    /// Current timer generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a timer is currently pending.
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}

impl<M: Send + 'static> Drop for TurnScheduler<M> {
    fn drop(&mut self) {
        if let Some(handle) = self.armed.take() {
            handle.abort();
        }
    }
}
