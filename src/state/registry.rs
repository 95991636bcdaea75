use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::{
    services::room::{RoomContext, RoomHandle, spawn_room},
    state::state_machine::MatchPhase,
};

/// Registry-level outcomes surfaced to the transport as statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A match is already being played for this session.
    #[error("a match is already running for this session")]
    AlreadyRunning,
    /// Nothing is open for this session.
    #[error("no room is open for this session")]
    NoSuchRoom,
}

/// Maps a session key to its single live room actor.
///
/// Opening is serialized per key by the map entry lock, so two concurrent
/// opens can never leave two rooms behind for the same session.
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<DashMap<String, RoomHandle>>,
    ctx: Arc<RoomContext>,
}

impl RoomRegistry {
    /// Empty registry spawning rooms with `ctx`.
    pub fn new(ctx: Arc<RoomContext>) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            ctx,
        }
    }

    /// Open a lobby, re-opening an existing one or replacing a finished room.
    pub async fn open_lobby(&self, key: &str, opened_by: &str) -> Result<RoomHandle, RegistryError> {
        loop {
            let existing = match self.rooms.entry(key.to_string()) {
                Entry::Vacant(slot) => {
                    let handle = spawn_room(key, opened_by, self.ctx.clone(), self.clone());
                    slot.insert(handle.clone());
                    return Ok(handle);
                }
                Entry::Occupied(mut slot) => {
                    let current = slot.get().clone();
                    match current.phase() {
                        MatchPhase::Active | MatchPhase::Solo if !current.is_closed() => {
                            return Err(RegistryError::AlreadyRunning);
                        }
                        MatchPhase::Lobby if !current.is_closed() => current,
                        _ => {
                            debug!(session = %key, room = %current.id(), "replacing finished room");
                            let handle = spawn_room(key, opened_by, self.ctx.clone(), self.clone());
                            slot.insert(handle.clone());
                            return Ok(handle);
                        }
                    }
                }
            };

            // Outside the entry lock: the actor may itself need the map to deregister.
            match existing.reopen(opened_by).await {
                Ok(()) => return Ok(existing),
                Err(RegistryError::AlreadyRunning) => return Err(RegistryError::AlreadyRunning),
                Err(RegistryError::NoSuchRoom) => {
                    self.remove_if_current(key, existing.id());
                }
            }
        }
    }

    /// Live room for a session, if any.
    pub fn get(&self, key: &str) -> Option<RoomHandle> {
        self.rooms
            .get(key)
            .map(|entry| entry.value().clone())
            .filter(|handle| !handle.is_closed() && !handle.phase().is_terminal())
    }

    /// Deregister `id` unless a newer room already took its key.
    pub(crate) fn remove_if_current(&self, key: &str, id: Uuid) {
        self.rooms.remove_if(key, |_, handle| handle.id() == id);
    }

    /// Number of registered rooms, finished ones included.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no room is registered.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
