/// Solo-mode opponent.
pub mod bot;
/// Shared dictionary cache with remote verification.
pub mod dictionary;
/// Health check service.
pub mod health_service;
/// Persist queue drain into the phrase store.
pub mod persistence;
/// Per-room actor owning a lobby and its match.
pub mod room;
/// Turn timers.
pub mod scheduler;
/// Inbound command and message routing.
pub mod session_service;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Phrase store connection supervisor.
pub mod storage_supervisor;
/// Phrase validation pipeline.
pub mod validation;
