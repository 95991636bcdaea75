//! Library crate for wordchain-back, exposing modules for the binary and integration tests.

pub mod config;
/// Persistence and remote lookup adapters.
pub mod dao;
/// Wire types exchanged with transport adapters.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Room actors and background services.
pub mod services;
/// Shared application state and the match model.
pub mod state;
