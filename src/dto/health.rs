use serde::Serialize;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of phrases currently known to the dictionary.
    pub dictionary_size: usize,
    /// Rooms with a live match or lobby.
    pub rooms: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(dictionary_size: usize, rooms: usize) -> Self {
        Self {
            status: "ok".to_string(),
            dictionary_size,
            rooms,
        }
    }

    /// Create a health response indicating the phrase store is unavailable.
    pub fn degraded(dictionary_size: usize, rooms: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            dictionary_size,
            rooms,
        }
    }
}
