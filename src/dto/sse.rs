use serde::Serialize;

use crate::dto::notification::Notification;

/// Dispatched payload carried across SSE channels.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    /// SSE event name, if any.
    pub event: Option<String>,
    /// Serialized JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Name the event after the notification kind.
    pub fn from_notification(notification: &Notification) -> serde_json::Result<Self> {
        Self::json(Some(notification.kind.name().to_string()), notification)
    }
}

/// Initial metadata sent to an SSE client when it connects.
#[derive(Debug, Serialize)]
pub struct Handshake {
    /// Session the stream is filtered on, `None` for the firehose.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a phrase store.
    pub degraded: bool,
}
