use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod command;
/// Health endpoint payloads.
pub mod health;
/// Outbound room notifications.
pub mod notification;
/// Room snapshots.
pub mod room;
/// SSE payloads.
pub mod sse;
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
