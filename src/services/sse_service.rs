use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::{
        notification::Notification,
        sse::{Handshake, ServerEvent},
    },
    state::SharedState,
};

/// Subscribe to every room's notifications.
pub fn subscribe(state: &SharedState) -> broadcast::Receiver<Notification> {
    state.notifications().subscribe()
}

/// First event written to a new stream.
pub async fn handshake(state: &SharedState, session: Option<&str>) -> Option<ServerEvent> {
    let payload = Handshake {
        session: session.map(str::to_string),
        message: match session {
            Some(key) => format!("subscribed to session {key}"),
            None => "subscribed to all sessions".to_string(),
        },
        degraded: state.is_degraded().await,
    };
    ServerEvent::json(Some("handshake".to_string()), &payload).ok()
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a broadcast receiver into an SSE response, forwarding the
/// notifications of `session` (or all of them) until the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<Notification>,
    session: Option<String>,
    handshake: Option<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        if let Some(payload) = handshake {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(notification) => {
                            if session.as_deref().is_some_and(|key| key != notification.session) {
                                continue;
                            }
                            let payload = match ServerEvent::from_notification(&notification) {
                                Ok(payload) => payload,
                                Err(err) => {
                                    warn!(error = %err, "failed to encode notification");
                                    continue;
                                }
                            };
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Skip lagged messages but keep the stream alive.
                            warn!(skipped, "SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        match session {
            Some(key) => info!(session = %key, "session SSE stream disconnected"),
            None => info!("SSE stream disconnected"),
        }
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
