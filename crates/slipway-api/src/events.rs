//! Live progress streaming over SSE.
//!
//! Each deployment id has one push channel. The first frame is always a
//! `state` replay of everything emitted so far; live frames follow in
//! arrival order. Keepalive pings from the broadcaster become SSE
//! comments. When the broadcaster force-closes the session the stream
//! ends and the client reconnects, triggering a fresh replay.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use tokio::sync::mpsc;
use tracing::debug;

use slipway_progress::ChannelMessage;

use crate::ApiState;

/// GET /api/v1/deployments/{id}/events
pub async fn deployment_events(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let handle = state.orchestrator.hub().handle(&id).await;
    let rx = handle.subscribe().await;
    debug!(deployment = %id, "progress subscriber connected");

    let stream = stream::unfold(rx, |rx| async move {
        let mut rx: mpsc::UnboundedReceiver<ChannelMessage> = rx?;
        match rx.recv().await {
            Some(ChannelMessage::Ping) => {
                Some((Ok(Event::default().comment("keepalive")), Some(rx)))
            }
            Some(message) => {
                let payload = serde_json::to_string(&message).unwrap_or_default();
                Some((Ok(Event::default().data(payload)), Some(rx)))
            }
            // Session force-closed (max lifetime) or broadcaster gone.
            None => None,
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
