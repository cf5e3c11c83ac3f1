//! Server-Sent Events (SSE) utilities
//!
//! Turns one channel's receiver into an axum SSE response.

use crate::events::{ChannelEvent, CONNECTION_STATUS_EVENT};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Keep-alive interval for all channel streams
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Create an SSE stream that forwards every event received on `rx`
///
/// `guard` is owned by the stream and dropped with it, so a registry
/// guard placed here unregisters the channel when the client disconnects.
///
/// # Example
/// ```rust,ignore
/// let (channel_id, rx) = registry.connect(user_id);
/// let guard = ChannelGuard::new(registry.clone(), user_id, channel_id);
/// pms_common::sse::channel_sse_stream(rx, guard)
/// ```
pub fn channel_sse_stream<G>(
    mut rx: mpsc::Receiver<ChannelEvent>,
    guard: G,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    G: Send + 'static,
{
    let stream = async_stream::stream! {
        let _guard = guard;

        // Send initial connected status
        yield Ok(Event::default()
            .event(CONNECTION_STATUS_EVENT)
            .data("connected"));

        while let Some(channel_event) = rx.recv().await {
            match Event::default()
                .event(&channel_event.event)
                .json_data(&channel_event.data)
            {
                Ok(event) => {
                    debug!("SSE: Forwarding {} event", channel_event.event);
                    yield Ok(event);
                }
                Err(e) => {
                    warn!("SSE: Failed to serialize {} event: {}", channel_event.event, e);
                }
            }
        }

        debug!("SSE: Channel closed by server");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("heartbeat"),
    )
}
