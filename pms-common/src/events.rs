//! Live-channel event type
//!
//! Every event pushed to a recipient's channel carries the server timestamp
//! (milliseconds since epoch) merged into its payload.

use serde::Serialize;
use serde_json::{Map, Value};

/// Event name for notification changes (new, refreshed or removed items)
pub const NOTIFICATION_EVENT: &str = "notification";

/// Event name sent once when a channel is opened
pub const CONNECTION_STATUS_EVENT: &str = "ConnectionStatus";

/// One event addressed to one live channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelEvent {
    /// SSE event name
    pub event: String,
    /// JSON data, always an object with a `timestamp` field
    pub data: Value,
}

impl ChannelEvent {
    /// Build an event stamped with the current server time
    pub fn stamped(event: &str, payload: Value) -> Self {
        Self::stamped_at(event, payload, crate::time::now_millis())
    }

    /// Build an event with an explicit timestamp
    ///
    /// Object payloads have `timestamp` merged in (overwriting any client
    /// value); `null` becomes `{timestamp}`; any other value is wrapped as
    /// `{payload, timestamp}`.
    pub fn stamped_at(event: &str, payload: Value, timestamp: i64) -> Self {
        let mut data = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("payload".to_string(), other);
                map
            }
        };
        data.insert("timestamp".to_string(), Value::from(timestamp));

        Self {
            event: event.to_string(),
            data: Value::Object(data),
        }
    }
}
