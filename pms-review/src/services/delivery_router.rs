//! Targeted delivery to a user's live channels

use pms_common::events::NOTIFICATION_EVENT;
use pms_common::ChannelEvent;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use super::connection_registry::ConnectionRegistry;

/// Pushes events to every open channel of one recipient
///
/// Delivery is best-effort: an offline recipient is not an error and
/// nothing is queued for later.
#[derive(Debug, Clone)]
pub struct DeliveryRouter {
    registry: Arc<ConnectionRegistry>,
}

impl DeliveryRouter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Emit `event` to all of `recipient_id`'s channels; returns channels reached
    ///
    /// The payload is stamped with the server time. A channel whose buffer
    /// is full misses this event. Channels whose receiver has gone away are
    /// unregistered.
    pub fn emit_to_user(&self, recipient_id: Uuid, event: &str, payload: Value) -> usize {
        let senders = self.registry.senders_for(recipient_id);
        if senders.is_empty() {
            debug!("No open channels for {}, dropping {} event", recipient_id, event);
            return 0;
        }

        let channel_event = ChannelEvent::stamped(event, payload);
        let mut delivered = 0;

        for (channel_id, tx) in senders {
            match tx.try_send(channel_event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "Channel {} of {} is not draining, dropping {} event",
                        channel_id, recipient_id, event
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    self.registry.disconnect(recipient_id, channel_id);
                }
            }
        }

        debug!(
            "Delivered {} event to {} channel(s) of {}",
            event, delivered, recipient_id
        );
        delivered
    }

    /// Emit a `notification` event
    pub fn notify(&self, recipient_id: Uuid, payload: Value) -> usize {
        self.emit_to_user(recipient_id, NOTIFICATION_EVENT, payload)
    }
}
