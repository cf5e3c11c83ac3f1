//! Live channel registry
//!
//! Maps each user to the set of their open channels (browser tabs, devices).
//! A user may hold any number of channels; every channel is independently
//! registered and removed. Users with no channels have no entry.

use pms_common::ChannelEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Identifier of one open channel, unique for the life of the registry
pub type ChannelId = u64;

/// Events buffered per channel before further events are dropped
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

type ChannelMap = HashMap<Uuid, HashMap<ChannelId, mpsc::Sender<ChannelEvent>>>;

/// Registry of open channels, shared by the stream endpoint and the router
#[derive(Debug)]
pub struct ConnectionRegistry {
    channels: RwLock<ChannelMap>,
    next_channel_id: AtomicU64,
    capacity: usize,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose channels each buffer at most `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            next_channel_id: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Register a new channel for `user_id` and return its receiving end
    pub fn connect(&self, user_id: Uuid) -> (ChannelId, mpsc::Receiver<ChannelEvent>) {
        let channel_id = self.next_channel_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.capacity);

        let mut channels = self.write();
        let user_channels = channels.entry(user_id).or_default();
        user_channels.insert(channel_id, tx);

        debug!(
            "Channel {} opened for user {} ({} open)",
            channel_id,
            user_id,
            user_channels.len()
        );

        (channel_id, rx)
    }

    /// Remove one channel; the user entry is dropped with its last channel
    ///
    /// Returns whether the channel was registered.
    pub fn disconnect(&self, user_id: Uuid, channel_id: ChannelId) -> bool {
        let mut channels = self.write();

        let Some(user_channels) = channels.get_mut(&user_id) else {
            return false;
        };
        let removed = user_channels.remove(&channel_id).is_some();
        if user_channels.is_empty() {
            channels.remove(&user_id);
        }

        if removed {
            debug!("Channel {} closed for user {}", channel_id, user_id);
        }
        removed
    }

    /// Snapshot of the senders currently open for `user_id`
    pub fn senders_for(&self, user_id: Uuid) -> Vec<(ChannelId, mpsc::Sender<ChannelEvent>)> {
        self.read()
            .get(&user_id)
            .map(|user_channels| {
                user_channels
                    .iter()
                    .map(|(id, tx)| (*id, tx.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn channel_count(&self, user_id: Uuid) -> usize {
        self.read().get(&user_id).map_or(0, HashMap::len)
    }

    pub fn connected_users(&self) -> usize {
        self.read().len()
    }

    pub fn is_connected(&self, user_id: Uuid) -> bool {
        self.read().contains_key(&user_id)
    }

    // A panicked holder cannot leave the map half-updated: every mutation
    // is a single insert or remove.
    fn read(&self) -> RwLockReadGuard<'_, ChannelMap> {
        self.channels.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ChannelMap> {
        self.channels.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Unregisters its channel when dropped
///
/// Owned by the response stream, so client disconnect removes the channel.
#[derive(Debug)]
pub struct ChannelGuard {
    registry: Arc<ConnectionRegistry>,
    user_id: Uuid,
    channel_id: ChannelId,
}

impl ChannelGuard {
    pub fn new(registry: Arc<ConnectionRegistry>, user_id: Uuid, channel_id: ChannelId) -> Self {
        Self {
            registry,
            user_id,
            channel_id,
        }
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.registry.disconnect(self.user_id, self.channel_id);
    }
}
