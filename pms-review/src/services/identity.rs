//! Bearer token to user resolution for live channels

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

use crate::db::sessions;

/// Maps a presented credential to the user it belongs to
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// `None` for unknown, expired or malformed credentials
    async fn resolve(&self, token: &str) -> Option<Uuid>;
}

/// Resolves tokens against the sessions table
#[derive(Debug, Clone)]
pub struct SessionIdentityResolver {
    db: SqlitePool,
}

impl SessionIdentityResolver {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityResolver for SessionIdentityResolver {
    async fn resolve(&self, token: &str) -> Option<Uuid> {
        match sessions::find_session_user(&self.db, token, pms_common::time::now()).await {
            Ok(user_id) => user_id,
            Err(e) => {
                warn!("Session lookup failed: {}", e);
                None
            }
        }
    }
}
