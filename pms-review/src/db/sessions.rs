//! Session tokens backing stream authentication

use chrono::{DateTime, Duration, Utc};
use pms_common::token::{generate_token, hash_token};
use pms_common::{time, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;

/// Create a session for `user_id` and return the clear-text bearer token
///
/// Only the token hash is stored.
pub async fn create_session(
    pool: &SqlitePool,
    user_id: Uuid,
    ttl: Option<Duration>,
) -> Result<String> {
    let token = generate_token();
    let now = time::now();
    let expires_at = ttl.map(|ttl| time::to_db(now + ttl));

    sqlx::query(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(hash_token(&token))
    .bind(user_id.to_string())
    .bind(time::to_db(now))
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(token)
}

/// Resolve a bearer token to its user, ignoring expired sessions
pub async fn find_session_user(
    pool: &SqlitePool,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<Uuid>> {
    let row = sqlx::query("SELECT user_id, expires_at FROM sessions WHERE token_hash = ?")
        .bind(hash_token(token))
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let expires_at: Option<String> = row.get("expires_at");
    if let Some(expires_at) = expires_at {
        if time::from_db(&expires_at)? < now {
            return Ok(None);
        }
    }

    let user_id: String = row.get("user_id");
    Ok(Some(parse_uuid(&user_id)?))
}

/// Revoke a session; returns whether it existed
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(hash_token(token))
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
