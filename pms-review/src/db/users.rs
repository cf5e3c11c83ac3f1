//! User directory lookups

use pms_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;
use crate::models::User;

/// Insert or update a user
pub async fn save_user(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, tenant_id, name, email, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            tenant_id = excluded.tenant_id,
            name = excluded.name,
            email = excluded.email
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.tenant_id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(pms_common::time::to_db(pms_common::time::now()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a user by ID
pub async fn get_user(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, tenant_id, name, email FROM users WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let id: String = row.get("id");
            Ok(Some(User {
                id: parse_uuid(&id)?,
                tenant_id: row.get("tenant_id"),
                name: row.get("name"),
                email: row.get("email"),
            }))
        }
        None => Ok(None),
    }
}
