use tokio_rusqlite::{Connection, OptionalExtension, Result, params, rusqlite};
use tracing::info;

use crate::database::users::User;
use crate::database::utils::get_timestamp;

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub token: String,
    pub user_id: i64,
    pub expires_at: i64,
}

/// Store a freshly signed refresh token.
pub async fn insert_refresh_token(conn: &Connection, new_token: NewRefreshToken) -> Result<i64> {
    let created_at = get_timestamp();

    conn.call(move |conn: &mut rusqlite::Connection| {
        conn.execute(
            "INSERT INTO refresh_tokens (token, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                new_token.token,
                new_token.user_id,
                created_at,
                new_token.expires_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
    .await
}

/// Remove a stored token. Returns how many rows went (0 or 1).
pub async fn delete_refresh_token(conn: &Connection, token: String) -> Result<usize> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let count = conn.execute("DELETE FROM refresh_tokens WHERE token = ?1", params![token])?;
        Ok(count)
    })
    .await
}

/// Exchange `presented` for `successor` in one immediate transaction.
///
/// The presented row must exist, be unexpired, belong to `user_id`, and its
/// owner must still exist. The delete has to remove exactly one row, so of
/// two concurrent exchanges of the same token only one can commit. Any
/// rejection rolls back and yields `None`, leaving the store unchanged.
pub async fn rotate_refresh_token(
    conn: &Connection,
    presented: String,
    successor: NewRefreshToken,
) -> Result<Option<User>> {
    let now = get_timestamp();

    conn.call(move |conn: &mut rusqlite::Connection| {
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let owner: Option<i64> = tx
            .query_row(
                "SELECT user_id FROM refresh_tokens WHERE token = ?1 AND expires_at > ?2",
                params![presented, now],
                |r| r.get(0),
            )
            .optional()?;

        if owner != Some(successor.user_id) {
            return Ok(None);
        }

        let user = tx
            .query_row(
                "SELECT id, email, password_hash, nickname, created_at FROM users WHERE id = ?1",
                params![successor.user_id],
                |row: &rusqlite::Row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        password_hash: row.get(2)?,
                        nickname: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?;

        let Some(user) = user else {
            return Ok(None);
        };

        let removed = tx.execute(
            "DELETE FROM refresh_tokens WHERE token = ?1",
            params![presented],
        )?;
        if removed != 1 {
            return Ok(None);
        }

        tx.execute(
            "INSERT INTO refresh_tokens (token, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![successor.token, successor.user_id, now, successor.expires_at],
        )?;

        tx.commit()?;
        Ok(Some(user))
    })
    .await
}

/// Drop every row whose expiry has passed. Returns the number removed.
pub async fn purge_expired_refresh_tokens(conn: &Connection) -> Result<usize> {
    let now = get_timestamp();

    conn.call(move |conn: &mut rusqlite::Connection| {
        let count = conn.execute(
            "DELETE FROM refresh_tokens WHERE expires_at <= ?1",
            params![now],
        )?;
        if count > 0 {
            info!("Purged {} expired refresh tokens", count);
        }
        Ok(count)
    })
    .await
}

/// Number of live sessions held by a user.
pub async fn count_refresh_tokens_for_user(conn: &Connection, user_id: i64) -> Result<i64> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?1",
            params![user_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
    .await
}
