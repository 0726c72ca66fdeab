use tokio_rusqlite::{Connection, OptionalExtension, Result, params, rusqlite};
use tracing::info;

use shared::types::UserProfile;

use crate::database::utils::get_timestamp;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub nickname: String,
}

/// A full user row, including the password hash. Never serialized.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub nickname: String,
    pub created_at: i64,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            nickname: self.nickname.clone(),
        }
    }
}

/// Outcome of an insert that may collide with the unique email index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Created(i64),
    EmailTaken,
}

fn map_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        nickname: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Insert a new user.
///
/// The existence check and the insert share one closure on the connection
/// thread, and a unique-constraint hit is reported the same way, so two
/// concurrent registrations for one email cannot both succeed.
pub async fn register_user(conn: &Connection, new_user: NewUser) -> Result<Registration> {
    let created_at = get_timestamp();

    conn.call(move |conn: &mut rusqlite::Connection| {
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            params![new_user.email],
            |r| r.get(0),
        )?;
        if exists > 0 {
            return Ok(Registration::EmailTaken);
        }

        let inserted = conn.execute(
            "INSERT INTO users (email, password_hash, nickname, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                new_user.email,
                new_user.password_hash,
                new_user.nickname,
                created_at,
            ],
        );

        match inserted {
            Ok(_) => {
                info!("New user registered! {}", new_user.email);
                Ok(Registration::Created(conn.last_insert_rowid()))
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(Registration::EmailTaken)
            }
            Err(e) => Err(e),
        }
    })
    .await
}

/// Get user by email (exact match)
pub async fn get_user_by_email(conn: &Connection, email: String) -> Result<Option<User>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let mut stmt = conn.prepare(
            "SELECT id, email, password_hash, nickname, created_at FROM users WHERE email = ?1",
        )?;

        let user = stmt.query_row(params![email], map_user).optional()?;

        Ok(user)
    })
    .await
}

/// Get user by ID
pub async fn get_user_by_id(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let mut stmt = conn.prepare(
            "SELECT id, email, password_hash, nickname, created_at FROM users WHERE id = ?1",
        )?;

        let user = stmt.query_row(params![user_id], map_user).optional()?;

        Ok(user)
    })
    .await
}

/// Remove a user. Refresh tokens, quick links and schedules cascade.
pub async fn delete_user(conn: &Connection, user_id: i64) -> Result<bool> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let count = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        if count > 0 {
            info!("User deleted! {}", user_id);
        }
        Ok(count > 0)
    })
    .await
}
