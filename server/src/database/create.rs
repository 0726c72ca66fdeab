use tokio_rusqlite::{Connection, Result, rusqlite};
use tracing::{info, warn};

/// Current schema version.  Bump this whenever the schema changes and add a
/// corresponding migration arm in `run_migrations`.
const SCHEMA_VERSION: u32 = 1;

/// Initialize the database schema and run any pending migrations.
pub async fn create_tables(conn: &Connection) -> Result<()> {
    create_schema(conn).await?;
    run_migrations(conn).await?;
    Ok(())
}

/// Create all tables for a brand-new database.
async fn create_schema(conn: &Connection) -> Result<()> {
    conn.call(|conn: &mut rusqlite::Connection| {
        // Rows in every other table are owned by a user and go with it.
        conn.execute_batch("PRAGMA foreign_keys = ON")?;

        // Email is the login handle; compared exactly as stored.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                email         TEXT    NOT NULL UNIQUE,
                password_hash TEXT    NOT NULL,
                nickname      TEXT    NOT NULL,
                created_at    INTEGER NOT NULL
            )",
            [],
        )?;

        // One row per live session. The signed token string is the key; a
        // row disappears on rotation, logout, or the expiry purge.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS refresh_tokens (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                token      TEXT    NOT NULL UNIQUE,
                user_id    INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS quick_links (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL,
                title       TEXT    NOT NULL,
                url         TEXT    NOT NULL,
                order_index INTEGER NOT NULL DEFAULT 0,
                icon_url    TEXT,
                created_at  INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        // `date` is a naive calendar day (YYYY-MM-DD), so lexical order is
        // chronological order.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schedules (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id       INTEGER NOT NULL,
                title         TEXT    NOT NULL,
                content       TEXT,
                date          TEXT    NOT NULL,
                hyperlink_url TEXT    NOT NULL,
                created_at    INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        // --- Indexes --------------------------------------------------------
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user    ON refresh_tokens(user_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_expiry  ON refresh_tokens(expires_at)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_quick_links_user_order ON quick_links(user_id, order_index)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_schedules_user_date    ON schedules(user_id, date)",
            [],
        )?;

        Ok(())
    })
    .await
}

/// Apply any schema migrations required to reach `SCHEMA_VERSION`.
///
/// Uses `PRAGMA user_version` as the migration counter.
async fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version: u32 = conn
        .call(|conn| {
            let v: u32 = conn
                .query_row("PRAGMA user_version", [], |r| r.get(0))
                .unwrap_or(0);
            Ok::<_, rusqlite::Error>(v)
        })
        .await?;

    if current_version == SCHEMA_VERSION {
        return Ok(());
    }

    if current_version > SCHEMA_VERSION {
        warn!(
            "Database schema version {} is newer than this build understands ({}); continuing",
            current_version, SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Database schema at version {}; target version {}",
        current_version, SCHEMA_VERSION
    );

    // v0 is a fresh file: `create_schema` already produced the v1 layout.
    // Add future migration arms here:
    // if current_version < 2 { ... }

    conn.call(|conn| {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    info!("Schema version set to {}.", SCHEMA_VERSION);

    Ok(())
}

/// Open or create the database and ensure the schema is up to date.
///
/// `":memory:"` opens a private in-memory database (used by tests).
pub async fn open_database(path: &str) -> Result<Connection> {
    let conn = if path == ":memory:" {
        Connection::open_in_memory().await?
    } else {
        Connection::open(path).await?
    };

    conn.call(|conn| {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    create_tables(&conn).await?;
    Ok(conn)
}
