use tokio_rusqlite::{Connection, Result, params, rusqlite};

use shared::types::{OrderUpdate, QuickLink};

use crate::database::utils::get_timestamp;

const QUICK_LINK_COLUMNS: &str = "id, title, url, order_index, icon_url, user_id";

fn map_quick_link(row: &rusqlite::Row) -> rusqlite::Result<QuickLink> {
    Ok(QuickLink {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        order_index: row.get(3)?,
        icon_url: row.get(4)?,
        user_id: row.get(5)?,
    })
}

/// All of a user's links, board order first, then creation order.
pub async fn list_quick_links(conn: &Connection, user_id: i64) -> Result<Vec<QuickLink>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {QUICK_LINK_COLUMNS} FROM quick_links
             WHERE user_id = ?1 ORDER BY order_index ASC, id ASC"
        ))?;

        let links = stmt
            .query_map(params![user_id], map_quick_link)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(links)
    })
    .await
}

/// Append a link to the end of the user's board.
pub async fn create_quick_link(
    conn: &Connection,
    user_id: i64,
    title: String,
    url: String,
) -> Result<QuickLink> {
    let created_at = get_timestamp();

    conn.call(move |conn: &mut rusqlite::Connection| {
        let tx = conn.transaction()?;

        let order_index: i64 = tx.query_row(
            "SELECT COUNT(*) FROM quick_links WHERE user_id = ?1",
            params![user_id],
            |r| r.get(0),
        )?;

        tx.execute(
            "INSERT INTO quick_links (user_id, title, url, order_index, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, title, url, order_index, created_at],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(QuickLink {
            id,
            title,
            url,
            order_index,
            icon_url: None,
            user_id,
        })
    })
    .await
}

/// Apply the provided fields. `None` when the link is missing or not owned.
pub async fn update_quick_link(
    conn: &Connection,
    user_id: i64,
    link_id: i64,
    title: Option<String>,
    url: Option<String>,
) -> Result<Option<QuickLink>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let count = conn.execute(
            "UPDATE quick_links
             SET title = COALESCE(?1, title), url = COALESCE(?2, url)
             WHERE id = ?3 AND user_id = ?4",
            params![title, url, link_id, user_id],
        )?;
        if count == 0 {
            return Ok(None);
        }

        let link = conn.query_row(
            &format!("SELECT {QUICK_LINK_COLUMNS} FROM quick_links WHERE id = ?1"),
            params![link_id],
            map_quick_link,
        )?;
        Ok(Some(link))
    })
    .await
}

/// Rewrite order indexes in one transaction.
///
/// Returns `false` without touching anything if any id is not one of the
/// user's links.
pub async fn reorder_quick_links(
    conn: &Connection,
    user_id: i64,
    updates: Vec<OrderUpdate>,
) -> Result<bool> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let tx = conn.transaction()?;

        for update in &updates {
            let count = tx.execute(
                "UPDATE quick_links SET order_index = ?1 WHERE id = ?2 AND user_id = ?3",
                params![update.order_index, update.id, user_id],
            )?;
            if count == 0 {
                return Ok(false);
            }
        }

        tx.commit()?;
        Ok(true)
    })
    .await
}

/// Delete a link the user owns. Returns whether a row went.
pub async fn delete_quick_link(conn: &Connection, user_id: i64, link_id: i64) -> Result<bool> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let count = conn.execute(
            "DELETE FROM quick_links WHERE id = ?1 AND user_id = ?2",
            params![link_id, user_id],
        )?;
        Ok(count > 0)
    })
    .await
}
