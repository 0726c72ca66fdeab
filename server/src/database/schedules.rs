use tokio_rusqlite::{Connection, OptionalExtension, Result, params, rusqlite};

use shared::types::Schedule;

use crate::database::utils::get_timestamp;

const SCHEDULE_COLUMNS: &str = "id, title, content, date, hyperlink_url, user_id";

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub title: String,
    pub content: Option<String>,
    pub date: String,
    pub hyperlink_url: String,
}

/// Fields to overwrite; `None` leaves the stored value alone.
///
/// `content` is doubly optional: `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct SchedulePatch {
    pub title: Option<String>,
    pub content: Option<Option<String>>,
    pub date: Option<String>,
    pub hyperlink_url: Option<String>,
}

fn map_schedule(row: &rusqlite::Row) -> rusqlite::Result<Schedule> {
    Ok(Schedule {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        date: row.get(3)?,
        hyperlink_url: row.get(4)?,
        user_id: row.get(5)?,
    })
}

/// A user's schedules ordered by date, optionally within an inclusive range.
pub async fn list_schedules(
    conn: &Connection,
    user_id: i64,
    start_date: Option<String>,
    end_date: Option<String>,
) -> Result<Vec<Schedule>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules
             WHERE user_id = ?1
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)
             ORDER BY date ASC, id ASC"
        ))?;

        let schedules = stmt
            .query_map(params![user_id, start_date, end_date], map_schedule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(schedules)
    })
    .await
}

/// Fetch one schedule, only if `user_id` owns it.
pub async fn get_schedule(
    conn: &Connection,
    user_id: i64,
    schedule_id: i64,
) -> Result<Option<Schedule>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let schedule = conn
            .query_row(
                &format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = ?1 AND user_id = ?2"),
                params![schedule_id, user_id],
                map_schedule,
            )
            .optional()?;
        Ok(schedule)
    })
    .await
}

pub async fn create_schedule(
    conn: &Connection,
    user_id: i64,
    new_schedule: NewSchedule,
) -> Result<Schedule> {
    let created_at = get_timestamp();

    conn.call(move |conn: &mut rusqlite::Connection| {
        conn.execute(
            "INSERT INTO schedules (user_id, title, content, date, hyperlink_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                new_schedule.title,
                new_schedule.content,
                new_schedule.date,
                new_schedule.hyperlink_url,
                created_at,
            ],
        )?;

        Ok(Schedule {
            id: conn.last_insert_rowid(),
            title: new_schedule.title,
            content: new_schedule.content,
            date: new_schedule.date,
            hyperlink_url: new_schedule.hyperlink_url,
            user_id,
        })
    })
    .await
}

/// Apply a patch. `None` when the schedule is missing or not owned.
pub async fn update_schedule(
    conn: &Connection,
    user_id: i64,
    schedule_id: i64,
    patch: SchedulePatch,
) -> Result<Option<Schedule>> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let tx = conn.transaction()?;

        let existing = tx
            .query_row(
                &format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = ?1 AND user_id = ?2"),
                params![schedule_id, user_id],
                map_schedule,
            )
            .optional()?;

        let Some(mut schedule) = existing else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            schedule.title = title;
        }
        if let Some(content) = patch.content {
            schedule.content = content;
        }
        if let Some(date) = patch.date {
            schedule.date = date;
        }
        if let Some(hyperlink_url) = patch.hyperlink_url {
            schedule.hyperlink_url = hyperlink_url;
        }

        tx.execute(
            "UPDATE schedules SET title = ?1, content = ?2, date = ?3, hyperlink_url = ?4
             WHERE id = ?5",
            params![
                schedule.title,
                schedule.content,
                schedule.date,
                schedule.hyperlink_url,
                schedule.id,
            ],
        )?;
        tx.commit()?;

        Ok(Some(schedule))
    })
    .await
}

/// Delete a schedule the user owns. Returns whether a row went.
pub async fn delete_schedule(conn: &Connection, user_id: i64, schedule_id: i64) -> Result<bool> {
    conn.call(move |conn: &mut rusqlite::Connection| {
        let count = conn.execute(
            "DELETE FROM schedules WHERE id = ?1 AND user_id = ?2",
            params![schedule_id, user_id],
        )?;
        Ok(count > 0)
    })
    .await
}
