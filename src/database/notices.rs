//! Notice rows: quota-gated create, existence checks, the re-arm join
//!
//! A notice never outlives its event (FK cascade) and never fires after it
//! (checked on create). Deletion is the scheduler's commit point: once the
//! row is gone the reminder can never be delivered again.

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};

use crate::core::error::DomainError;
use crate::core::models::{Notice, PendingReminder, UserId};

use super::quota::{release_notice_slots_tx, reserve_notice_slot_tx};
use super::{date_col, date_to_sql, time_col, time_to_sql, Database};

fn notice_from_row(row: &Row<'_>) -> rusqlite::Result<Notice> {
    Ok(Notice {
        id: row.get(0)?,
        event_id: row.get(1)?,
        date: date_col(row.get(2)?, 2)?,
        time: time_col(row.get(3)?, 3)?,
    })
}

impl Database {
    /// Attach a notice to an event, consuming one of the event's notice
    /// slots. Rejected when the notice would fire after the event starts.
    pub async fn create_notice(
        &self,
        event_id: i64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<i64, DomainError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let event_at: Option<(String, String)> = tx
            .query_row(
                "SELECT date, time FROM events WHERE id = ?1",
                params![event_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (event_date, event_time) = event_at.ok_or(DomainError::EventNotFound)?;
        let event_starts = date_col(event_date, 0)?.and_time(time_col(event_time, 1)?);
        if date.and_time(time) > event_starts {
            return Err(DomainError::NoticeAfterEvent);
        }

        reserve_notice_slot_tx(&tx, event_id)?;
        tx.execute(
            "INSERT INTO notices (event_id, date, time) VALUES (?1, ?2, ?3)",
            params![event_id, date_to_sql(date), time_to_sql(time)],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    /// Delete a notice and return its slot to the parent event. Clears any
    /// session pointing at the notice.
    pub async fn delete_notice(&self, notice_id: i64) -> Result<(), DomainError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let event_id: Option<i64> = tx
            .query_row(
                "SELECT event_id FROM notices WHERE id = ?1",
                params![notice_id],
                |row| row.get(0),
            )
            .optional()?;
        let event_id = event_id.ok_or(DomainError::NoticeNotFound)?;
        tx.execute("DELETE FROM notices WHERE id = ?1", params![notice_id])?;
        release_notice_slots_tx(&tx, event_id, 1)?;
        tx.execute(
            "UPDATE user_state SET notice_id = NULL WHERE notice_id = ?1",
            params![notice_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// The scheduler's pre-delivery check.
    pub async fn notice_exists(&self, notice_id: i64) -> Result<bool, DomainError> {
        let conn = self.conn.lock().await;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM notices WHERE id = ?1)",
            params![notice_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// An event's notices in creation order. Listing positions are what the
    /// delete-notice flow asks the user to pick from.
    pub async fn list_notices(&self, event_id: i64) -> Result<Vec<Notice>, DomainError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, event_id, date, time FROM notices WHERE event_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![event_id], notice_from_row)?;
        let mut notices = Vec::new();
        for row in rows {
            notices.push(row?);
        }
        Ok(notices)
    }

    /// Every notice in the store joined with its delivery coordinates, used
    /// to re-arm timers after a restart. Users who never finished timezone
    /// capture cannot have notices, so the inner join drops nothing.
    pub async fn list_pending_reminders(&self) -> Result<Vec<PendingReminder>, DomainError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT n.id, n.event_id, e.owner_id, u.chat_id, u.utc_offset, n.date, n.time
             FROM notices n
             JOIN events e ON e.id = n.event_id
             JOIN users u ON u.id = e.owner_id
             WHERE u.utc_offset IS NOT NULL
             ORDER BY n.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PendingReminder {
                notice_id: row.get(0)?,
                event_id: row.get(1)?,
                owner: UserId::from_hash(row.get(2)?),
                chat_id: row.get(3)?,
                utc_offset: row.get(4)?,
                date: date_col(row.get(5)?, 5)?,
                time: time_col(row.get(6)?, 6)?,
            })
        })?;
        let mut pending = Vec::new();
        for row in rows {
            pending.push(row?);
        }
        Ok(pending)
    }
}
