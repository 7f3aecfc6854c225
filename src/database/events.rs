//! Event rows: quota-gated create, partial edit with notice cascade, delete
//!
//! - **Version**: 1.1.1
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.1: Creation accepts an event at the exact current minute
//! - 1.1.0: Rescheduling releases the slots of purged notices
//! - 1.0.0: CRUD with slot accounting

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};

use crate::core::error::DomainError;
use crate::core::models::{Event, EventPatch, UserId};

use super::quota::{release_event_slots_tx, release_notice_slots_tx, reserve_event_slot_tx};
use super::{date_col, date_to_sql, time_col, time_to_sql, Database};

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        owner: UserId::from_hash(row.get(1)?),
        date: date_col(row.get(2)?, 2)?,
        time: time_col(row.get(3)?, 3)?,
        name: row.get(4)?,
        description: row.get(5)?,
        notice_quota: row.get(6)?,
    })
}

const EVENT_COLUMNS: &str = "id, owner_id, date, time, name, description, notice_quota";

impl Database {
    /// Create an event, consuming one of the owner's event slots. The slot
    /// reservation and the insert commit together or not at all.
    ///
    /// `now` is the caller's reading of the owner's wall clock; an event
    /// strictly before it is rejected outright. An event at exactly `now` is
    /// allowed, unlike a reschedule.
    pub async fn create_event(
        &self,
        owner: &UserId,
        date: NaiveDate,
        time: NaiveTime,
        name: &str,
        description: &str,
        initial_notice_quota: i64,
        now: NaiveDateTime,
    ) -> Result<i64, DomainError> {
        if date.and_time(time) < now {
            return Err(DomainError::EventTimeInPast);
        }
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        reserve_event_slot_tx(&tx, owner)?;
        tx.execute(
            "INSERT INTO events (owner_id, date, time, name, description, notice_quota)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                owner.as_str(),
                date_to_sql(date),
                time_to_sql(time),
                name,
                description,
                initial_notice_quota
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    pub async fn get_event(
        &self,
        owner: &UserId,
        event_id: i64,
    ) -> Result<Option<Event>, DomainError> {
        let conn = self.conn.lock().await;
        let event = conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1 AND owner_id = ?2"),
                params![event_id, owner.as_str()],
                event_from_row,
            )
            .optional()?;
        Ok(event)
    }

    /// All of the user's events in creation order.
    pub async fn list_events(&self, owner: &UserId) -> Result<Vec<Event>, DomainError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE owner_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![owner.as_str()], event_from_row)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    /// Apply a partial edit. When the edit moves the event's date or time,
    /// every notice now strictly later than the event is deleted and its slot
    /// returned, all in one transaction. Returns how many notices were purged.
    pub async fn update_event(
        &self,
        owner: &UserId,
        event_id: i64,
        patch: &EventPatch,
        now: NaiveDateTime,
    ) -> Result<usize, DomainError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = tx
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1 AND owner_id = ?2"),
                params![event_id, owner.as_str()],
                event_from_row,
            )
            .optional()?
            .ok_or(DomainError::EventNotFound)?;

        if patch.is_empty() {
            return Ok(0);
        }

        let date = patch.date.unwrap_or(current.date);
        let time = patch.time.unwrap_or(current.time);
        if patch.reschedules() && date.and_time(time) <= now {
            return Err(DomainError::InvalidFixTime);
        }
        let name = patch.name.as_deref().unwrap_or(&current.name);
        let description = patch.description.as_deref().unwrap_or(&current.description);

        tx.execute(
            "UPDATE events SET date = ?2, time = ?3, name = ?4, description = ?5 WHERE id = ?1",
            params![event_id, date_to_sql(date), time_to_sql(time), name, description],
        )?;

        let mut purged = 0;
        if patch.reschedules() {
            purged = tx.execute(
                "DELETE FROM notices WHERE event_id = ?1
                 AND (date > ?2 OR (date = ?2 AND time > ?3))",
                params![event_id, date_to_sql(date), time_to_sql(time)],
            )?;
            release_notice_slots_tx(&tx, event_id, purged as i64)?;
        }
        tx.commit()?;
        Ok(purged)
    }

    /// Delete one event, returning its slot to the owner. Child notices go
    /// with it and any session still pointing at it is cleared.
    pub async fn delete_event(&self, owner: &UserId, event_id: i64) -> Result<(), DomainError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let owned: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM events WHERE id = ?1 AND owner_id = ?2)",
            params![event_id, owner.as_str()],
            |row| row.get(0),
        )?;
        if !owned {
            return Err(DomainError::EventNotFound);
        }
        tx.execute(
            "UPDATE user_state SET event_id = NULL, notice_id = NULL WHERE event_id = ?1",
            params![event_id],
        )?;
        tx.execute("DELETE FROM events WHERE id = ?1", params![event_id])?;
        release_event_slots_tx(&tx, owner, 1)?;
        tx.commit()?;
        Ok(())
    }

    /// Delete every event the user owns and return that many slots. Fails
    /// with `NothingToDelete` when there is nothing to do.
    pub async fn delete_all_events(&self, owner: &UserId) -> Result<i64, DomainError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM events WHERE owner_id = ?1",
            params![owner.as_str()],
            |row| row.get(0),
        )?;
        if count == 0 {
            return Err(DomainError::NothingToDelete);
        }
        tx.execute(
            "UPDATE user_state SET event_id = NULL, notice_id = NULL WHERE user_id = ?1",
            params![owner.as_str()],
        )?;
        tx.execute(
            "DELETE FROM events WHERE owner_id = ?1",
            params![owner.as_str()],
        )?;
        release_event_slots_tx(&tx, owner, count)?;
        tx.commit()?;
        Ok(count)
    }
}
