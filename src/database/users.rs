//! User rows: registration, timezone capture, profile reads

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::core::error::DomainError;
use crate::core::models::{Stage, UserId, UserProfile, UserState, Window};

use super::sessions::session_row;
use super::Database;

impl Database {
    /// Register the user on first contact and make sure their session row
    /// exists, then return both records.
    ///
    /// Idempotent: repeat calls refresh the delivery chat id and touch
    /// nothing else, so an in-flight quota or stage survives. A brand new
    /// session starts at `(Main, AwaitingUtcOffset)` so timezone capture
    /// happens before anything else.
    pub async fn ensure_user(
        &self,
        user: &UserId,
        chat_id: i64,
        initial_event_quota: i64,
    ) -> Result<(UserProfile, UserState), DomainError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO users (id, chat_id, event_quota) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET chat_id = excluded.chat_id",
            params![user.as_str(), chat_id, initial_event_quota],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO user_state (user_id, window, stage) VALUES (?1, ?2, ?3)",
            params![
                user.as_str(),
                Window::Main.as_str(),
                Stage::AwaitingUtcOffset.as_str()
            ],
        )?;
        let profile = profile_row(&tx, user)?.ok_or(DomainError::UserNotFound)?;
        let state = session_row(&tx, user)?.ok_or(DomainError::UserNotFound)?;
        tx.commit()?;
        Ok((profile, state))
    }

    /// Store the user's UTC offset in whole hours.
    pub async fn set_utc_offset(&self, user: &UserId, hours: i32) -> Result<(), DomainError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE users SET utc_offset = ?2 WHERE id = ?1",
            params![user.as_str(), hours],
        )?;
        if changed == 0 {
            return Err(DomainError::UserNotFound);
        }
        Ok(())
    }

    pub async fn get_profile(&self, user: &UserId) -> Result<Option<UserProfile>, DomainError> {
        let conn = self.conn.lock().await;
        Ok(profile_row(&conn, user)?)
    }
}

pub(crate) fn profile_row(
    conn: &Connection,
    user: &UserId,
) -> Result<Option<UserProfile>, DomainError> {
    let profile = conn
        .query_row(
            "SELECT id, chat_id, event_quota, utc_offset FROM users WHERE id = ?1",
            params![user.as_str()],
            |row| {
                Ok(UserProfile {
                    id: UserId::from_hash(row.get(0)?),
                    chat_id: row.get(1)?,
                    event_quota: row.get(2)?,
                    utc_offset: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(profile)
}
