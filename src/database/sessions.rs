//! Per-user session rows: window, stage and the current event/notice selection
//!
//! The row is created on first contact, reset to idle when flows finish, and
//! never deleted while the user exists.

use rusqlite::{params, Connection, OptionalExtension};
use rusqlite::types::Type;

use crate::core::error::DomainError;
use crate::core::models::{Stage, UserId, UserState, Window};

use super::Database;

impl Database {
    pub async fn get_session(&self, user: &UserId) -> Result<Option<UserState>, DomainError> {
        let conn = self.conn.lock().await;
        session_row(&conn, user)
    }

    pub async fn set_stage(&self, user: &UserId, stage: Stage) -> Result<(), DomainError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE user_state SET stage = ?2 WHERE user_id = ?1",
            params![user.as_str(), stage.as_str()],
        )?;
        if changed == 0 {
            return Err(DomainError::UserNotFound);
        }
        Ok(())
    }

    pub async fn set_window(&self, user: &UserId, window: Window) -> Result<(), DomainError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE user_state SET window = ?2 WHERE user_id = ?1",
            params![user.as_str(), window.as_str()],
        )?;
        if changed == 0 {
            return Err(DomainError::UserNotFound);
        }
        Ok(())
    }

    /// Point the session at an event (or clear it with `None`). Changing the
    /// event always drops any notice selection, which can only belong to the
    /// previously selected event.
    pub async fn set_selected_event(
        &self,
        user: &UserId,
        event_id: Option<i64>,
    ) -> Result<(), DomainError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE user_state SET event_id = ?2, notice_id = NULL WHERE user_id = ?1",
            params![user.as_str(), event_id],
        )?;
        if changed == 0 {
            return Err(DomainError::UserNotFound);
        }
        Ok(())
    }

    pub async fn set_selected_notice(
        &self,
        user: &UserId,
        notice_id: Option<i64>,
    ) -> Result<(), DomainError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE user_state SET notice_id = ?2 WHERE user_id = ?1",
            params![user.as_str(), notice_id],
        )?;
        if changed == 0 {
            return Err(DomainError::UserNotFound);
        }
        Ok(())
    }
}

pub(crate) fn session_row(
    conn: &Connection,
    user: &UserId,
) -> Result<Option<UserState>, DomainError> {
    let state = conn
        .query_row(
            "SELECT user_id, window, stage, event_id, notice_id FROM user_state WHERE user_id = ?1",
            params![user.as_str()],
            |row| {
                let window_raw: String = row.get(1)?;
                let stage_raw: String = row.get(2)?;
                let window = Window::parse(&window_raw).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        Type::Text,
                        format!("unknown window: {window_raw}").into(),
                    )
                })?;
                let stage = Stage::parse(&stage_raw).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        Type::Text,
                        format!("unknown stage: {stage_raw}").into(),
                    )
                })?;
                Ok(UserState {
                    user_id: UserId::from_hash(row.get(0)?),
                    window,
                    stage,
                    event_id: row.get(3)?,
                    notice_id: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (Database, UserId) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserId::from_raw("session-user");
        db.ensure_user(&user, 1, 10).await.unwrap();
        (db, user)
    }

    #[tokio::test]
    async fn test_stage_and_window_updates_persist() {
        let (db, user) = seeded().await;

        db.set_stage(&user, Stage::AwaitingName).await.unwrap();
        db.set_window(&user, Window::EventDetail).await.unwrap();

        let state = db.get_session(&user).await.unwrap().unwrap();
        assert_eq!(state.stage, Stage::AwaitingName);
        assert_eq!(state.window, Window::EventDetail);
    }

    #[tokio::test]
    async fn test_changing_event_selection_clears_notice_selection() {
        let (db, user) = seeded().await;

        db.set_selected_event(&user, Some(11)).await.unwrap();
        db.set_selected_notice(&user, Some(99)).await.unwrap();

        db.set_selected_event(&user, Some(12)).await.unwrap();
        let state = db.get_session(&user).await.unwrap().unwrap();
        assert_eq!(state.event_id, Some(12));
        assert_eq!(state.notice_id, None);

        db.set_selected_event(&user, None).await.unwrap();
        let state = db.get_session(&user).await.unwrap().unwrap();
        assert_eq!(state.event_id, None);
    }

    #[tokio::test]
    async fn test_session_missing_for_unknown_user() {
        let db = Database::open_in_memory().await.unwrap();
        let ghost = UserId::from_raw("nobody");
        assert!(db.get_session(&ghost).await.unwrap().is_none());
        assert!(matches!(
            db.set_stage(&ghost, Stage::Idle).await.unwrap_err(),
            DomainError::UserNotFound
        ));
    }
}
