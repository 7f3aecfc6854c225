//! Quota ledger: the only code that moves the two slot counters
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//!
//! `users.event_quota` caps how many events a user can hold at once;
//! `events.notice_quota` caps notices per event. A slot is reserved in the
//! same transaction as the insert that consumes it and released in the same
//! transaction as the delete that frees it, so the counters never drift from
//! the row counts.

use rusqlite::{params, Transaction, TransactionBehavior};

use crate::core::error::{DomainError, QuotaKind};
use crate::core::models::UserId;

use super::Database;

/// Take one event slot from the user, or report why that is impossible.
/// The conditional update is atomic: of any number of concurrent callers,
/// at most `quota` ever succeed.
pub(crate) fn reserve_event_slot_tx(tx: &Transaction<'_>, user: &UserId) -> Result<(), DomainError> {
    let changed = tx.execute(
        "UPDATE users SET event_quota = event_quota - 1 WHERE id = ?1 AND event_quota > 0",
        params![user.as_str()],
    )?;
    if changed == 1 {
        return Ok(());
    }
    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        params![user.as_str()],
        |row| row.get(0),
    )?;
    if exists {
        Err(DomainError::QuotaExhausted(QuotaKind::Event))
    } else {
        Err(DomainError::UserNotFound)
    }
}

/// Return `count` event slots to the user.
pub(crate) fn release_event_slots_tx(
    tx: &Transaction<'_>,
    user: &UserId,
    count: i64,
) -> Result<(), DomainError> {
    if count == 0 {
        return Ok(());
    }
    let changed = tx.execute(
        "UPDATE users SET event_quota = event_quota + ?2 WHERE id = ?1",
        params![user.as_str(), count],
    )?;
    if changed == 0 {
        return Err(DomainError::UserNotFound);
    }
    Ok(())
}

/// Take one notice slot from the event.
pub(crate) fn reserve_notice_slot_tx(tx: &Transaction<'_>, event_id: i64) -> Result<(), DomainError> {
    let changed = tx.execute(
        "UPDATE events SET notice_quota = notice_quota - 1 WHERE id = ?1 AND notice_quota > 0",
        params![event_id],
    )?;
    if changed == 1 {
        return Ok(());
    }
    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM events WHERE id = ?1)",
        params![event_id],
        |row| row.get(0),
    )?;
    if exists {
        Err(DomainError::QuotaExhausted(QuotaKind::Notice))
    } else {
        Err(DomainError::EventNotFound)
    }
}

/// Return `count` notice slots to the event.
pub(crate) fn release_notice_slots_tx(
    tx: &Transaction<'_>,
    event_id: i64,
    count: i64,
) -> Result<(), DomainError> {
    if count == 0 {
        return Ok(());
    }
    let changed = tx.execute(
        "UPDATE events SET notice_quota = notice_quota + ?2 WHERE id = ?1",
        params![event_id, count],
    )?;
    if changed == 0 {
        return Err(DomainError::EventNotFound);
    }
    Ok(())
}

impl Database {
    /// Reserve one event slot outside of a create call. The store's own
    /// operations reserve inside their transactions; this surface exists for
    /// callers that need the ledger on its own.
    pub async fn try_reserve_event_slot(&self, user: &UserId) -> Result<(), DomainError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        reserve_event_slot_tx(&tx, user)?;
        tx.commit()?;
        Ok(())
    }

    /// Return event slots to a user.
    pub async fn release_event_slots(&self, user: &UserId, count: i64) -> Result<(), DomainError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        release_event_slots_tx(&tx, user, count)?;
        tx.commit()?;
        Ok(())
    }

    /// Reserve one notice slot on an event.
    pub async fn try_reserve_notice_slot(&self, event_id: i64) -> Result<(), DomainError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        reserve_notice_slot_tx(&tx, event_id)?;
        tx.commit()?;
        Ok(())
    }

    /// Return notice slots to an event.
    pub async fn release_notice_slots(&self, event_id: i64, count: i64) -> Result<(), DomainError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        release_notice_slots_tx(&tx, event_id, count)?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DomainError;

    async fn seeded(initial_quota: i64) -> (Database, UserId) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserId::from_raw("quota-user");
        db.ensure_user(&user, 100, initial_quota).await.unwrap();
        (db, user)
    }

    #[tokio::test]
    async fn test_reserve_until_exhausted() {
        let (db, user) = seeded(2).await;
        db.try_reserve_event_slot(&user).await.unwrap();
        db.try_reserve_event_slot(&user).await.unwrap();
        let err = db.try_reserve_event_slot(&user).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::QuotaExhausted(QuotaKind::Event)
        ));
    }

    #[tokio::test]
    async fn test_release_makes_slot_available_again() {
        let (db, user) = seeded(1).await;
        db.try_reserve_event_slot(&user).await.unwrap();
        assert!(db.try_reserve_event_slot(&user).await.is_err());
        db.release_event_slots(&user, 1).await.unwrap();
        db.try_reserve_event_slot(&user).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_quota_exhausted() {
        let db = Database::open_in_memory().await.unwrap();
        let ghost = UserId::from_raw("never-registered");
        let err = db.try_reserve_event_slot(&ghost).await.unwrap_err();
        assert!(matches!(err, DomainError::UserNotFound));
    }

    #[tokio::test]
    async fn test_concurrent_reservations_against_one_slot() {
        let (db, user) = seeded(1).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            let user = user.clone();
            handles.push(tokio::spawn(
                async move { db.try_reserve_event_slot(&user).await },
            ));
        }

        let mut successes = 0;
        let mut exhausted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => successes += 1,
                Err(DomainError::QuotaExhausted(QuotaKind::Event)) => exhausted += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(exhausted, 7);
    }
}
