//! # Scheduler Module
//!
//! One-shot reminder timers with at-most-once delivery.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Re-arm persisted notices on startup
//! - 1.0.0: Spawned one-shot timers with existence re-check
//!
//! Each armed reminder is a spawned task holding an immutable [`ReminderJob`]
//! snapshot. There is no cancellation handle: deleting the notice row is the
//! cancellation, because the timer re-checks existence before delivering and
//! deletes the row as its final step. The row is the single source of truth,
//! which keeps delivery at-most-once across duplicate arms and restarts.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use log::{debug, info, warn};

use crate::core::error::DomainError;
use crate::core::models::{PendingReminder, UserId};
use crate::core::render;
use crate::database::Database;
use crate::transport::{ChatId, ChatPort, Outgoing};

/// Everything a timer task needs, captured at arm time. The task never reads
/// shared mutable state; it re-validates against storage when it wakes.
#[derive(Debug, Clone)]
pub struct ReminderJob {
    pub notice_id: i64,
    pub event_id: i64,
    pub owner: UserId,
    pub chat: ChatId,
    pub user_utc_offset: i32,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl ReminderJob {
    /// The notice instant in the owner's wall clock.
    pub fn notice_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

impl From<PendingReminder> for ReminderJob {
    fn from(pending: PendingReminder) -> Self {
        ReminderJob {
            notice_id: pending.notice_id,
            event_id: pending.event_id,
            owner: pending.owner,
            chat: ChatId(pending.chat_id),
            user_utc_offset: pending.utc_offset,
            date: pending.date,
            time: pending.time,
        }
    }
}

/// What happened when a timer woke up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// The reminder was rendered, sent and its notice consumed.
    Delivered,
    /// The notice (or its event) was gone; nothing was sent.
    Skipped,
}

/// Arms and runs reminder timers.
#[derive(Clone)]
pub struct ReminderScheduler {
    database: Database,
    port: Arc<dyn ChatPort>,
    service_utc_offset: i32,
}

impl ReminderScheduler {
    pub fn new(database: Database, port: Arc<dyn ChatPort>, service_utc_offset: i32) -> Self {
        ReminderScheduler {
            database,
            port,
            service_utc_offset,
        }
    }

    /// When the job should fire, on the service host's wall clock.
    ///
    /// Notice instants are user-local; shifting by the difference between the
    /// user's offset and the host's offset converts them to the clock this
    /// process actually measures. On a UTC host (offset 0) this is a plain
    /// local-to-UTC conversion.
    pub fn fire_at(&self, job: &ReminderJob) -> NaiveDateTime {
        job.notice_at() - Duration::hours(i64::from(job.user_utc_offset - self.service_utc_offset))
    }

    fn service_now(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::hours(i64::from(self.service_utc_offset))
    }

    /// Arm a one-shot timer. A job already past due fires immediately.
    pub fn schedule(&self, job: ReminderJob) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let delay = scheduler.fire_at(&job) - scheduler.service_now();
            if let Ok(wait) = delay.to_std() {
                tokio::time::sleep(wait).await;
            }
            match scheduler.fire(&job).await {
                Ok(FireOutcome::Delivered) => info!(
                    "⏰ Delivered reminder {} for event {} to user {}",
                    job.notice_id,
                    job.event_id,
                    job.owner.short()
                ),
                Ok(FireOutcome::Skipped) => {
                    debug!("Reminder {} skipped, notice gone before firing", job.notice_id)
                }
                Err(e) => warn!("Reminder {} failed: {e}", job.notice_id),
            }
        });
    }

    /// The timer body. Re-checks that the notice still exists, renders and
    /// sends the reminder, then deletes the notice as the final step. A send
    /// failure is logged but not retried; the notice is consumed either way.
    pub async fn fire(&self, job: &ReminderJob) -> Result<FireOutcome, DomainError> {
        if !self.database.notice_exists(job.notice_id).await? {
            return Ok(FireOutcome::Skipped);
        }
        let event = match self.database.get_event(&job.owner, job.event_id).await? {
            Some(event) => event,
            None => return Ok(FireOutcome::Skipped),
        };
        let message = Outgoing {
            chat: job.chat,
            text: render::reminder_message(&event, job.notice_at()),
            keyboard: None,
        };
        if let Err(e) = self.port.send(message).await {
            warn!("Reminder {} delivery failed: {e}", job.notice_id);
        }
        match self.database.delete_notice(job.notice_id).await {
            Ok(()) | Err(DomainError::NoticeNotFound) => Ok(FireOutcome::Delivered),
            Err(e) => Err(e),
        }
    }

    /// Re-arm a timer for every notice in storage. Called once at startup so
    /// reminders survive restarts; stale timers are harmless because firing
    /// re-checks the row.
    pub async fn rearm_all(&self) -> Result<usize, DomainError> {
        let pending = self.database.list_pending_reminders().await?;
        let count = pending.len();
        for reminder in pending {
            self.schedule(reminder.into());
        }
        if count > 0 {
            info!("🔁 Re-armed {count} reminder timer(s) from storage");
        }
        Ok(count)
    }
}
