//! Core domain types: users, events, notices and the per-user session row
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Typed window/stage enums replace raw strings
//! - 1.1.0: EventPatch for partial edits
//! - 1.0.0: Initial event/notice/user records

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Opaque user identity: the SHA-256 hex digest of the transport-level id.
///
/// The raw transport id never reaches storage; hashing happens once at the
/// boundary and every table references the digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Hash a raw transport id into the persisted identity.
    pub fn from_raw(raw: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(raw.as_bytes());
        UserId(format!("{:x}", hasher.finalize()))
    }

    /// Wrap an already-hashed id loaded from storage.
    pub(crate) fn from_hash(hash: String) -> Self {
        UserId(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

/// Per-user account row. `utc_offset` stays `None` until the user answers the
/// timezone prompt; date/time features are gated on it being set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub chat_id: i64,
    pub event_quota: i64,
    pub utc_offset: Option<i32>,
}

/// A future calendar entry owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub owner: UserId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub name: String,
    pub description: String,
    /// Remaining notice slots for this event.
    pub notice_quota: i64,
}

impl Event {
    /// The event's start instant in the owner's wall clock.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

/// A single scheduled reminder tied to an event. Deleted when it fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub id: i64,
    pub event_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl Notice {
    /// When the reminder should fire, in the owner's wall clock.
    pub fn fires_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

/// Partial edit of an event. `None` means "keep the current value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.time.is_none() && self.name.is_none() && self.description.is_none()
    }

    /// True when the edit touches the event's date or time.
    pub fn reschedules(&self) -> bool {
        self.date.is_some() || self.time.is_some()
    }
}

/// Which menu the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Window {
    /// Top-level menu over all events.
    Main,
    /// Menu scoped to one selected event.
    EventDetail,
}

impl Window {
    pub fn as_str(&self) -> &'static str {
        match self {
            Window::Main => "main",
            Window::EventDetail => "event_detail",
        }
    }

    pub fn parse(s: &str) -> Option<Window> {
        match s {
            "main" => Some(Window::Main),
            "event_detail" => Some(Window::EventDetail),
            _ => None,
        }
    }
}

/// What the next inbound message from the user means.
///
/// `Idle` is the resting state where menu commands are dispatched; every
/// other variant names the field or confirmation the machine is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    AwaitingUtcOffset,
    AwaitingDate,
    AwaitingTime,
    AwaitingName,
    AwaitingDescription,
    AwaitingEventSelection,
    AwaitingNoticeDate,
    AwaitingNoticeTime,
    AwaitingFixDate,
    AwaitingFixTime,
    AwaitingFixName,
    AwaitingFixDescription,
    AwaitingDeleteAllConfirm,
    AwaitingDeleteEventConfirm,
    AwaitingNoticeNumberToDelete,
    AwaitingDeleteNoticeConfirm,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::AwaitingUtcOffset => "awaiting_utc_offset",
            Stage::AwaitingDate => "awaiting_date",
            Stage::AwaitingTime => "awaiting_time",
            Stage::AwaitingName => "awaiting_name",
            Stage::AwaitingDescription => "awaiting_description",
            Stage::AwaitingEventSelection => "awaiting_event_selection",
            Stage::AwaitingNoticeDate => "awaiting_notice_date",
            Stage::AwaitingNoticeTime => "awaiting_notice_time",
            Stage::AwaitingFixDate => "awaiting_fix_date",
            Stage::AwaitingFixTime => "awaiting_fix_time",
            Stage::AwaitingFixName => "awaiting_fix_name",
            Stage::AwaitingFixDescription => "awaiting_fix_description",
            Stage::AwaitingDeleteAllConfirm => "awaiting_delete_all_confirm",
            Stage::AwaitingDeleteEventConfirm => "awaiting_delete_event_confirm",
            Stage::AwaitingNoticeNumberToDelete => "awaiting_notice_number_to_delete",
            Stage::AwaitingDeleteNoticeConfirm => "awaiting_delete_notice_confirm",
        }
    }

    pub fn parse(s: &str) -> Option<Stage> {
        match s {
            "idle" => Some(Stage::Idle),
            "awaiting_utc_offset" => Some(Stage::AwaitingUtcOffset),
            "awaiting_date" => Some(Stage::AwaitingDate),
            "awaiting_time" => Some(Stage::AwaitingTime),
            "awaiting_name" => Some(Stage::AwaitingName),
            "awaiting_description" => Some(Stage::AwaitingDescription),
            "awaiting_event_selection" => Some(Stage::AwaitingEventSelection),
            "awaiting_notice_date" => Some(Stage::AwaitingNoticeDate),
            "awaiting_notice_time" => Some(Stage::AwaitingNoticeTime),
            "awaiting_fix_date" => Some(Stage::AwaitingFixDate),
            "awaiting_fix_time" => Some(Stage::AwaitingFixTime),
            "awaiting_fix_name" => Some(Stage::AwaitingFixName),
            "awaiting_fix_description" => Some(Stage::AwaitingFixDescription),
            "awaiting_delete_all_confirm" => Some(Stage::AwaitingDeleteAllConfirm),
            "awaiting_delete_event_confirm" => Some(Stage::AwaitingDeleteEventConfirm),
            "awaiting_notice_number_to_delete" => Some(Stage::AwaitingNoticeNumberToDelete),
            "awaiting_delete_notice_confirm" => Some(Stage::AwaitingDeleteNoticeConfirm),
            _ => None,
        }
    }
}

/// The persisted per-user session row: which menu is open, what input the
/// machine waits for, and which event/notice the user currently points at.
/// Reset to idle on flow completion, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserState {
    pub user_id: UserId,
    pub window: Window,
    pub stage: Stage,
    pub event_id: Option<i64>,
    pub notice_id: Option<i64>,
}

/// Flat join row used to re-arm reminder timers after a restart.
#[derive(Debug, Clone)]
pub struct PendingReminder {
    pub notice_id: i64,
    pub event_id: i64,
    pub owner: UserId,
    pub chat_id: i64,
    pub utc_offset: i32,
    pub date: NaiveDate,
    pub time: NaiveTime,
}
