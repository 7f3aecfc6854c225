//! In-flight dialogue drafts
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.3.0
//!
//! The persistent half of a conversation lives in the `user_state` table
//! (window, stage, selections); the in-flight half lives here. A draft
//! collects the answers a multi-step flow has gathered so far and is only
//! turned into a row at the final step. Drafts are process-local on purpose:
//! after a restart the user lands back at the menu and simply starts the
//! flow again, nothing half-written ever reaches storage.

use chrono::{NaiveDate, NaiveTime};

use crate::core::models::EventPatch;

pub use crate::core::models::{Stage, UserState, Window};

/// Answers collected while creating an event.
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub name: Option<String>,
}

/// Answers collected while scheduling a notice.
#[derive(Debug, Clone, Default)]
pub struct NoticeDraft {
    pub date: Option<NaiveDate>,
}

/// Answers collected while editing an event. Every field is optional
/// because each step can be skipped with the Next button.
#[derive(Debug, Clone, Default)]
pub struct FixDraft {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl From<FixDraft> for EventPatch {
    fn from(draft: FixDraft) -> Self {
        EventPatch {
            date: draft.date,
            time: draft.time,
            name: draft.name,
            description: draft.description,
        }
    }
}

/// One in-flight draft per user. The variant doubles as a sanity check:
/// if the persisted stage says "awaiting event time" but the draft is a
/// notice draft, the flow restarts instead of mixing answers.
#[derive(Debug, Clone)]
pub enum Draft {
    Event(EventDraft),
    Notice(NoticeDraft),
    Fix(FixDraft),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_draft_converts_to_patch() {
        let draft = FixDraft {
            date: None,
            time: None,
            name: Some("renamed".to_string()),
            description: None,
        };

        let patch = EventPatch::from(draft);
        assert_eq!(patch.name.as_deref(), Some("renamed"));
        assert!(patch.date.is_none());
        assert!(!patch.is_empty());
        assert!(!patch.reschedules());
    }

    #[test]
    fn test_empty_fix_draft_is_empty_patch() {
        let patch = EventPatch::from(FixDraft::default());
        assert!(patch.is_empty());
    }
}
