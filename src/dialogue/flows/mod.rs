//! Conversation flows
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.3.0
//!
//! One module per flow, one function per stage. Every function receives the
//! current [`Turn`](crate::dialogue::handler::Turn) and the trimmed message
//! text, talks to storage through it and replies through it. Flows never
//! touch the per-user lock or the draft map directly; the handler owns both.

pub(crate) mod add_event;
pub(crate) mod add_notice;
pub(crate) mod delete;
pub(crate) mod fix_event;
pub(crate) mod menu;
pub(crate) mod select_event;
pub(crate) mod timezone;

use anyhow::Result;
use log::error;

use crate::core::error::{DomainError, QuotaKind};
use crate::core::models::{Event, Stage, Window};
use crate::dialogue::handler::Turn;
use crate::transport::Keyboard;

/// User-facing wording for every domain error. Storage failures get a
/// generic apology; the details go to the log, not the chat.
pub(crate) fn describe_error(error: &DomainError) -> String {
    match error {
        DomainError::EventTimeInPast => {
            "That moment has already passed. Nothing was saved.".to_string()
        }
        DomainError::QuotaExhausted(QuotaKind::Event) => {
            "You have no event slots left. Delete an event to free one.".to_string()
        }
        DomainError::QuotaExhausted(QuotaKind::Notice) => {
            "This event has no notice slots left. Delete a notice to free one.".to_string()
        }
        DomainError::EventNotFound => "That event no longer exists.".to_string(),
        DomainError::NoticeNotFound => "That notice no longer exists.".to_string(),
        DomainError::UserNotFound => {
            "I don't know you yet. Send any message to start over.".to_string()
        }
        DomainError::InvalidFixTime => {
            "The updated date and time must stay in the future. Nothing was changed.".to_string()
        }
        DomainError::NoticeAfterEvent => {
            "A notice can't fire after the event starts. Nothing was saved.".to_string()
        }
        DomainError::NothingToDelete => "You have no events to delete.".to_string(),
        DomainError::Storage(_) => {
            "Storage is temporarily unavailable, please try again in a moment.".to_string()
        }
    }
}

/// Reports a failed terminal step to the user and, for non-user errors,
/// to the log.
pub(crate) async fn report_error(
    turn: &Turn<'_>,
    error: DomainError,
    keyboard: Keyboard,
) -> Result<()> {
    if !error.is_user_error() {
        error!("[{}] 💥 Flow step failed: {error}", turn.request_id);
    }
    turn.send(describe_error(&error), Some(keyboard)).await
}

/// Escape hatch for a stage whose draft went missing (restart, eviction).
/// Drops whatever was collected and puts the user back at the menu.
pub(crate) async fn restart_flow(turn: &Turn<'_>) -> Result<()> {
    turn.clear_draft();
    turn.db().set_stage(turn.user, Stage::Idle).await?;
    turn.send(
        "Something went out of sync, let's start over from the menu.",
        Some(turn.menu_keyboard()),
    )
    .await
}

/// Loads the event the session points at. When the selection is stale
/// (event deleted from another flow) the user is sent back to the main
/// window and `Ok(None)` is returned; the caller just stops.
pub(crate) async fn selected_event(turn: &Turn<'_>) -> Result<Option<Event>> {
    let event = match turn.state.event_id {
        Some(event_id) => turn.db().get_event(turn.user, event_id).await?,
        None => None,
    };
    if event.is_some() {
        return Ok(event);
    }

    turn.clear_draft();
    turn.db().set_selected_event(turn.user, None).await?;
    turn.db().set_window(turn.user, Window::Main).await?;
    turn.db().set_stage(turn.user, Stage::Idle).await?;
    turn.send(
        "That event is gone. Back to the main menu.",
        Some(Keyboard::Main),
    )
    .await?;
    Ok(None)
}
