//! Menu command dispatch
//!
//! Runs only while the stage is idle. Which table a button hits depends on
//! the window: the main menu works on the whole event list, the event menu
//! on the currently selected event.

use anyhow::Result;

use crate::core::models::{Event, Stage, Window};
use crate::core::render;
use crate::dialogue::flows::selected_event;
use crate::dialogue::handler::Turn;
use crate::dialogue::state::{Draft, EventDraft, FixDraft, NoticeDraft};
use crate::transport::{buttons, Keyboard};

pub(crate) async fn command(turn: &Turn<'_>, text: &str) -> Result<()> {
    match turn.state.window {
        Window::Main => main_command(turn, text).await,
        Window::EventDetail => event_command(turn, text).await,
    }
}

async fn main_command(turn: &Turn<'_>, text: &str) -> Result<()> {
    match text {
        buttons::GET => list_events(turn).await,
        buttons::ADD => start_add_event(turn).await,
        buttons::INFO => turn.send(info_text(turn), Some(Keyboard::Main)).await,
        buttons::CHOOSE => start_selection(turn).await,
        buttons::DELETE => start_delete_all(turn).await,
        _ => {
            turn.send(
                "I don't know that command. Pick one from the menu.",
                Some(Keyboard::Main),
            )
            .await
        }
    }
}

async fn event_command(turn: &Turn<'_>, text: &str) -> Result<()> {
    if text == buttons::BACK {
        turn.db().set_window(turn.user, Window::Main).await?;
        return turn.send("Main menu.", Some(Keyboard::Main)).await;
    }

    let Some(event) = selected_event(turn).await? else {
        return Ok(());
    };

    match text {
        buttons::GET => {
            let notices = turn.db().list_notices(event.id).await?;
            let mut text = render::event_block(&event);
            text.push_str("\n\n");
            if notices.is_empty() {
                text.push_str("No notices yet. Send Add to schedule one.");
            } else {
                text.push_str(&render::notice_list(&event, &notices));
            }
            turn.send(text, Some(Keyboard::EventMenu)).await
        }
        buttons::FIX => {
            turn.put_draft(Draft::Fix(FixDraft::default()));
            turn.db()
                .set_stage(turn.user, Stage::AwaitingFixDate)
                .await?;
            turn.send(
                "New date? Format: YYYY-MM-DD. Send Next to keep the current one.",
                Some(Keyboard::Fix),
            )
            .await
        }
        buttons::INFO => turn.send(info_text(turn), Some(Keyboard::EventMenu)).await,
        buttons::ADD => {
            turn.put_draft(Draft::Notice(NoticeDraft::default()));
            turn.db()
                .set_stage(turn.user, Stage::AwaitingNoticeDate)
                .await?;
            turn.send(
                "🔔 Notice date? Format: YYYY-MM-DD",
                Some(Keyboard::Cancel),
            )
            .await
        }
        buttons::DELETE_EVENT => {
            turn.db()
                .set_stage(turn.user, Stage::AwaitingDeleteEventConfirm)
                .await?;
            turn.send(
                format!(
                    "Delete \"{}\" and all its notices? (Yes/No)",
                    event.name
                ),
                Some(Keyboard::Cancel),
            )
            .await
        }
        buttons::DELETE_NOTICE => start_delete_notice(turn, &event).await,
        _ => {
            turn.send(
                "I don't know that command. Pick one from the menu.",
                Some(Keyboard::EventMenu),
            )
            .await
        }
    }
}

async fn list_events(turn: &Turn<'_>) -> Result<()> {
    let events = turn.db().list_events(turn.user).await?;
    if events.is_empty() {
        return turn
            .send(
                "You have no events yet. Send Add to create one.",
                Some(Keyboard::Main),
            )
            .await;
    }
    turn.send(render::event_list(&events), Some(Keyboard::Main))
        .await
}

async fn start_add_event(turn: &Turn<'_>) -> Result<()> {
    turn.put_draft(Draft::Event(EventDraft::default()));
    turn.db().set_stage(turn.user, Stage::AwaitingDate).await?;
    turn.send(
        "📅 Event date? Format: YYYY-MM-DD",
        Some(Keyboard::Cancel),
    )
    .await
}

async fn start_selection(turn: &Turn<'_>) -> Result<()> {
    let events = turn.db().list_events(turn.user).await?;
    if events.is_empty() {
        return turn
            .send(
                "You have no events yet. Send Add to create one.",
                Some(Keyboard::Main),
            )
            .await;
    }
    turn.db()
        .set_stage(turn.user, Stage::AwaitingEventSelection)
        .await?;
    let mut text = String::from("Send the number of the event to open:\n\n");
    text.push_str(&render::event_list(&events));
    turn.send(text, Some(Keyboard::Cancel)).await
}

async fn start_delete_all(turn: &Turn<'_>) -> Result<()> {
    turn.db()
        .set_stage(turn.user, Stage::AwaitingDeleteAllConfirm)
        .await?;
    turn.send(
        "Delete ALL your events and their notices? (Yes/No)",
        Some(Keyboard::Cancel),
    )
    .await
}

async fn start_delete_notice(turn: &Turn<'_>, event: &Event) -> Result<()> {
    let notices = turn.db().list_notices(event.id).await?;
    if notices.is_empty() {
        return turn
            .send(
                "This event has no notices to delete.",
                Some(Keyboard::EventMenu),
            )
            .await;
    }
    turn.db()
        .set_stage(turn.user, Stage::AwaitingNoticeNumberToDelete)
        .await?;
    let mut text = render::notice_list(event, &notices);
    text.push_str("\n\nSend the number of the notice to delete.");
    turn.send(text, Some(Keyboard::Cancel)).await
}

fn info_text(turn: &Turn<'_>) -> String {
    format!(
        "ℹ I keep your events and ping you before they start.\n\
         You can hold up to {} events, each with up to {} notices.\n\
         All dates and times are in your own timezone (UTC{:+}).",
        turn.config().event_quota,
        turn.config().notice_quota,
        turn.utc_offset(),
    )
}
