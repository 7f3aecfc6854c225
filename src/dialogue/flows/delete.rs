//! Deletion flows
//!
//! Three confirmations live here: wipe everything, drop the selected event,
//! drop one notice of the selected event. Deleting the row is also how a
//! timer is cancelled; an armed timer that finds no row simply stays quiet.

use anyhow::Result;
use log::info;

use crate::core::models::{Stage, Window};
use crate::core::validate;
use crate::dialogue::flows::{report_error, restart_flow, selected_event};
use crate::dialogue::handler::Turn;
use crate::transport::{buttons, Keyboard};

fn is_yes(text: &str) -> bool {
    text.eq_ignore_ascii_case(buttons::YES)
}

fn is_no(text: &str) -> bool {
    text.eq_ignore_ascii_case(buttons::NO)
}

pub(crate) async fn all_confirm(turn: &Turn<'_>, text: &str) -> Result<()> {
    if is_no(text) {
        turn.db().set_stage(turn.user, Stage::Idle).await?;
        return turn.send("Nothing deleted.", Some(Keyboard::Main)).await;
    }
    if !is_yes(text) {
        return turn
            .send("Please answer Yes or No.", Some(Keyboard::Cancel))
            .await;
    }

    match turn.db().delete_all_events(turn.user).await {
        Ok(count) => {
            info!(
                "[{}] 🗑 All events deleted | User: {} | Count: {count}",
                turn.request_id,
                turn.user.short()
            );
            turn.send(
                format!("🗑 Deleted {count} event(s) and their notices."),
                Some(Keyboard::Main),
            )
            .await?;
        }
        Err(error) => report_error(turn, error, Keyboard::Main).await?,
    }

    turn.db().set_stage(turn.user, Stage::Idle).await?;
    Ok(())
}

pub(crate) async fn event_confirm(turn: &Turn<'_>, text: &str) -> Result<()> {
    if is_no(text) {
        turn.db().set_stage(turn.user, Stage::Idle).await?;
        return turn
            .send("Nothing deleted.", Some(Keyboard::EventMenu))
            .await;
    }
    if !is_yes(text) {
        return turn
            .send("Please answer Yes or No.", Some(Keyboard::Cancel))
            .await;
    }

    let Some(event) = selected_event(turn).await? else {
        return Ok(());
    };

    match turn.db().delete_event(turn.user, event.id).await {
        Ok(()) => {
            info!(
                "[{}] 🗑 Event deleted | User: {} | Event: {}",
                turn.request_id,
                turn.user.short(),
                event.id
            );
            turn.db().set_window(turn.user, Window::Main).await?;
            turn.send(
                format!("🗑 Deleted \"{}\". Back to the main menu.", event.name),
                Some(Keyboard::Main),
            )
            .await?;
        }
        Err(error) => report_error(turn, error, Keyboard::EventMenu).await?,
    }

    turn.db().set_stage(turn.user, Stage::Idle).await?;
    Ok(())
}

pub(crate) async fn notice_number_input(turn: &Turn<'_>, text: &str) -> Result<()> {
    let Some(event) = selected_event(turn).await? else {
        return Ok(());
    };

    let notices = turn.db().list_notices(event.id).await?;
    if notices.is_empty() {
        turn.db().set_stage(turn.user, Stage::Idle).await?;
        return turn
            .send(
                "This event has no notices anymore.",
                Some(Keyboard::EventMenu),
            )
            .await;
    }

    let picked = text
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| notices.get(index));

    let Some(notice) = picked else {
        return turn
            .send(
                format!("Send a number between 1 and {}.", notices.len()),
                Some(Keyboard::Cancel),
            )
            .await;
    };

    turn.db()
        .set_selected_notice(turn.user, Some(notice.id))
        .await?;
    turn.db()
        .set_stage(turn.user, Stage::AwaitingDeleteNoticeConfirm)
        .await?;
    turn.send(
        format!(
            "Delete the notice on {} at {}? (Yes/No)",
            notice.date.format(validate::DATE_FORMAT),
            notice.time.format(validate::TIME_FORMAT)
        ),
        Some(Keyboard::Cancel),
    )
    .await
}

pub(crate) async fn notice_confirm(turn: &Turn<'_>, text: &str) -> Result<()> {
    if is_no(text) {
        turn.db().set_selected_notice(turn.user, None).await?;
        turn.db().set_stage(turn.user, Stage::Idle).await?;
        return turn
            .send("Nothing deleted.", Some(Keyboard::EventMenu))
            .await;
    }
    if !is_yes(text) {
        return turn
            .send("Please answer Yes or No.", Some(Keyboard::Cancel))
            .await;
    }

    let Some(notice_id) = turn.state.notice_id else {
        return restart_flow(turn).await;
    };

    match turn.db().delete_notice(notice_id).await {
        Ok(()) => {
            info!(
                "[{}] 🗑 Notice deleted | User: {} | Notice: {notice_id}",
                turn.request_id,
                turn.user.short()
            );
            turn.send(
                "🗑 Notice deleted, its timer won't fire.",
                Some(Keyboard::EventMenu),
            )
            .await?;
        }
        Err(error) => report_error(turn, error, Keyboard::EventMenu).await?,
    }

    turn.db().set_stage(turn.user, Stage::Idle).await?;
    Ok(())
}
