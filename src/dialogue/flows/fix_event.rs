//! Event edit flow
//!
//! Walks the same four fields as creation, but every step can be skipped
//! with Next. Skipped fields never enter the patch, so an all-Next run
//! changes nothing and says so. The patch is applied in one transaction;
//! when it moves the event earlier, notices that would now fire after the
//! start are purged and their slots returned.

use anyhow::Result;
use log::info;

use crate::core::models::{EventPatch, Stage};
use crate::core::validate;
use crate::dialogue::flows::{report_error, restart_flow, selected_event};
use crate::dialogue::handler::Turn;
use crate::dialogue::state::Draft;
use crate::transport::{buttons, Keyboard};

fn is_skip(text: &str) -> bool {
    text.eq_ignore_ascii_case(buttons::NEXT)
}

pub(crate) async fn date_input(turn: &Turn<'_>, text: &str) -> Result<()> {
    let Some(Draft::Fix(mut draft)) = turn.take_draft() else {
        return restart_flow(turn).await;
    };

    if !is_skip(text) {
        let Some(date) = validate::date(text, turn.today()) else {
            turn.put_draft(Draft::Fix(draft));
            return turn
                .send(
                    "That doesn't look like a future date. Format: YYYY-MM-DD, or Next to keep it.",
                    Some(Keyboard::Fix),
                )
                .await;
        };
        draft.date = Some(date);
    }

    turn.put_draft(Draft::Fix(draft));
    turn.db()
        .set_stage(turn.user, Stage::AwaitingFixTime)
        .await?;
    turn.send(
        "New time? Format: HH:MM, or Next to keep the current one.",
        Some(Keyboard::Fix),
    )
    .await
}

pub(crate) async fn time_input(turn: &Turn<'_>, text: &str) -> Result<()> {
    let Some(Draft::Fix(mut draft)) = turn.take_draft() else {
        return restart_flow(turn).await;
    };

    if !is_skip(text) {
        let Some(event) = selected_event(turn).await? else {
            return Ok(());
        };
        // A kept date means the new time competes with the event's own day.
        let reference_date = draft.date.unwrap_or(event.date);
        let Some(time) = validate::time(text, reference_date, turn.user_now()) else {
            turn.put_draft(Draft::Fix(draft));
            return turn
                .send(
                    "Time must look like HH:MM and lie in the future, or Next to keep it.",
                    Some(Keyboard::Fix),
                )
                .await;
        };
        draft.time = Some(time);
    }

    turn.put_draft(Draft::Fix(draft));
    turn.db()
        .set_stage(turn.user, Stage::AwaitingFixName)
        .await?;
    turn.send(
        "New name? Or Next to keep the current one.",
        Some(Keyboard::Fix),
    )
    .await
}

pub(crate) async fn name_input(turn: &Turn<'_>, text: &str) -> Result<()> {
    let Some(Draft::Fix(mut draft)) = turn.take_draft() else {
        return restart_flow(turn).await;
    };

    if !is_skip(text) {
        if text.is_empty() {
            turn.put_draft(Draft::Fix(draft));
            return turn
                .send(
                    "The name can't be empty. Send a new one or Next.",
                    Some(Keyboard::Fix),
                )
                .await;
        }
        draft.name = Some(text.to_string());
    }

    turn.put_draft(Draft::Fix(draft));
    turn.db()
        .set_stage(turn.user, Stage::AwaitingFixDescription)
        .await?;
    turn.send(
        "New description? Or Next to keep the current one.",
        Some(Keyboard::Fix),
    )
    .await
}

pub(crate) async fn description_input(turn: &Turn<'_>, text: &str) -> Result<()> {
    let Some(Draft::Fix(mut draft)) = turn.take_draft() else {
        return restart_flow(turn).await;
    };
    if !is_skip(text) {
        draft.description = Some(text.to_string());
    }

    let Some(event) = selected_event(turn).await? else {
        return Ok(());
    };

    let patch: EventPatch = draft.into();
    let updated = turn
        .db()
        .update_event(turn.user, event.id, &patch, turn.user_now())
        .await;

    match updated {
        Ok(_) if patch.is_empty() => {
            turn.send("Nothing to change then.", Some(Keyboard::EventMenu))
                .await?;
        }
        Ok(purged) => {
            info!(
                "[{}] ✏ Event updated | User: {} | Event: {} | Purged notices: {purged}",
                turn.request_id,
                turn.user.short(),
                event.id
            );
            let mut text = String::from("✏ Event updated.");
            if purged > 0 {
                text.push_str(&format!(
                    " Removed {purged} notice(s) that would have fired after the new start."
                ));
            }
            turn.send(text, Some(Keyboard::EventMenu)).await?;
        }
        Err(error) => report_error(turn, error, Keyboard::EventMenu).await?,
    }

    turn.db().set_stage(turn.user, Stage::Idle).await?;
    Ok(())
}
