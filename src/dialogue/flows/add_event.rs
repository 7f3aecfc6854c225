//! Event creation flow
//!
//! Date, time, name, description, in that order. Nothing is written until
//! the description lands; the final step reserves a quota slot and inserts
//! the row in one transaction, so a crash mid-flow leaves no trace.

use anyhow::Result;
use log::info;

use crate::core::models::Stage;
use crate::core::validate;
use crate::dialogue::flows::{report_error, restart_flow};
use crate::dialogue::handler::Turn;
use crate::dialogue::state::Draft;
use crate::transport::Keyboard;

pub(crate) async fn date_input(turn: &Turn<'_>, text: &str) -> Result<()> {
    let Some(Draft::Event(mut draft)) = turn.take_draft() else {
        return restart_flow(turn).await;
    };

    let Some(date) = validate::date(text, turn.today()) else {
        turn.put_draft(Draft::Event(draft));
        return turn
            .send(
                "That doesn't look like a future date. Format: YYYY-MM-DD",
                Some(Keyboard::Cancel),
            )
            .await;
    };

    draft.date = Some(date);
    turn.put_draft(Draft::Event(draft));
    turn.db().set_stage(turn.user, Stage::AwaitingTime).await?;
    turn.send(
        "⏰ Event time? Format: HH:MM",
        Some(Keyboard::Cancel),
    )
    .await
}

pub(crate) async fn time_input(turn: &Turn<'_>, text: &str) -> Result<()> {
    let Some(Draft::Event(mut draft)) = turn.take_draft() else {
        return restart_flow(turn).await;
    };
    let Some(date) = draft.date else {
        return restart_flow(turn).await;
    };

    let Some(time) = validate::time(text, date, turn.user_now()) else {
        turn.put_draft(Draft::Event(draft));
        return turn
            .send(
                "Time must look like HH:MM and lie in the future.",
                Some(Keyboard::Cancel),
            )
            .await;
    };

    draft.time = Some(time);
    turn.put_draft(Draft::Event(draft));
    turn.db().set_stage(turn.user, Stage::AwaitingName).await?;
    turn.send("📝 Event name?", Some(Keyboard::Cancel)).await
}

pub(crate) async fn name_input(turn: &Turn<'_>, text: &str) -> Result<()> {
    let Some(Draft::Event(mut draft)) = turn.take_draft() else {
        return restart_flow(turn).await;
    };

    if text.is_empty() {
        turn.put_draft(Draft::Event(draft));
        return turn
            .send("The name can't be empty.", Some(Keyboard::Cancel))
            .await;
    }

    draft.name = Some(text.to_string());
    turn.put_draft(Draft::Event(draft));
    turn.db()
        .set_stage(turn.user, Stage::AwaitingDescription)
        .await?;
    turn.send(
        "🗒 Description? Any text works.",
        Some(Keyboard::Cancel),
    )
    .await
}

pub(crate) async fn description_input(turn: &Turn<'_>, text: &str) -> Result<()> {
    let Some(Draft::Event(draft)) = turn.take_draft() else {
        return restart_flow(turn).await;
    };
    let (Some(date), Some(time), Some(name)) = (draft.date, draft.time, draft.name) else {
        return restart_flow(turn).await;
    };

    let created = turn
        .db()
        .create_event(
            turn.user,
            date,
            time,
            &name,
            text,
            turn.config().notice_quota,
            turn.user_now(),
        )
        .await;

    match created {
        Ok(event_id) => {
            info!(
                "[{}] ✅ Event created | User: {} | Event: {event_id}",
                turn.request_id,
                turn.user.short()
            );
            turn.send(
                format!(
                    "✅ Saved \"{name}\" on {} at {}.",
                    date.format(validate::DATE_FORMAT),
                    time.format(validate::TIME_FORMAT)
                ),
                Some(Keyboard::Main),
            )
            .await?;
        }
        Err(error) => report_error(turn, error, Keyboard::Main).await?,
    }

    turn.db().set_stage(turn.user, Stage::Idle).await?;
    Ok(())
}
