//! Notice scheduling flow
//!
//! Two steps on top of the selected event: date, then time. The final step
//! inserts the notice and arms its timer in the scheduler; the timer is a
//! convenience, the row is the truth.

use anyhow::Result;
use log::info;

use crate::core::models::Stage;
use crate::core::validate;
use crate::dialogue::flows::{report_error, restart_flow, selected_event};
use crate::dialogue::handler::Turn;
use crate::dialogue::state::Draft;
use crate::scheduler::ReminderJob;
use crate::transport::Keyboard;

pub(crate) async fn date_input(turn: &Turn<'_>, text: &str) -> Result<()> {
    let Some(Draft::Notice(mut draft)) = turn.take_draft() else {
        return restart_flow(turn).await;
    };

    let Some(date) = validate::date(text, turn.today()) else {
        turn.put_draft(Draft::Notice(draft));
        return turn
            .send(
                "That doesn't look like a future date. Format: YYYY-MM-DD",
                Some(Keyboard::Cancel),
            )
            .await;
    };

    draft.date = Some(date);
    turn.put_draft(Draft::Notice(draft));
    turn.db()
        .set_stage(turn.user, Stage::AwaitingNoticeTime)
        .await?;
    turn.send(
        "⏰ Notice time? Format: HH:MM",
        Some(Keyboard::Cancel),
    )
    .await
}

pub(crate) async fn time_input(turn: &Turn<'_>, text: &str) -> Result<()> {
    let Some(Draft::Notice(draft)) = turn.take_draft() else {
        return restart_flow(turn).await;
    };
    let Some(date) = draft.date else {
        return restart_flow(turn).await;
    };
    let Some(event) = selected_event(turn).await? else {
        return Ok(());
    };

    let Some(time) = validate::time(text, date, turn.user_now()) else {
        turn.put_draft(Draft::Notice(draft));
        return turn
            .send(
                "Time must look like HH:MM and lie in the future.",
                Some(Keyboard::Cancel),
            )
            .await;
    };

    match turn.db().create_notice(event.id, date, time).await {
        Ok(notice_id) => {
            turn.scheduler().schedule(ReminderJob {
                notice_id,
                event_id: event.id,
                owner: turn.user.clone(),
                chat: turn.chat,
                user_utc_offset: turn.utc_offset(),
                date,
                time,
            });
            info!(
                "[{}] 🔔 Notice created | User: {} | Event: {} | Notice: {notice_id}",
                turn.request_id,
                turn.user.short(),
                event.id
            );
            turn.send(
                format!(
                    "🔔 Notice saved for {} at {}. I'll ping you then.",
                    date.format(validate::DATE_FORMAT),
                    time.format(validate::TIME_FORMAT)
                ),
                Some(Keyboard::EventMenu),
            )
            .await?;
        }
        Err(error) => report_error(turn, error, Keyboard::EventMenu).await?,
    }

    turn.db().set_stage(turn.user, Stage::Idle).await?;
    Ok(())
}
