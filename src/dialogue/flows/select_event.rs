//! Event selection flow
//!
//! The list shown by Choose is numbered from 1 in creation order; the reply
//! is matched against that same ordering, so the number the user sees is
//! the number that works.

use anyhow::Result;
use log::info;

use crate::core::models::{Stage, Window};
use crate::core::render;
use crate::dialogue::handler::Turn;
use crate::transport::Keyboard;

pub(crate) async fn selection_input(turn: &Turn<'_>, text: &str) -> Result<()> {
    let events = turn.db().list_events(turn.user).await?;
    if events.is_empty() {
        turn.db().set_stage(turn.user, Stage::Idle).await?;
        return turn
            .send(
                "You have no events anymore. Back to the main menu.",
                Some(Keyboard::Main),
            )
            .await;
    }

    let picked = text
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| events.get(index));

    let Some(event) = picked else {
        return turn
            .send(
                format!("Send a number between 1 and {}.", events.len()),
                Some(Keyboard::Cancel),
            )
            .await;
    };

    turn.db()
        .set_selected_event(turn.user, Some(event.id))
        .await?;
    turn.db()
        .set_window(turn.user, Window::EventDetail)
        .await?;
    turn.db().set_stage(turn.user, Stage::Idle).await?;
    info!(
        "[{}] 📌 Event opened | User: {} | Event: {}",
        turn.request_id,
        turn.user.short(),
        event.id
    );
    turn.send(render::event_block(event), Some(Keyboard::EventMenu))
        .await
}
