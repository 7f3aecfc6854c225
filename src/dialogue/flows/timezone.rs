//! Timezone capture
//!
//! The very first thing asked of a new user, and the one flow that cannot
//! be cancelled: without an offset no reminder can be timed, so every
//! message short of a valid offset re-prompts.

use anyhow::Result;
use log::info;

use crate::core::models::Stage;
use crate::core::validate;
use crate::dialogue::handler::Turn;
use crate::transport::Keyboard;

const WELCOME: &str = "👋 Hi! I remind you about your events.\n\
    First, tell me your UTC offset so reminders arrive on your clock.\n\
    Format: +3 or -5";

pub(crate) async fn offset_input(turn: &Turn<'_>, text: &str) -> Result<()> {
    let Some(hours) = validate::utc_offset(text) else {
        return turn.send(WELCOME, None).await;
    };

    turn.db().set_utc_offset(turn.user, hours).await?;
    turn.db().set_stage(turn.user, Stage::Idle).await?;
    info!(
        "[{}] 🌍 Timezone saved | User: {} | Offset: UTC{hours:+}",
        turn.request_id,
        turn.user.short()
    );
    turn.send(
        format!("🌍 Timezone saved: UTC{hours:+}. Here's the menu."),
        Some(Keyboard::Main),
    )
    .await
}
