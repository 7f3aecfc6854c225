//! Dialogue handler
//!
//! - **Version**: 1.3.1
//! - **Since**: 0.3.0
//!
//! The single entry point for inbound messages. For each message it pins
//! the sender's per-user lock, loads the persisted conversation state and
//! routes the text to the flow the stage names. Holding the lock for the
//! whole turn means a user talking from two devices at once still sees one
//! coherent conversation; different users never contend. Lock entries live
//! only while a turn runs or waits, so the map tracks users mid-message,
//! not everyone ever seen.
//!
//! ## Changelog
//! - 1.3.1: idle per-user lock entries are evicted at end of turn
//! - 1.3.0: per-user draft map moved behind the handler, flows go through `Turn`
//! - 1.2.0: timezone capture gates all dispatch until an offset is stored
//! - 1.0.0: initial stage router

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use dashmap::DashMap;
use log::{debug, info};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::config::Config;
use crate::core::models::{Stage, UserId, UserProfile, UserState, Window};
use crate::core::render;
use crate::database::Database;
use crate::dialogue::context::BotContext;
use crate::dialogue::flows;
use crate::dialogue::state::Draft;
use crate::scheduler::ReminderScheduler;
use crate::transport::{buttons, ChatId, Incoming, Keyboard, Outgoing};

const LOG_PREVIEW_CHARS: usize = 80;

/// Routes every inbound message through the per-user state machine.
#[derive(Clone)]
pub struct DialogueHandler {
    ctx: BotContext,
    user_locks: Arc<DashMap<UserId, Arc<Mutex<()>>>>,
    drafts: Arc<DashMap<UserId, Draft>>,
}

impl DialogueHandler {
    pub fn new(ctx: BotContext) -> Self {
        DialogueHandler {
            ctx,
            user_locks: Arc::new(DashMap::new()),
            drafts: Arc::new(DashMap::new()),
        }
    }

    /// Handles one inbound message end to end: register the user if needed,
    /// capture the timezone if still missing, otherwise dispatch on the
    /// persisted stage.
    pub async fn handle_message(&self, incoming: Incoming) -> Result<()> {
        let request_id = Uuid::new_v4();
        let user = UserId::from_raw(&incoming.user_ref);
        let text = incoming.text.trim().to_string();

        info!(
            "[{}] 📥 Message received | User: {} | Chat: {} | Text: '{}'",
            request_id,
            user.short(),
            incoming.chat,
            preview(&text)
        );

        let lock = self
            .user_locks
            .entry(user.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let turn_guard = lock.lock().await;
        let outcome = self.run_turn(request_id, &user, incoming.chat, &text).await;

        // Evict the lock once no other turn holds it; two counts are the
        // map's copy and ours, a waiter's clone makes a third and keeps
        // the entry. The guard is gone first so an entry never vanishes
        // out from under a running turn.
        drop(turn_guard);
        self.user_locks
            .remove_if(&user, |_, entry| Arc::strong_count(entry) == 2);

        outcome?;
        debug!("[{request_id}] ✅ Message processing completed");
        Ok(())
    }

    async fn run_turn(
        &self,
        request_id: Uuid,
        user: &UserId,
        chat: ChatId,
        text: &str,
    ) -> Result<()> {
        let (profile, state) = self
            .ctx
            .database
            .ensure_user(user, chat.0, self.ctx.config.event_quota)
            .await?;

        let turn = Turn {
            handler: self,
            user,
            chat,
            profile: &profile,
            state: &state,
            request_id,
        };

        // Until an offset is stored nothing else can be timed correctly,
        // so every message is treated as an offset attempt.
        if profile.utc_offset.is_none() {
            if state.stage != Stage::AwaitingUtcOffset {
                self.ctx
                    .database
                    .set_stage(user, Stage::AwaitingUtcOffset)
                    .await?;
            }
            flows::timezone::offset_input(&turn, text).await?;
        } else {
            self.dispatch(&turn, text).await?;
        }
        Ok(())
    }

    async fn dispatch(&self, turn: &Turn<'_>, text: &str) -> Result<()> {
        debug!(
            "[{}] 🧭 Dispatch | Window: {} | Stage: {}",
            turn.request_id,
            turn.state.window.as_str(),
            turn.state.stage.as_str()
        );

        // Cancel and Back bail out of any flow; at the menu they are
        // ordinary commands and fall through to the dispatch below.
        if turn.state.stage != Stage::Idle
            && (text.eq_ignore_ascii_case(buttons::CANCEL)
                || text.eq_ignore_ascii_case(buttons::BACK))
        {
            return self.cancel_flow(turn).await;
        }

        match turn.state.stage {
            Stage::Idle => flows::menu::command(turn, text).await,
            Stage::AwaitingUtcOffset => flows::timezone::offset_input(turn, text).await,
            Stage::AwaitingDate => flows::add_event::date_input(turn, text).await,
            Stage::AwaitingTime => flows::add_event::time_input(turn, text).await,
            Stage::AwaitingName => flows::add_event::name_input(turn, text).await,
            Stage::AwaitingDescription => flows::add_event::description_input(turn, text).await,
            Stage::AwaitingEventSelection => flows::select_event::selection_input(turn, text).await,
            Stage::AwaitingNoticeDate => flows::add_notice::date_input(turn, text).await,
            Stage::AwaitingNoticeTime => flows::add_notice::time_input(turn, text).await,
            Stage::AwaitingFixDate => flows::fix_event::date_input(turn, text).await,
            Stage::AwaitingFixTime => flows::fix_event::time_input(turn, text).await,
            Stage::AwaitingFixName => flows::fix_event::name_input(turn, text).await,
            Stage::AwaitingFixDescription => flows::fix_event::description_input(turn, text).await,
            Stage::AwaitingDeleteAllConfirm => flows::delete::all_confirm(turn, text).await,
            Stage::AwaitingDeleteEventConfirm => flows::delete::event_confirm(turn, text).await,
            Stage::AwaitingNoticeNumberToDelete => {
                flows::delete::notice_number_input(turn, text).await
            }
            Stage::AwaitingDeleteNoticeConfirm => flows::delete::notice_confirm(turn, text).await,
        }
    }

    async fn cancel_flow(&self, turn: &Turn<'_>) -> Result<()> {
        info!(
            "[{}] ↩ Flow cancelled | User: {} | Stage: {}",
            turn.request_id,
            turn.user.short(),
            turn.state.stage.as_str()
        );
        self.drafts.remove(turn.user);
        self.ctx.database.set_stage(turn.user, Stage::Idle).await?;
        turn.send("Cancelled.", Some(turn.menu_keyboard())).await
    }

    async fn send_chunked(
        &self,
        chat: ChatId,
        text: String,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        let chunks = render::chunk_for_message(&text);
        let last = chunks.len().saturating_sub(1);
        for (index, chunk) in chunks.into_iter().enumerate() {
            let keyboard = if index == last { keyboard } else { None };
            self.ctx
                .port
                .send(Outgoing {
                    chat,
                    text: chunk,
                    keyboard,
                })
                .await?;
        }
        Ok(())
    }
}

fn preview(text: &str) -> String {
    let mut short: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    if short.len() < text.len() {
        short.push('…');
    }
    short
}

/// One message's worth of context, lent to the flow functions. Carries the
/// sender, the state loaded at the start of the turn and accessors for the
/// shared services, so flow code never touches the handler internals.
pub(crate) struct Turn<'a> {
    handler: &'a DialogueHandler,
    pub user: &'a UserId,
    pub chat: ChatId,
    pub profile: &'a UserProfile,
    pub state: &'a UserState,
    pub request_id: Uuid,
}

impl Turn<'_> {
    pub fn db(&self) -> &Database {
        &self.handler.ctx.database
    }

    pub fn config(&self) -> &Config {
        &self.handler.ctx.config
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.handler.ctx.scheduler
    }

    /// The sender's offset. Flows only run after the timezone gate, so the
    /// fallback exists for the type, not for a real path.
    pub fn utc_offset(&self) -> i32 {
        self.profile.utc_offset.unwrap_or(0)
    }

    /// Wall-clock "now" on the sender's clock.
    pub fn user_now(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::hours(i64::from(self.utc_offset()))
    }

    pub fn today(&self) -> NaiveDate {
        self.user_now().date()
    }

    pub fn menu_keyboard(&self) -> Keyboard {
        match self.state.window {
            Window::Main => Keyboard::Main,
            Window::EventDetail => Keyboard::EventMenu,
        }
    }

    pub fn take_draft(&self) -> Option<Draft> {
        self.handler
            .drafts
            .remove(self.user)
            .map(|(_, draft)| draft)
    }

    pub fn put_draft(&self, draft: Draft) {
        self.handler.drafts.insert(self.user.clone(), draft);
    }

    pub fn clear_draft(&self) {
        self.handler.drafts.remove(self.user);
    }

    pub async fn send(&self, text: impl Into<String>, keyboard: Option<Keyboard>) -> Result<()> {
        self.handler
            .send_chunked(self.chat, text.into(), keyboard)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryPort;

    struct Harness {
        handler: DialogueHandler,
        port: Arc<MemoryPort>,
        database: Database,
    }

    async fn harness() -> Harness {
        let database = Database::open_in_memory().await.unwrap();
        let port = Arc::new(MemoryPort::new());
        let config = Config {
            database_path: ":memory:".to_string(),
            log_level: "debug".to_string(),
            service_utc_offset: 0,
            event_quota: 10,
            notice_quota: 10,
        };
        let scheduler = ReminderScheduler::new(database.clone(), port.clone(), 0);
        let handler = DialogueHandler::new(BotContext::new(
            database.clone(),
            port.clone(),
            scheduler,
            config,
        ));
        Harness {
            handler,
            port,
            database,
        }
    }

    impl Harness {
        async fn say(&self, text: &str) {
            self.handler
                .handle_message(Incoming {
                    user_ref: "7001".to_string(),
                    chat: ChatId(1),
                    text: text.to_string(),
                })
                .await
                .unwrap();
        }

        fn user(&self) -> UserId {
            UserId::from_raw("7001")
        }

        async fn stage(&self) -> Stage {
            self.session().await.stage
        }

        async fn window(&self) -> Window {
            self.session().await.window
        }

        async fn session(&self) -> UserState {
            self.database
                .get_session(&self.user())
                .await
                .unwrap()
                .unwrap()
        }

        fn last(&self) -> String {
            self.port.last_text().unwrap_or_default()
        }

        /// Registers and stores a UTC+0 offset so tests start at the menu.
        async fn onboard(&self) {
            self.say("hello").await;
            self.say("+0").await;
        }

        /// Drives the whole add-event flow with far-future values.
        async fn create_event(&self, name: &str) {
            self.say(buttons::ADD).await;
            self.say("2126-06-10").await;
            self.say("18:00").await;
            self.say(name).await;
            self.say("flow test event").await;
        }
    }

    #[tokio::test]
    async fn test_first_contact_demands_utc_offset() {
        let h = harness().await;

        h.say("hello").await;
        assert_eq!(h.stage().await, Stage::AwaitingUtcOffset);
        assert!(h.last().contains("UTC offset"));

        // Menu commands stay locked out until the offset lands.
        h.say(buttons::GET).await;
        assert_eq!(h.stage().await, Stage::AwaitingUtcOffset);

        h.say("+3").await;
        assert_eq!(h.stage().await, Stage::Idle);
        let profile = h.database.get_profile(&h.user()).await.unwrap().unwrap();
        assert_eq!(profile.utc_offset, Some(3));
    }

    #[tokio::test]
    async fn test_add_event_flow_ends_idle_with_one_event() {
        let h = harness().await;
        h.onboard().await;

        h.create_event("standup").await;

        assert_eq!(h.stage().await, Stage::Idle);
        let events = h.database.list_events(&h.user()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "standup");
        assert_eq!(events[0].description, "flow test event");

        let profile = h.database.get_profile(&h.user()).await.unwrap().unwrap();
        assert_eq!(profile.event_quota, 9);
        assert!(h.last().contains("Saved"));
    }

    #[tokio::test]
    async fn test_invalid_date_reprompts_without_advancing() {
        let h = harness().await;
        h.onboard().await;

        h.say(buttons::ADD).await;
        h.say("not a date").await;
        assert_eq!(h.stage().await, Stage::AwaitingDate);

        h.say("2126-06-10").await;
        assert_eq!(h.stage().await, Stage::AwaitingTime);
    }

    #[tokio::test]
    async fn test_cancel_mid_flow_discards_draft() {
        let h = harness().await;
        h.onboard().await;

        h.say(buttons::ADD).await;
        h.say("2126-06-10").await;
        assert_eq!(h.stage().await, Stage::AwaitingTime);

        h.say(buttons::CANCEL).await;
        assert_eq!(h.stage().await, Stage::Idle);
        assert!(h.database.list_events(&h.user()).await.unwrap().is_empty());

        // A fresh flow starts from a clean draft, not the abandoned one.
        h.create_event("second try").await;
        let events = h.database.list_events(&h.user()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "second try");
    }

    #[tokio::test]
    async fn test_select_event_switches_window() {
        let h = harness().await;
        h.onboard().await;
        h.create_event("launch").await;

        h.say(buttons::CHOOSE).await;
        assert_eq!(h.stage().await, Stage::AwaitingEventSelection);

        h.say("1").await;
        assert_eq!(h.window().await, Window::EventDetail);
        assert_eq!(h.stage().await, Stage::Idle);
        assert!(h.last().contains("launch"));

        let session = h.session().await;
        assert!(session.event_id.is_some());
    }

    #[tokio::test]
    async fn test_out_of_range_selection_reprompts() {
        let h = harness().await;
        h.onboard().await;
        h.create_event("only one").await;

        h.say(buttons::CHOOSE).await;
        h.say("5").await;
        assert_eq!(h.stage().await, Stage::AwaitingEventSelection);
        assert!(h.last().contains("between 1 and 1"));
    }

    #[tokio::test]
    async fn test_notice_flow_creates_row_and_stays_in_event_window() {
        let h = harness().await;
        h.onboard().await;
        h.create_event("launch").await;
        h.say(buttons::CHOOSE).await;
        h.say("1").await;

        h.say(buttons::ADD).await;
        assert_eq!(h.stage().await, Stage::AwaitingNoticeDate);
        h.say("2126-06-09").await;
        h.say("09:00").await;

        assert_eq!(h.stage().await, Stage::Idle);
        assert_eq!(h.window().await, Window::EventDetail);

        let events = h.database.list_events(&h.user()).await.unwrap();
        let notices = h.database.list_notices(events[0].id).await.unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(events[0].notice_quota, 9);
    }

    #[tokio::test]
    async fn test_fix_flow_next_skips_everything_but_name() {
        let h = harness().await;
        h.onboard().await;
        h.create_event("draft name").await;
        h.say(buttons::CHOOSE).await;
        h.say("1").await;

        h.say(buttons::FIX).await;
        assert_eq!(h.stage().await, Stage::AwaitingFixDate);
        h.say(buttons::NEXT).await;
        h.say(buttons::NEXT).await;
        h.say("final name").await;
        h.say(buttons::NEXT).await;

        assert_eq!(h.stage().await, Stage::Idle);
        let events = h.database.list_events(&h.user()).await.unwrap();
        assert_eq!(events[0].name, "final name");
        assert_eq!(events[0].description, "flow test event");
        assert_eq!(
            events[0].date,
            NaiveDate::from_ymd_opt(2126, 6, 10).unwrap()
        );
    }

    #[tokio::test]
    async fn test_fix_flow_all_next_changes_nothing() {
        let h = harness().await;
        h.onboard().await;
        h.create_event("untouched").await;
        h.say(buttons::CHOOSE).await;
        h.say("1").await;

        h.say(buttons::FIX).await;
        h.say(buttons::NEXT).await;
        h.say(buttons::NEXT).await;
        h.say(buttons::NEXT).await;
        h.say(buttons::NEXT).await;

        assert_eq!(h.stage().await, Stage::Idle);
        assert!(h.last().contains("Nothing to change"));
        let events = h.database.list_events(&h.user()).await.unwrap();
        assert_eq!(events[0].name, "untouched");
    }

    #[tokio::test]
    async fn test_delete_all_requires_confirmation() {
        let h = harness().await;
        h.onboard().await;
        h.create_event("doomed").await;

        h.say(buttons::DELETE).await;
        assert_eq!(h.stage().await, Stage::AwaitingDeleteAllConfirm);

        h.say(buttons::NO).await;
        assert_eq!(h.stage().await, Stage::Idle);
        assert_eq!(h.database.list_events(&h.user()).await.unwrap().len(), 1);

        h.say(buttons::DELETE).await;
        h.say(buttons::YES).await;
        assert!(h.database.list_events(&h.user()).await.unwrap().is_empty());
        assert!(h.last().contains("Deleted 1 event(s)"));
    }

    #[tokio::test]
    async fn test_delete_all_with_nothing_reports_it() {
        let h = harness().await;
        h.onboard().await;

        h.say(buttons::DELETE).await;
        h.say(buttons::YES).await;
        assert_eq!(h.stage().await, Stage::Idle);
        assert!(h.last().contains("no events"));
    }

    #[tokio::test]
    async fn test_delete_selected_event_returns_to_main_window() {
        let h = harness().await;
        h.onboard().await;
        h.create_event("short lived").await;
        h.say(buttons::CHOOSE).await;
        h.say("1").await;

        h.say(buttons::DELETE_EVENT).await;
        assert_eq!(h.stage().await, Stage::AwaitingDeleteEventConfirm);
        h.say(buttons::YES).await;

        assert_eq!(h.window().await, Window::Main);
        assert_eq!(h.stage().await, Stage::Idle);
        assert!(h.database.list_events(&h.user()).await.unwrap().is_empty());

        let profile = h.database.get_profile(&h.user()).await.unwrap().unwrap();
        assert_eq!(profile.event_quota, 10);
    }

    #[tokio::test]
    async fn test_delete_notice_by_number() {
        let h = harness().await;
        h.onboard().await;
        h.create_event("with notice").await;
        h.say(buttons::CHOOSE).await;
        h.say("1").await;
        h.say(buttons::ADD).await;
        h.say("2126-06-09").await;
        h.say("09:00").await;

        h.say(buttons::DELETE_NOTICE).await;
        assert_eq!(h.stage().await, Stage::AwaitingNoticeNumberToDelete);
        h.say("1").await;
        assert_eq!(h.stage().await, Stage::AwaitingDeleteNoticeConfirm);
        h.say(buttons::YES).await;

        assert_eq!(h.stage().await, Stage::Idle);
        let events = h.database.list_events(&h.user()).await.unwrap();
        assert!(h.database.list_notices(events[0].id).await.unwrap().is_empty());
        assert_eq!(events[0].notice_quota, 10);
    }

    #[tokio::test]
    async fn test_back_leaves_event_window() {
        let h = harness().await;
        h.onboard().await;
        h.create_event("parked").await;
        h.say(buttons::CHOOSE).await;
        h.say("1").await;
        assert_eq!(h.window().await, Window::EventDetail);

        h.say(buttons::BACK).await;
        assert_eq!(h.window().await, Window::Main);
        assert!(h.last().contains("Main menu"));
    }

    #[tokio::test]
    async fn test_unknown_command_at_menu_is_reported() {
        let h = harness().await;
        h.onboard().await;

        h.say("abracadabra").await;
        assert_eq!(h.stage().await, Stage::Idle);
        assert!(h.last().contains("don't know that command"));
    }

    #[tokio::test]
    async fn test_info_names_the_quotas() {
        let h = harness().await;
        h.onboard().await;

        h.say(buttons::INFO).await;
        let text = h.last();
        assert!(text.contains("10 events"));
        assert!(text.contains("10 notices"));
    }

    #[tokio::test]
    async fn test_user_lock_map_does_not_retain_idle_users() {
        let h = harness().await;
        h.onboard().await;
        assert!(h.handler.user_locks.is_empty());

        // A burst of same-user turns leaves nothing behind once all join.
        let mut turns = Vec::new();
        for _ in 0..5 {
            let handler = h.handler.clone();
            turns.push(tokio::spawn(async move {
                handler
                    .handle_message(Incoming {
                        user_ref: "7001".to_string(),
                        chat: ChatId(1),
                        text: buttons::INFO.to_string(),
                    })
                    .await
                    .unwrap();
            }));
        }
        for turn in turns {
            turn.await.unwrap();
        }
        assert!(h.handler.user_locks.is_empty());
        assert_eq!(h.stage().await, Stage::Idle);
    }
}
