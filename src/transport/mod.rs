//! # Transport Module
//!
//! The boundary between the dialogue core and whatever chat network carries
//! the messages.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! The core never builds UI payloads. Outbound messages carry an optional
//! [`Keyboard`] tag; the adapter decides how (and whether) to render the
//! button rows of [`Keyboard::layout`] for its network.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// Delivery address on the chat network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One inbound chat message, as handed to the dialogue handler.
#[derive(Debug, Clone)]
pub struct Incoming {
    /// Raw transport-level user id; hashed before it touches storage.
    pub user_ref: String,
    pub chat: ChatId,
    pub text: String,
}

/// Button labels shared between the dialogue parser and keyboard layouts.
pub mod buttons {
    pub const GET: &str = "Get";
    pub const ADD: &str = "Add";
    pub const INFO: &str = "Info";
    pub const CHOOSE: &str = "Choose";
    pub const DELETE: &str = "Delete";
    pub const FIX: &str = "Fix";
    pub const DELETE_EVENT: &str = "Delete event";
    pub const DELETE_NOTICE: &str = "Delete notice";
    pub const BACK: &str = "Back";
    pub const CANCEL: &str = "Cancel";
    pub const NEXT: &str = "Next";
    pub const YES: &str = "Yes";
    pub const NO: &str = "No";
}

/// Which reply keyboard the adapter should show next to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    /// Top-level menu.
    Main,
    /// Menu for the selected event.
    EventMenu,
    /// Just a cancel button, shown during input flows.
    Cancel,
    /// Skip/cancel buttons for the edit flow.
    Fix,
    /// Just a back button.
    Back,
}

impl Keyboard {
    /// Button rows for this keyboard. Presentation only; the dialogue parser
    /// matches on the shared labels in [`buttons`] regardless of layout.
    pub fn layout(&self) -> &'static [&'static [&'static str]] {
        match self {
            Keyboard::Main => &[
                &[buttons::GET, buttons::ADD],
                &[buttons::INFO, buttons::CHOOSE],
                &[buttons::DELETE],
            ],
            Keyboard::EventMenu => &[
                &[buttons::GET, buttons::FIX, buttons::INFO],
                &[buttons::ADD, buttons::DELETE_EVENT, buttons::DELETE_NOTICE],
                &[buttons::BACK],
            ],
            Keyboard::Cancel => &[&[buttons::CANCEL]],
            Keyboard::Fix => &[&[buttons::NEXT], &[buttons::CANCEL]],
            Keyboard::Back => &[&[buttons::BACK]],
        }
    }
}

/// One outbound chat message.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub chat: ChatId,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

/// Outbound side of the chat network. Implementations send one message and
/// report failure; the core never retries.
#[async_trait]
pub trait ChatPort: Send + Sync {
    async fn send(&self, message: Outgoing) -> Result<()>;
}

/// In-memory port that records everything sent through it. Used by the test
/// suites and useful to embedders exercising flows without a network.
#[derive(Default)]
pub struct MemoryPort {
    sent: Mutex<Vec<Outgoing>>,
}

impl MemoryPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, oldest first.
    pub fn sent(&self) -> Vec<Outgoing> {
        self.sent.lock().expect("memory port lock").clone()
    }

    /// The text of the most recent message, if any.
    pub fn last_text(&self) -> Option<String> {
        self.sent
            .lock()
            .expect("memory port lock")
            .last()
            .map(|m| m.text.clone())
    }
}

#[async_trait]
impl ChatPort for MemoryPort {
    async fn send(&self, message: Outgoing) -> Result<()> {
        self.sent.lock().expect("memory port lock").push(message);
        Ok(())
    }
}
