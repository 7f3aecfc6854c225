//! Conversational state machine
//!
//! - **Version**: 1.3.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false
//!
//! Everything between an inbound message and the storage layer: the
//! per-user stage router ([`handler::DialogueHandler`]), the shared service
//! bundle ([`context::BotContext`]), in-flight drafts ([`state`]) and the
//! flow implementations ([`flows`]).

pub mod context;
pub mod handler;
pub mod state;

pub(crate) mod flows;

pub use context::BotContext;
pub use handler::DialogueHandler;
