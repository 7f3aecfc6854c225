//! # Core Module
//!
//! Core domain types, configuration, validation and message rendering.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Move message rendering here from the dialogue layer
//! - 1.1.0: Typed domain errors
//! - 1.0.0: Initial creation with config and models

pub mod config;
pub mod error;
pub mod models;
pub mod render;
pub mod validate;

// Re-export commonly used items
pub use config::Config;
pub use error::{DomainError, QuotaKind};
pub use models::{
    Event, EventPatch, Notice, PendingReminder, Stage, UserId, UserProfile, UserState, Window,
};
pub use render::{chunk_for_message, MESSAGE_LIMIT};
