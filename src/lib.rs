// Core layer - shared types, validation, rendering, configuration
pub mod core;

// Infrastructure - SQLite-backed storage
pub mod database;

// Application layer - the conversational state machine
pub mod dialogue;

// Reminder timers
pub mod scheduler;

// Transport seam - chat ports and keyboards
pub mod transport;

// Re-export core config for backwards compatibility
pub use core::Config;

// Re-export the items the binary and tests reach for most
pub use core::{DomainError, QuotaKind};
pub use database::Database;
pub use dialogue::{BotContext, DialogueHandler};
pub use scheduler::{ReminderJob, ReminderScheduler};
pub use transport::{ChatId, ChatPort, Incoming, Keyboard, Outgoing};
