//! Domain error types shared across the store, scheduler and dialogue layers
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use thiserror::Error;

/// Which quota counter rejected a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaKind {
    /// Per-user event slots.
    Event,
    /// Per-event notice slots.
    Notice,
}

impl std::fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaKind::Event => write!(f, "event"),
            QuotaKind::Notice => write!(f, "notice"),
        }
    }
}

/// Every way a domain operation can fail.
///
/// All variants are recoverable from the user's point of view: the dialogue
/// layer renders them as chat messages and resets the flow. `Storage` is the
/// only variant that signals an infrastructure problem rather than a rule
/// violation.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("event date and time must be in the future")]
    EventTimeInPast,

    #[error("no {0} slots left")]
    QuotaExhausted(QuotaKind),

    #[error("event not found")]
    EventNotFound,

    #[error("notice not found")]
    NoticeNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("the edited event date and time must stay in the future")]
    InvalidFixTime,

    #[error("a notice must not fire after its event starts")]
    NoticeAfterEvent,

    #[error("nothing to delete")]
    NothingToDelete,

    #[error("storage unavailable: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl DomainError {
    /// True for the variants a user can fix by acting differently, false for
    /// infrastructure failures.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, DomainError::Storage(_))
    }
}
