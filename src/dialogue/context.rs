//! Dialogue execution context
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0

use std::sync::Arc;

use crate::core::config::Config;
use crate::database::Database;
use crate::scheduler::ReminderScheduler;
use crate::transport::ChatPort;

/// Shared context for dialogue execution.
///
/// Bundles the services the flow handlers need: storage, the outbound port,
/// the reminder scheduler and the runtime configuration. Cloneable so each
/// spawned message task can carry its own copy; there are no globals behind
/// it.
#[derive(Clone)]
pub struct BotContext {
    pub database: Database,
    pub port: Arc<dyn ChatPort>,
    pub scheduler: ReminderScheduler,
    pub config: Config,
}

impl BotContext {
    pub fn new(
        database: Database,
        port: Arc<dyn ChatPort>,
        scheduler: ReminderScheduler,
        config: Config,
    ) -> Self {
        BotContext {
            database,
            port,
            scheduler,
            config,
        }
    }
}
