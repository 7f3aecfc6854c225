//! Environment-backed configuration
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Service UTC offset and quota knobs
//! - 1.0.0: Database path and log level

use anyhow::{bail, Context, Result};

use crate::core::validate::{MAX_UTC_OFFSET, MIN_UTC_OFFSET};

/// Runtime configuration, read once at startup and passed into the context.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file path.
    pub database_path: String,
    /// Default log filter when RUST_LOG is unset.
    pub log_level: String,
    /// UTC offset of the host the service runs on, in whole hours.
    /// 0 for a UTC host, which is the normal deployment.
    pub service_utc_offset: i32,
    /// Event slots granted to every new user.
    pub event_quota: i64,
    /// Notice slots granted to every new event.
    pub notice_quota: i64,
}

impl Config {
    /// Build configuration from environment variables, applying defaults for
    /// everything optional.
    pub fn from_env() -> Result<Self> {
        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "eventbell.db".to_string());
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let service_utc_offset = match std::env::var("SERVICE_UTC_OFFSET") {
            Ok(raw) => raw
                .trim()
                .parse::<i32>()
                .context("SERVICE_UTC_OFFSET must be a whole number of hours")?,
            Err(_) => 0,
        };
        if !(MIN_UTC_OFFSET..=MAX_UTC_OFFSET).contains(&service_utc_offset) {
            bail!(
                "SERVICE_UTC_OFFSET must be between {MIN_UTC_OFFSET} and {MAX_UTC_OFFSET}, got {service_utc_offset}"
            );
        }

        let event_quota = read_quota("EVENT_QUOTA", 10)?;
        let notice_quota = read_quota("NOTICE_QUOTA", 10)?;

        Ok(Config {
            database_path,
            log_level,
            service_utc_offset,
            event_quota,
            notice_quota,
        })
    }
}

fn read_quota(var: &str, default: i64) -> Result<i64> {
    let value = match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<i64>()
            .with_context(|| format!("{var} must be a positive integer"))?,
        Err(_) => default,
    };
    if value < 1 {
        bail!("{var} must be at least 1, got {value}");
    }
    Ok(value)
}
