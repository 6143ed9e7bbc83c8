//! Typed configuration from environment variables.
//!
//! Loads once at startup. Everything has a sensible default; a malformed
//! value fails fast instead of being silently ignored.
//! In local dev, call `dotenvy::dotenv().ok()` before this.

use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct Config {
    /// Pause between scan passes. `DIRQ_POLL_INTERVAL_MS`, default 500.
    pub poll_interval: Duration,
    /// Stable consumer identity. `DIRQ_IDENTITY`; random when unset.
    pub identity: Option<String>,
    /// Default tracing filter. `LOG_LEVEL`, default "info".
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let poll_interval = match std::env::var("DIRQ_POLL_INTERVAL_MS") {
            Ok(raw) => {
                let ms: u64 = raw.parse().map_err(|_| {
                    Error::Config(format!(
                        "DIRQ_POLL_INTERVAL_MS must be an integer, got '{raw}'"
                    ))
                })?;
                Duration::from_millis(ms)
            }
            Err(_) => Duration::from_millis(500),
        };

        Ok(Self {
            poll_interval,
            identity: std::env::var("DIRQ_IDENTITY").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}
