//! # Configuration
//!
//! Tracker configuration is managed by [`clapfig`], which handles layered loading
//! from TOML files, environment variables, and programmatic overrides.
//!
//! ## Storage Hierarchy
//!
//! Configuration is resolved in priority order:
//! 1. **Environment variables**: `HABITS__SAVE_RETRIES`, `HABITS__LOG_LEVEL`, etc.
//! 2. **Data dir config**: `<data dir>/habits.toml`.
//! 3. **Compiled Defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `save_retries` | `2` | Extra attempts after a failed background save |
//! | `retry_backoff_ms` | `50` | Delay between save attempts, in milliseconds |
//! | `log_level` | build dependent | `trace`, `debug`, `info`, `warn` or `error` |

use crate::logging::default_log_level;
use crate::persist::RetryPolicy;
use confique::Config;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the tracker, stored in `habits.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct HabitConfig {
    /// Extra attempts after a failed background save.
    #[config(default = 2)]
    pub save_retries: u32,

    /// Delay between save attempts, in milliseconds.
    #[config(default = 50)]
    pub retry_backoff_ms: u64,

    /// Log level. When absent, `debug` for debug builds and `info` otherwise.
    pub log_level: Option<String>,
}

impl Default for HabitConfig {
    fn default() -> Self {
        Self {
            save_retries: 2,
            retry_backoff_ms: 50,
            log_level: None,
        }
    }
}

impl HabitConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.save_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }
}
