//! # Session Setup
//!
//! [`initialize`] resolves where the data lives, loads configuration and opens a
//! file-backed [`HabitTracker`]. Hosts call it once per application session and
//! keep the returned [`HabitContext`] for the lifetime of the session.
//!
//! ## Data Directory
//!
//! 1. An explicit `data_override`, when given.
//! 2. The `HABITS_DATA` environment variable (primarily for testing).
//! 3. The OS-appropriate data directory via the `directories` crate.
//!
//! Logging is left to the host: call [`crate::logging::init_logging`] with
//! `config.log_level()` and [`HabitContext::log_dir`] before `initialize` to
//! capture the load events.

use crate::config::HabitConfig;
use crate::error::{HabitError, Result};
use crate::store::FsBackend;
use crate::tracker::HabitTracker;
use clapfig::{Clapfig, SearchPath};
use directories::ProjectDirs;
use log::info;
use std::path::PathBuf;

pub const DATA_ENV_VAR: &str = "HABITS_DATA";
pub const CONFIG_FILE_NAME: &str = "habits.toml";

pub struct HabitContext {
    pub tracker: HabitTracker,
    pub config: HabitConfig,
    pub data_dir: PathBuf,
}

impl HabitContext {
    pub fn log_dir(&self) -> PathBuf {
        log_dir_for(&self.data_dir)
    }
}

pub fn log_dir_for(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("logs")
}

pub fn resolve_data_dir(data_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = data_override {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os(DATA_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    ProjectDirs::from("com", "habits", "habits")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| HabitError::Config("could not determine a data directory".to_string()))
}

pub fn load_config(data_dir: &std::path::Path) -> HabitConfig {
    Clapfig::builder()
        .app_name("habits")
        .file_name(CONFIG_FILE_NAME)
        .search_paths(vec![SearchPath::Path(data_dir.to_path_buf())])
        .load()
        .unwrap_or_default()
}

pub fn initialize(data_override: Option<PathBuf>) -> Result<HabitContext> {
    let data_dir = resolve_data_dir(data_override)?;
    let config = load_config(&data_dir);
    let tracker = HabitTracker::open(FsBackend::new(data_dir.clone()), &config)?;

    info!(
        "event=session_init module=init status=ok data_dir={} save_retries={}",
        data_dir.display(),
        config.save_retries
    );

    Ok(HabitContext {
        tracker,
        config,
        data_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_override_wins() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_data_dir(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(resolved, dir.path());
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load_config(dir.path()), HabitConfig::default());
    }

    #[test]
    fn config_file_in_data_dir_is_read() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "save_retries = 7\n").unwrap();
        let config = load_config(dir.path());
        assert_eq!(config.save_retries, 7);
        assert_eq!(config.retry_backoff_ms, 50);
    }

    #[test]
    fn initialize_opens_tracker_in_data_dir() {
        let dir = TempDir::new().unwrap();
        let mut ctx = initialize(Some(dir.path().to_path_buf())).unwrap();
        ctx.tracker.wait_until_loaded();
        ctx.tracker.add_habit("Read", "#FF6B6B").unwrap();
        assert!(ctx.tracker.flush().unwrap().is_clean());

        assert!(dir.path().join("habits.json").exists());
        assert_eq!(ctx.log_dir(), dir.path().join("logs"));
    }
}
