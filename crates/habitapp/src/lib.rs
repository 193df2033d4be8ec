//! # habitapp
//!
//! Core of a personal habit tracker: users define habits, mark them done per
//! calendar day, and read back streak statistics and a monthly heatmap.
//!
//! ## Layers
//!
//! - [`tracker`]: the state manager. Owns habits and completions in memory and
//!   exposes the mutations and derived views a UI consumes.
//! - [`stats`] / [`calendar`]: pure functions deriving streaks, roll-ups and
//!   heatmap cells from the collections.
//! - [`persist`]: the background writer that makes mutations durable without
//!   blocking the caller.
//! - [`store`]: the key-value storage contract and its file and memory backends.
//! - [`config`], [`init`], [`logging`]: session setup.
//!
//! Presentation (screens, navigation, color pickers) is out of scope; it talks
//! to a [`HabitTracker`] and nothing else.

pub mod calendar;
pub mod clock;
pub mod config;
pub mod error;
#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures;
pub mod init;
pub mod logging;
pub mod model;
pub mod persist;
pub mod stats;
pub mod store;
pub mod tracker;

pub use calendar::{CalendarDay, MonthCalendar};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::HabitConfig;
pub use error::{HabitError, Result};
pub use init::{initialize, HabitContext};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{Completion, Habit, HabitWithStats, HABIT_COLORS};
pub use persist::{FlushReport, RetryPolicy};
pub use stats::{calculate_streak, Streak, Summary};
pub use store::{FsBackend, MemBackend, StorageBackend, StoreKey};
pub use tracker::HabitTracker;
