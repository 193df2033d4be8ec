//! # Domain Model: Habits and Completions
//!
//! This module defines the persisted records, [`Habit`] and [`Completion`], and the
//! derived read model [`HabitWithStats`].
//!
//! ## Wire Format
//!
//! Both collections are stored as JSON arrays with camelCase keys, in insertion order:
//!
//! ```text
//! habits:      [{"id":"1718000000000","name":"Read","color":"#FF6B6B","createdAt":"2024-06-10T06:13:20Z"}]
//! completions: [{"habitId":"1718000000000","date":"2024-06-10"}]
//! ```
//!
//! Completion dates are calendar days without a time component. They are
//! compared as [`NaiveDate`]s taken from the local wall clock, so no timezone
//! arithmetic is involved.
//!
//! ## Identity
//!
//! A habit id is opaque to everything except the tracker that issues it. New ids
//! are derived from the creation instant (see [`crate::clock::IdGenerator`]), but
//! loaded ids are accepted verbatim.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The fixed palette offered when creating a habit.
///
/// Informational only: the tracker stores whatever color string it is given.
pub const HABIT_COLORS: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
    "#F8B739", "#52B788",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Habit {
    pub fn new(id: String, name: String, color: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            color,
            created_at,
            icon: None,
        }
    }
}

/// "Habit X was done on day Y". At most one exists per `(habit_id, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub habit_id: String,
    pub date: NaiveDate,
}

impl Completion {
    pub fn new(habit_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            habit_id: habit_id.into(),
            date,
        }
    }

    pub fn matches(&self, habit_id: &str, date: NaiveDate) -> bool {
        self.habit_id == habit_id && self.date == date
    }
}

/// A habit joined with its statistics. Derived on every read, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitWithStats {
    #[serde(flatten)]
    pub habit: Habit,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub completed_today: bool,
    pub total_completions: u32,
}

/// Normalizes a user-supplied habit name.
///
/// Returns `None` when nothing but whitespace was given.
pub fn normalize_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
