//! # Storage Layer
//!
//! Habits and completions live in a durable key-value store as two independent
//! whole-collection snapshots:
//!
//! ```text
//! <data dir>/
//! ├── habits.json        # [Habit], insertion order
//! └── completions.json   # [Completion], insertion order
//! ```
//!
//! [`StorageBackend`] handles the "how" (filesystem vs memory) for one raw
//! payload per key. This module handles the "what": JSON encoding, decoding and
//! the clean-up a loaded [`Snapshot`] needs.
//!
//! ## No Cross-Key Transactions
//!
//! The two keys are written separately, so a crash between the two writes of a
//! delete can leave completions that point at a habit which no longer exists.
//! [`Snapshot::sanitize`] drops those on load, along with duplicate
//! `(habitId, date)` pairs. Entries of either collection that fail to decode
//! are skipped one by one instead of discarding the whole collection.
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: one JSON file per key, atomic writes.
//! - [`mem_backend::MemBackend`]: for testing logic without filesystem I/O.

use crate::error::{HabitError, Result};
use crate::model::{Completion, Habit};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;

pub use backend::StorageBackend;
pub use fs_backend::FsBackend;
pub use mem_backend::MemBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKey {
    Habits,
    Completions,
}

impl StoreKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::Habits => "habits",
            StoreKey::Completions => "completions",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Both collections as loaded from (or destined for) the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub habits: Vec<Habit>,
    pub completions: Vec<Completion>,
}

/// What [`Snapshot::sanitize`] threw away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    pub dangling: usize,
    pub duplicates: usize,
}

impl Snapshot {
    /// Drops completions for unknown habits and repeated `(habitId, date)` pairs,
    /// keeping the first occurrence and the original order.
    pub fn sanitize(&mut self) -> SanitizeReport {
        let known: HashSet<&str> = self.habits.iter().map(|h| h.id.as_str()).collect();
        let mut seen = HashSet::new();
        let mut report = SanitizeReport::default();

        self.completions.retain(|c| {
            if !known.contains(c.habit_id.as_str()) {
                report.dangling += 1;
                return false;
            }
            if !seen.insert((c.habit_id.clone(), c.date)) {
                report.duplicates += 1;
                return false;
            }
            true
        });

        report
    }
}

pub fn encode_habits(habits: &[Habit]) -> Result<String> {
    serde_json::to_string(habits).map_err(HabitError::Serialization)
}

pub fn encode_completions(completions: &[Completion]) -> Result<String> {
    serde_json::to_string(completions).map_err(HabitError::Serialization)
}

/// Decodes a JSON array entry by entry, skipping entries that do not decode as `T`.
///
/// Returns the decoded items and the number of skipped entries. The payload
/// itself must still be a JSON array.
fn decode_entries<T: DeserializeOwned>(payload: &str) -> Result<(Vec<T>, usize)> {
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(payload).map_err(HabitError::Serialization)?;
    let total = raw.len();
    let items: Vec<T> = raw
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();
    let skipped = total - items.len();
    Ok((items, skipped))
}

pub fn decode_habits(payload: &str) -> Result<(Vec<Habit>, usize)> {
    decode_entries(payload)
}

pub fn decode_completions(payload: &str) -> Result<(Vec<Completion>, usize)> {
    decode_entries(payload)
}

/// Loads both collections. An absent key yields an empty collection.
pub fn load_habits<B: StorageBackend + ?Sized>(backend: &B) -> Result<Vec<Habit>> {
    match backend.load(StoreKey::Habits)? {
        Some(payload) => {
            let (habits, skipped) = decode_habits(&payload)?;
            if skipped > 0 {
                warn!(
                    "event=store_load module=store status=partial key=habits skipped={}",
                    skipped
                );
            }
            Ok(habits)
        }
        None => Ok(Vec::new()),
    }
}

pub fn load_completions<B: StorageBackend + ?Sized>(backend: &B) -> Result<Vec<Completion>> {
    match backend.load(StoreKey::Completions)? {
        Some(payload) => {
            let (completions, skipped) = decode_completions(&payload)?;
            if skipped > 0 {
                warn!(
                    "event=store_load module=store status=partial key=completions skipped={}",
                    skipped
                );
            }
            Ok(completions)
        }
        None => Ok(Vec::new()),
    }
}
