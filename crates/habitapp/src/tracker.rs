//! # Habit Tracker
//!
//! [`HabitTracker`] is the single entry point for habit operations, whatever UI
//! sits on top of it. One tracker is constructed per application session and
//! handed to consumers by reference; dropping it drains pending writes and stops
//! its persistence worker.
//!
//! ## State and Persistence
//!
//! The tracker holds two ordered collections in memory: habits (insertion order)
//! and completions (insertion order, append-mostly). Every mutation:
//!
//! 1. updates memory synchronously, so the change is visible immediately, then
//! 2. queues a whole-collection snapshot on the [`PersistWorker`].
//!
//! The caller never observes the write. Failures are retried and logged by the
//! worker, and never roll back or block the in-memory change. [`HabitTracker::flush`]
//! waits for the queue when a caller does need durability (tests, shutdown).
//!
//! ## Loading
//!
//! Construction queues the initial load and returns immediately with
//! [`HabitTracker::is_loading`] set. Reads made while loading see empty
//! collections. Mutations first wait for the load to land, so a late load can
//! never overwrite a change.
//!
//! ## Derived Views
//!
//! [`HabitTracker::habits_with_stats`], [`HabitTracker::summary`] and
//! [`HabitTracker::month_calendar`] are recomputed from the current collections
//! on every call. [`HabitTracker::version`] increments on every mutation for
//! consumers that want to memoize them.

use crate::calendar::{self, MonthCalendar};
use crate::clock::{Clock, IdGenerator, SystemClock};
use crate::config::HabitConfig;
use crate::error::Result;
use crate::model::{normalize_name, Completion, Habit, HabitWithStats};
use crate::persist::{FlushReport, PersistWorker};
use crate::stats::{self, Summary};
use crate::store::{self, Snapshot, StorageBackend, StoreKey};
use chrono::NaiveDate;
use crossbeam::channel::{Receiver, TryRecvError};
use log::{debug, error, info, warn};

pub struct HabitTracker {
    habits: Vec<Habit>,
    completions: Vec<Completion>,
    pending_load: Option<Receiver<Snapshot>>,
    worker: PersistWorker,
    clock: Box<dyn Clock>,
    ids: IdGenerator,
    version: u64,
}

impl HabitTracker {
    /// Starts a tracker over `backend` using the system clock.
    pub fn open<B: StorageBackend>(backend: B, config: &HabitConfig) -> Result<Self> {
        Self::open_with_clock(backend, config, SystemClock)
    }

    pub fn open_with_clock<B, C>(backend: B, config: &HabitConfig, clock: C) -> Result<Self>
    where
        B: StorageBackend,
        C: Clock + 'static,
    {
        let worker = PersistWorker::start(backend, config.retry_policy())?;
        let pending_load = worker.request_load()?;
        Ok(Self {
            habits: Vec::new(),
            completions: Vec::new(),
            pending_load: Some(pending_load),
            worker,
            clock: Box::new(clock),
            ids: IdGenerator::new(),
            version: 0,
        })
    }

    // --- Loading ---

    /// True until the initial load has been applied.
    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    /// Applies the initial load if it has arrived. Never blocks.
    /// Returns true once loading is complete.
    pub fn poll_load(&mut self) -> bool {
        let Some(rx) = &self.pending_load else {
            return true;
        };
        match rx.try_recv() {
            Ok(snapshot) => self.apply_snapshot(snapshot),
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => self.abandon_load(),
        }
        true
    }

    /// Blocks until the initial load has been applied.
    pub fn wait_until_loaded(&mut self) {
        let Some(rx) = self.pending_load.as_ref() else {
            return;
        };
        match rx.recv() {
            Ok(snapshot) => self.apply_snapshot(snapshot),
            Err(_) => self.abandon_load(),
        }
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.pending_load = None;
        self.habits = snapshot.habits;
        self.completions = snapshot.completions;
        self.ids.observe(self.habits.iter().map(|h| h.id.as_str()));
        self.version += 1;
    }

    fn abandon_load(&mut self) {
        error!("event=tracker_load module=tracker status=error reason=worker_gone");
        self.apply_snapshot(Snapshot::default());
    }

    // --- Mutations ---

    /// Creates a habit and returns its id.
    ///
    /// A name that is empty after trimming is rejected: nothing is created and
    /// `None` is returned. The color is stored as given.
    pub fn add_habit(&mut self, name: &str, color: &str) -> Option<String> {
        let Some(name) = normalize_name(name) else {
            debug!("event=habit_add module=tracker status=rejected reason=blank_name");
            return None;
        };
        self.wait_until_loaded();

        let now = self.clock.now();
        let habit = Habit::new(self.ids.next_id(now), name, color.to_string(), now);
        let id = habit.id.clone();
        self.habits.push(habit);
        self.mutated();
        info!(
            "event=habit_add module=tracker status=ok habit_id={} habits={}",
            id,
            self.habits.len()
        );

        self.persist(StoreKey::Habits);
        Some(id)
    }

    /// Removes a habit and all of its completions.
    ///
    /// Unknown ids are a no-op. Returns whether a habit was removed.
    pub fn delete_habit(&mut self, habit_id: &str) -> bool {
        self.wait_until_loaded();

        let before = self.habits.len();
        self.habits.retain(|h| h.id != habit_id);
        if self.habits.len() == before {
            debug!(
                "event=habit_delete module=tracker status=noop habit_id={}",
                habit_id
            );
            return false;
        }

        let completions_before = self.completions.len();
        self.completions.retain(|c| c.habit_id != habit_id);
        self.mutated();
        info!(
            "event=habit_delete module=tracker status=ok habit_id={} completions_removed={}",
            habit_id,
            completions_before - self.completions.len()
        );

        self.persist(StoreKey::Habits);
        self.persist(StoreKey::Completions);
        true
    }

    /// Flips whether `habit_id` is marked done on `date`.
    ///
    /// Returns the new state: true if the habit is now completed on that day.
    /// Toggling an unknown habit does nothing and returns false.
    pub fn toggle_habit(&mut self, habit_id: &str, date: NaiveDate) -> bool {
        self.wait_until_loaded();

        if !self.habits.iter().any(|h| h.id == habit_id) {
            warn!(
                "event=habit_toggle module=tracker status=rejected reason=unknown_habit habit_id={}",
                habit_id
            );
            return false;
        }

        let completed = match self
            .completions
            .iter()
            .position(|c| c.matches(habit_id, date))
        {
            Some(index) => {
                self.completions.remove(index);
                false
            }
            None => {
                self.completions.push(Completion::new(habit_id, date));
                true
            }
        };
        self.mutated();
        debug!(
            "event=habit_toggle module=tracker status=ok habit_id={} date={} completed={}",
            habit_id, date, completed
        );

        self.persist(StoreKey::Completions);
        completed
    }

    /// [`Self::toggle_habit`] for the current local day.
    pub fn toggle_today(&mut self, habit_id: &str) -> bool {
        let today = self.clock.today();
        self.toggle_habit(habit_id, today)
    }

    // --- Reads ---

    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn completions(&self) -> &[Completion] {
        &self.completions
    }

    pub fn habit(&self, habit_id: &str) -> Option<&Habit> {
        self.habits.iter().find(|h| h.id == habit_id)
    }

    pub fn completions_for_date(&self, date: NaiveDate) -> Vec<Completion> {
        self.completions
            .iter()
            .filter(|c| c.date == date)
            .cloned()
            .collect()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn habits_with_stats(&self) -> Vec<HabitWithStats> {
        stats::habits_with_stats(&self.habits, &self.completions, self.clock.today())
    }

    pub fn summary(&self) -> Summary {
        stats::summarize(&self.habits_with_stats())
    }

    pub fn month_calendar(&self, year: i32, month: u32) -> Result<MonthCalendar> {
        calendar::month_calendar(&self.completions, self.habits.len(), year, month)
    }

    /// Incremented on every mutation and on load.
    pub fn version(&self) -> u64 {
        self.version
    }

    // --- Durability ---

    /// Blocks until every queued write has been attempted.
    pub fn flush(&self) -> Result<FlushReport> {
        self.worker.flush()
    }

    /// Flushes and stops the persistence worker.
    pub fn close(mut self) -> Result<FlushReport> {
        let report = self.worker.flush();
        self.worker.shutdown();
        report
    }

    fn mutated(&mut self) {
        self.version += 1;
    }

    fn persist(&self, key: StoreKey) {
        let payload = match key {
            StoreKey::Habits => store::encode_habits(&self.habits),
            StoreKey::Completions => store::encode_completions(&self.completions),
        };
        let queued = payload.and_then(|payload| self.worker.save(key, payload));
        if let Err(err) = queued {
            error!(
                "event=store_save module=tracker status=error key={} error={}",
                key, err
            );
        }
    }
}
