//! Test fixtures: trackers over an in-memory store with a pinned clock.

use crate::clock::FixedClock;
use crate::config::HabitConfig;
use crate::store::{MemBackend, StorageBackend};
use crate::tracker::HabitTracker;
use chrono::{Duration, NaiveDate};

/// Opens a tracker over `backend` with the clock pinned to `today` and no
/// retry backoff, and waits for the initial load.
pub fn open_tracker<B: StorageBackend>(backend: B, today: NaiveDate) -> HabitTracker {
    let config = HabitConfig {
        retry_backoff_ms: 0,
        ..Default::default()
    };
    let mut tracker = HabitTracker::open_with_clock(backend, &config, FixedClock::on(today))
        .expect("failed to start tracker");
    tracker.wait_until_loaded();
    tracker
}

pub struct TrackerFixture {
    pub tracker: HabitTracker,
    pub backend: MemBackend,
    pub today: NaiveDate,
}

impl TrackerFixture {
    pub fn new(today: NaiveDate) -> Self {
        let backend = MemBackend::new();
        let tracker = open_tracker(backend.clone(), today);
        Self {
            tracker,
            backend,
            today,
        }
    }

    /// Adds a habit completed on each of the given days-before-today offsets.
    pub fn with_history(mut self, name: &str, days_ago: &[i64]) -> Self {
        let id = self
            .tracker
            .add_habit(name, "#4ECDC4")
            .expect("fixture habit name must not be blank");
        for offset in days_ago {
            self.tracker
                .toggle_habit(&id, self.today - Duration::days(*offset));
        }
        self
    }

    pub fn id_of(&self, name: &str) -> String {
        self.tracker
            .habits()
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.id.clone())
            .expect("no fixture habit with that name")
    }
}
