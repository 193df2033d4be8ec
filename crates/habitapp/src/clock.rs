//! Wall-clock access and habit id issuance.
//!
//! Everything date-sensitive (the default toggle date, "completed today", the
//! live streak anchor) reads the clock through [`Clock`] so tests can pin it.

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use std::sync::Mutex;
use uuid::Uuid;

pub trait Clock: Send {
    /// Current instant, used for `createdAt` stamps and ids.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar day in the user's local timezone.
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock that only moves when told to. `today()` is the UTC date of `now()`.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// A clock pinned to noon UTC on `date`.
    pub fn on(date: NaiveDate) -> Self {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .unwrap_or_default()
            .and_utc();
        Self::new(noon)
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Issues time-derived habit ids: the creation instant in epoch milliseconds.
///
/// Ids are strictly increasing per generator even when two habits are created
/// within the same millisecond or the wall clock steps backwards. If a loaded id
/// leaves no numeric room above it, ids fall back to `<ms>-<uuid>`, which are
/// still unique but no longer ordered.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last_ms: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the generator so new ids sort after every numeric id in `existing`.
    pub fn observe<'a>(&mut self, existing: impl IntoIterator<Item = &'a str>) {
        for id in existing {
            if let Ok(ms) = id.parse::<i64>() {
                self.last_ms = self.last_ms.max(ms);
            }
        }
    }

    pub fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let ms = now.timestamp_millis();
        if ms > self.last_ms {
            self.last_ms = ms;
            return ms.to_string();
        }
        match self.last_ms.checked_add(1) {
            Some(next) => {
                self.last_ms = next;
                next.to_string()
            }
            None => format!("{}-{}", ms, Uuid::new_v4().simple()),
        }
    }
}
