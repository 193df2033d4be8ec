use super::backend::StorageBackend;
use super::StoreKey;
use crate::error::{HabitError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<StoreKey, String>>,
    saves: Mutex<HashMap<StoreKey, usize>>,
    simulate_read_error: AtomicBool,
    simulate_write_error: AtomicBool,
    failing_writes: AtomicUsize,
}

/// In-memory storage backend for testing.
///
/// Cloning yields another handle onto the same storage, so a test can keep
/// one handle for inspection after handing the other to a tracker (whose
/// persistence worker runs on its own thread).
#[derive(Clone, Default)]
pub struct MemBackend {
    inner: Arc<Inner>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key with a raw payload, bypassing failure simulation.
    pub fn with_raw(self, key: StoreKey, payload: &str) -> Self {
        lock(&self.inner.entries).insert(key, payload.to_string());
        self
    }

    pub fn raw(&self, key: StoreKey) -> Option<String> {
        lock(&self.inner.entries).get(&key).cloned()
    }

    /// Number of successful saves to `key`.
    pub fn save_count(&self, key: StoreKey) -> usize {
        lock(&self.inner.saves).get(&key).copied().unwrap_or(0)
    }

    /// Enable read error simulation for testing load failures.
    pub fn set_simulate_read_error(&self, simulate: bool) {
        self.inner.simulate_read_error.store(simulate, Ordering::SeqCst);
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.inner.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Make the next `count` writes fail, then recover.
    pub fn fail_next_writes(&self, count: usize) {
        self.inner.failing_writes.store(count, Ordering::SeqCst);
    }

    fn take_write_failure(&self) -> bool {
        if self.inner.simulate_write_error.load(Ordering::SeqCst) {
            return true;
        }
        self.inner
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl StorageBackend for MemBackend {
    fn load(&self, key: StoreKey) -> Result<Option<String>> {
        if self.inner.simulate_read_error.load(Ordering::SeqCst) {
            return Err(HabitError::store(key, "Simulated read error"));
        }
        Ok(lock(&self.inner.entries).get(&key).cloned())
    }

    fn save(&self, key: StoreKey, payload: &str) -> Result<()> {
        if self.take_write_failure() {
            return Err(HabitError::store(key, "Simulated write error"));
        }
        lock(&self.inner.entries).insert(key, payload.to_string());
        *lock(&self.inner.saves).entry(key).or_default() += 1;
        Ok(())
    }
}
