//! Background persistence worker.
//!
//! A single writer thread owns the [`StorageBackend`] and drains a FIFO queue of
//! [`PersistCommand`]s. Because there is exactly one consumer, the initial load
//! always completes before any save, and saves to the same key land in the
//! order they were issued (the last snapshot wins).
//!
//! Saves are at-least-once per key: a failed write is retried according to the
//! [`RetryPolicy`], and if it still fails the key is marked dirty with its
//! latest snapshot. Dirty keys are written again on [`PersistWorker::flush`] and
//! on shutdown. A newer save for a dirty key supersedes the stale snapshot.
//!
//! The caller never waits for a save: between `save()` returning and the write
//! landing, the in-memory state is ahead of the store, and a crash in that
//! window loses the update.

use crate::error::{HabitError, Result};
use crate::store::{self, Snapshot, StorageBackend, StoreKey};
use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failed write.
    pub retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Result of draining the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Keys whose latest snapshot is still not durable.
    pub dirty: Vec<StoreKey>,
}

impl FlushReport {
    pub fn is_clean(&self) -> bool {
        self.dirty.is_empty()
    }
}

enum PersistCommand {
    Load(Sender<Snapshot>),
    Save { key: StoreKey, payload: String },
    Flush(Sender<FlushReport>),
    Shutdown,
}

pub struct PersistWorker {
    tx: Sender<PersistCommand>,
    handle: Option<JoinHandle<()>>,
}

impl PersistWorker {
    pub fn start<B: StorageBackend>(backend: B, policy: RetryPolicy) -> Result<Self> {
        let (tx, rx) = channel::unbounded();
        let handle = thread::Builder::new()
            .name("habits-persist".to_string())
            .spawn(move || {
                WorkerLoop {
                    backend,
                    policy,
                    dirty: BTreeMap::new(),
                }
                .run(rx)
            })
            .map_err(HabitError::Io)?;
        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    /// Queues a load of both collections. The snapshot arrives on the returned
    /// channel once every previously queued command has been processed.
    pub fn request_load(&self) -> Result<Receiver<Snapshot>> {
        let (reply_tx, reply_rx) = channel::bounded(1);
        self.send(PersistCommand::Load(reply_tx))?;
        Ok(reply_rx)
    }

    /// Queues a write of `payload` under `key`. Returns as soon as it is queued.
    pub fn save(&self, key: StoreKey, payload: String) -> Result<()> {
        self.send(PersistCommand::Save { key, payload })
    }

    /// Blocks until everything queued so far has been attempted, retrying dirty keys.
    pub fn flush(&self) -> Result<FlushReport> {
        let (reply_tx, reply_rx) = channel::bounded(1);
        self.send(PersistCommand::Flush(reply_tx))?;
        reply_rx.recv().map_err(|_| HabitError::WorkerUnavailable)
    }

    /// Drains the queue and stops the worker thread. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.tx.send(PersistCommand::Shutdown);
        if handle.join().is_err() {
            error!("event=persist_shutdown module=persist status=error reason=worker_panicked");
        }
    }

    fn send(&self, command: PersistCommand) -> Result<()> {
        if self.handle.is_none() {
            return Err(HabitError::WorkerUnavailable);
        }
        self.tx
            .send(command)
            .map_err(|_| HabitError::WorkerUnavailable)
    }
}

impl Drop for PersistWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct WorkerLoop<B> {
    backend: B,
    policy: RetryPolicy,
    dirty: BTreeMap<StoreKey, String>,
}

impl<B: StorageBackend> WorkerLoop<B> {
    fn run(mut self, rx: Receiver<PersistCommand>) {
        while let Ok(cmd) = rx.recv() {
            match cmd {
                PersistCommand::Load(reply) => {
                    let _ = reply.send(self.load());
                }
                PersistCommand::Save { key, payload } => {
                    self.save(key, payload);
                }
                PersistCommand::Flush(reply) => {
                    self.retry_dirty();
                    let _ = reply.send(self.report());
                }
                PersistCommand::Shutdown => break,
            }
        }

        self.retry_dirty();
        if !self.dirty.is_empty() {
            error!(
                "event=persist_shutdown module=persist status=error dirty_keys={}",
                self.report()
                    .dirty
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            );
        }
    }

    fn load(&self) -> Snapshot {
        let habits = match store::load_habits(&self.backend) {
            Ok(habits) => habits,
            Err(err) => {
                // Completions are meaningless without their habits.
                error!(
                    "event=store_load module=persist status=error key=habits error={}",
                    err
                );
                return Snapshot::default();
            }
        };
        let completions = store::load_completions(&self.backend).unwrap_or_else(|err| {
            error!(
                "event=store_load module=persist status=error key=completions error={}",
                err
            );
            Vec::new()
        });

        let mut snapshot = Snapshot {
            habits,
            completions,
        };
        let report = snapshot.sanitize();
        if report.dangling > 0 || report.duplicates > 0 {
            warn!(
                "event=store_sanitize module=persist status=ok dangling={} duplicates={}",
                report.dangling, report.duplicates
            );
        }
        info!(
            "event=store_load module=persist status=ok habits={} completions={}",
            snapshot.habits.len(),
            snapshot.completions.len()
        );
        snapshot
    }

    fn save(&mut self, key: StoreKey, payload: String) {
        if self.write_with_retries(key, &payload) {
            self.dirty.remove(&key);
        } else {
            error!(
                "event=store_save module=persist status=error key={} attempts={}",
                key,
                self.policy.retries + 1
            );
            self.dirty.insert(key, payload);
        }
    }

    fn retry_dirty(&mut self) {
        let pending: Vec<(StoreKey, String)> =
            self.dirty.iter().map(|(k, v)| (*k, v.clone())).collect();
        for (key, payload) in pending {
            self.save(key, payload);
        }
    }

    fn write_with_retries(&self, key: StoreKey, payload: &str) -> bool {
        for attempt in 0..=self.policy.retries {
            if attempt > 0 && !self.policy.backoff.is_zero() {
                thread::sleep(self.policy.backoff);
            }
            match self.backend.save(key, payload) {
                Ok(()) => {
                    debug!(
                        "event=store_save module=persist status=ok key={} bytes={} attempt={}",
                        key,
                        payload.len(),
                        attempt + 1
                    );
                    return true;
                }
                Err(err) => {
                    warn!(
                        "event=store_save module=persist status=retry key={} attempt={} error={}",
                        key,
                        attempt + 1,
                        err
                    );
                }
            }
        }
        false
    }

    fn report(&self) -> FlushReport {
        FlushReport {
            dirty: self.dirty.keys().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemBackend;

    fn no_backoff(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            backoff: Duration::ZERO,
        }
    }

    #[test]
    fn saves_land_in_issue_order() {
        let backend = MemBackend::new();
        let worker = PersistWorker::start(backend.clone(), no_backoff(0)).unwrap();

        worker.save(StoreKey::Habits, "[1]".to_string()).unwrap();
        worker.save(StoreKey::Habits, "[2]".to_string()).unwrap();
        assert!(worker.flush().unwrap().is_clean());

        assert_eq!(backend.raw(StoreKey::Habits).as_deref(), Some("[2]"));
        assert_eq!(backend.save_count(StoreKey::Habits), 2);
    }

    #[test]
    fn load_sees_data_saved_before_it() {
        let backend = MemBackend::new();
        let worker = PersistWorker::start(backend, no_backoff(0)).unwrap();
        worker
            .save(
                StoreKey::Habits,
                r##"[{"id":"1","name":"Read","color":"#FF6B6B","createdAt":"2024-06-01T08:00:00Z"}]"##
                    .to_string(),
            )
            .unwrap();

        let snapshot = worker.request_load().unwrap().recv().unwrap();
        assert_eq!(snapshot.habits.len(), 1);
        assert!(snapshot.completions.is_empty());
    }

    #[test]
    fn transient_write_failure_is_retried() {
        let backend = MemBackend::new();
        backend.fail_next_writes(2);
        let worker = PersistWorker::start(backend.clone(), no_backoff(2)).unwrap();

        worker.save(StoreKey::Completions, "[]".to_string()).unwrap();
        assert!(worker.flush().unwrap().is_clean());
        assert_eq!(backend.raw(StoreKey::Completions).as_deref(), Some("[]"));
    }

    #[test]
    fn exhausted_retries_leave_key_dirty_until_flush_succeeds() {
        let backend = MemBackend::new();
        backend.set_simulate_write_error(true);
        let worker = PersistWorker::start(backend.clone(), no_backoff(1)).unwrap();

        worker.save(StoreKey::Habits, "[1]".to_string()).unwrap();
        let report = worker.flush().unwrap();
        assert_eq!(report.dirty, vec![StoreKey::Habits]);
        assert_eq!(backend.raw(StoreKey::Habits), None);

        backend.set_simulate_write_error(false);
        assert!(worker.flush().unwrap().is_clean());
        assert_eq!(backend.raw(StoreKey::Habits).as_deref(), Some("[1]"));
    }

    #[test]
    fn newer_save_supersedes_dirty_snapshot() {
        let backend = MemBackend::new();
        backend.set_simulate_write_error(true);
        let worker = PersistWorker::start(backend.clone(), no_backoff(0)).unwrap();
        worker.save(StoreKey::Habits, "[old]".to_string()).unwrap();
        worker.flush().unwrap();

        backend.set_simulate_write_error(false);
        worker.save(StoreKey::Habits, "[new]".to_string()).unwrap();
        assert!(worker.flush().unwrap().is_clean());
        assert_eq!(backend.raw(StoreKey::Habits).as_deref(), Some("[new]"));
    }

    #[test]
    fn shutdown_drains_queue() {
        let backend = MemBackend::new();
        let mut worker = PersistWorker::start(backend.clone(), no_backoff(0)).unwrap();
        worker.save(StoreKey::Completions, "[]".to_string()).unwrap();
        worker.shutdown();

        assert_eq!(backend.raw(StoreKey::Completions).as_deref(), Some("[]"));
        assert!(matches!(
            worker.save(StoreKey::Completions, "[]".to_string()),
            Err(HabitError::WorkerUnavailable)
        ));
    }

    #[test]
    fn unreadable_store_loads_empty() {
        let backend = MemBackend::new().with_raw(StoreKey::Habits, "[]");
        backend.set_simulate_read_error(true);
        let worker = PersistWorker::start(backend, no_backoff(0)).unwrap();
        let snapshot = worker.request_load().unwrap().recv().unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }
}
