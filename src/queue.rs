// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Key-deduplicating work queue shared by all workers.
//!
//! Semantics follow the classic controller work queue: a key queued twice
//! before being picked up is processed once; a key re-added while a worker
//! is processing it is re-queued when that worker calls [`WorkQueue::done`];
//! failed keys come back after an exponential per-key backoff. Different
//! keys are processed in parallel, the same key never is.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;

/// First retry delay; doubles per consecutive failure of the same key.
const BASE_DELAY: Duration = Duration::from_millis(50);

/// Upper bound on the per-key retry delay.
const MAX_DELAY: Duration = Duration::from_secs(60);

#[derive(Default)]
struct Inner {
    queue: VecDeque<String>,
    /// Keys waiting in `queue`.
    pending: HashSet<String>,
    /// Keys currently held by a worker.
    active: HashSet<String>,
    /// Keys re-added while active; re-queued on `done`.
    dirty: HashSet<String>,
    /// Consecutive failures per key, cleared by `forget`.
    retries: HashMap<String, u32>,
    shutdown: bool,
}

/// Shared rate-limited queue of composite reconcile keys.
#[derive(Default)]
pub struct WorkQueue {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl WorkQueue {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(WorkQueue::default())
    }

    /// Enqueue a key. Duplicates of a pending key are dropped; a key being
    /// processed right now is marked dirty and comes back after `done`.
    pub fn add(&self, key: String) {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if inner.shutdown || inner.pending.contains(&key) {
            return;
        }
        if inner.active.contains(&key) {
            inner.dirty.insert(key);
            return;
        }
        inner.pending.insert(key.clone());
        inner.queue.push_back(key);
        drop(inner);
        self.notify.notify_one();
    }

    /// Pop the next key, waiting while the queue is empty. Returns `None`
    /// once the queue has shut down and drained.
    pub async fn get(&self) -> Option<String> {
        loop {
            {
                let mut inner = match self.inner.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if let Some(key) = inner.queue.pop_front() {
                    inner.pending.remove(&key);
                    inner.active.insert(key.clone());
                    return Some(key);
                }
                if inner.shutdown {
                    return None;
                }
            }
            // Periodic re-check keeps shutdown from racing a missed wakeup.
            tokio::select! {
                () = self.notify.notified() => {}
                () = tokio::time::sleep(Duration::from_millis(100)) => {}
            }
        }
    }

    /// Mark a key's processing finished. If the key went dirty meanwhile it
    /// is queued again.
    pub fn done(&self, key: &str) {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.active.remove(key);
        if inner.dirty.remove(key) && !inner.pending.contains(key) {
            inner.pending.insert(key.to_string());
            inner.queue.push_back(key.to_string());
            drop(inner);
            self.notify.notify_one();
        }
    }

    /// Re-queue a failed key after its exponential backoff.
    pub fn requeue(self: &Arc<Self>, key: String) {
        let delay = {
            let mut inner = match self.inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if inner.shutdown {
                return;
            }
            let retries = inner.retries.entry(key.clone()).or_insert(0);
            let delay = BASE_DELAY
                .checked_mul(1 << (*retries).min(20))
                .unwrap_or(MAX_DELAY)
                .min(MAX_DELAY);
            *retries += 1;
            delay
        };
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key);
        });
    }

    /// Clear a key's failure history after a successful reconcile.
    pub fn forget(&self, key: &str) {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.retries.remove(key);
    }

    /// Stop accepting new keys and wake blocked workers; queued keys still
    /// drain.
    pub fn shutdown(&self) {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.shutdown = true;
        drop(inner);
        self.notify.notify_waiters();
    }

    /// Number of keys waiting to be picked up.
    #[must_use]
    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.queue.len(),
            Err(poisoned) => poisoned.into_inner().queue.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod queue_tests;
