//! An explicit work-queue serializing reconciliation by `(namespace, name)` (spec.md §5, §9
//! design note: reimplement controller-runtime's manager/predicate machinery as an explicit
//! work-queue + watcher abstraction). Fed by `kube::runtime::watcher` streams over `Application`,
//! `ApplicationRevision`, and `ResourceTracker` in the binary; this module only owns dedup and
//! per-key serialization.
use std::collections::HashSet;
use std::sync::Mutex;

use tokio::sync::mpsc;

/// `(namespace, name)` of the Application to reconcile.
pub type ReconcileKey = (String, String);

/// Dedupes pending enqueues and ensures the same key is never handed to two workers at once
/// (spec.md §5: "the same Application never reconciles concurrently with itself").
pub struct ReconcileQueue {
    tx: mpsc::UnboundedSender<ReconcileKey>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ReconcileKey>>,
    queued: Mutex<HashSet<ReconcileKey>>,
    in_flight: Mutex<HashSet<ReconcileKey>>,
}

impl ReconcileQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
            queued: Mutex::new(HashSet::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Enqueues `key`, a no-op if it's already waiting to be picked up. Called from the watcher
    /// streams on every Application/ApplicationRevision/ResourceTracker event.
    pub fn enqueue(&self, key: ReconcileKey) {
        let mut queued = self.queued.lock().expect("queue lock is never poisoned");
        if queued.insert(key.clone()) {
            // The receiver is only dropped together with the queue itself, so every sender
            // outlives it; an error here would mean the queue is being torn down.
            let _ = self.tx.send(key);
        }
    }

    /// Waits for the next key that isn't already being reconciled by another worker. Keys whose
    /// predecessor is still in flight are requeued behind it rather than handed out twice.
    pub async fn recv(&self) -> ReconcileKey {
        loop {
            let key = {
                let mut rx = self.rx.lock().await;
                rx.recv()
                    .await
                    .expect("sender is held by self for the queue's whole lifetime")
            };
            self.queued
                .lock()
                .expect("queue lock is never poisoned")
                .remove(&key);

            let mut in_flight = self.in_flight.lock().expect("queue lock is never poisoned");
            if in_flight.contains(&key) {
                drop(in_flight);
                self.enqueue(key);
                continue;
            }
            in_flight.insert(key.clone());
            return key;
        }
    }

    /// Marks `key` as no longer being reconciled. Must be called exactly once per [`Self::recv`].
    pub fn finish(&self, key: &ReconcileKey) {
        self.in_flight
            .lock()
            .expect("queue lock is never poisoned")
            .remove(key);
    }
}

impl Default for ReconcileQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_enqueues_collapse_to_one_delivery() {
        let queue = ReconcileQueue::new();
        let key = ("default".to_string(), "web".to_string());
        queue.enqueue(key.clone());
        queue.enqueue(key.clone());

        let received = queue.recv().await;
        assert_eq!(received, key);
        queue.finish(&received);

        let other = ("default".to_string(), "other".to_string());
        queue.enqueue(other.clone());
        assert_eq!(queue.recv().await, other);
    }

    #[tokio::test]
    async fn a_key_re_enqueued_while_in_flight_is_delivered_again_after_finish() {
        let queue = ReconcileQueue::new();
        let key = ("default".to_string(), "web".to_string());
        queue.enqueue(key.clone());
        let first = queue.recv().await;
        assert_eq!(first, key);

        // A watch event arrives mid-reconcile.
        queue.enqueue(key.clone());
        queue.finish(&first);

        let second = queue.recv().await;
        assert_eq!(second, key);
    }
}
