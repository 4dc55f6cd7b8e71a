//! The metric surface spec.md §6 names as part of the external contract. Exporting these is out
//! of scope (Non-goals), so this struct only accumulates in-memory counters the controller always
//! increments; a future exporter can read them through the accessor methods without the
//! reconcile loop itself depending on one.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct Histogram {
    count: AtomicU64,
    sum_millis: AtomicU64,
}

impl Histogram {
    fn observe(&self, value: std::time::Duration) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_millis
            .fetch_add(value.as_millis() as u64, Ordering::Relaxed);
    }

    fn mean(&self) -> Option<std::time::Duration> {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        let sum = self.sum_millis.load(Ordering::Relaxed);
        Some(std::time::Duration::from_millis(sum / count))
    }
}

/// `reconcile_duration_seconds`, `workflow_step_duration_seconds`,
/// `cluster_connectivity_errors`, `resource_tracker_entries` (spec.md §6).
#[derive(Default)]
pub struct Metrics {
    reconcile_duration: Histogram,
    workflow_step_duration: Histogram,
    cluster_connectivity_errors: AtomicU64,
    /// Keyed by Application name so a later reconcile overwrites rather than accumulates.
    resource_tracker_entries: Mutex<std::collections::HashMap<String, i64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_reconcile_duration(&self, elapsed: std::time::Duration) {
        self.reconcile_duration.observe(elapsed);
    }

    pub fn record_workflow_step_duration(&self, elapsed: std::time::Duration) {
        self.workflow_step_duration.observe(elapsed);
    }

    pub fn inc_cluster_connectivity_errors(&self) {
        self.cluster_connectivity_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_resource_tracker_entries(&self, app: &str, count: i64) {
        self.resource_tracker_entries
            .lock()
            .expect("metrics lock is never poisoned")
            .insert(app.to_string(), count);
    }

    pub fn mean_reconcile_duration(&self) -> Option<std::time::Duration> {
        self.reconcile_duration.mean()
    }

    pub fn cluster_connectivity_error_count(&self) -> u64 {
        self.cluster_connectivity_errors.load(Ordering::Relaxed)
    }

    pub fn resource_tracker_entries_for(&self, app: &str) -> i64 {
        self.resource_tracker_entries
            .lock()
            .expect("metrics lock is never poisoned")
            .get(app)
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_is_none_before_any_observation() {
        let metrics = Metrics::new();
        assert!(metrics.mean_reconcile_duration().is_none());
    }

    #[test]
    fn mean_averages_observed_durations() {
        let metrics = Metrics::new();
        metrics.record_reconcile_duration(std::time::Duration::from_millis(100));
        metrics.record_reconcile_duration(std::time::Duration::from_millis(300));
        assert_eq!(
            metrics.mean_reconcile_duration(),
            Some(std::time::Duration::from_millis(200))
        );
    }

    #[test]
    fn tracker_entries_are_overwritten_per_application() {
        let metrics = Metrics::new();
        metrics.set_resource_tracker_entries("web", 3);
        metrics.set_resource_tracker_entries("web", 5);
        assert_eq!(metrics.resource_tracker_entries_for("web"), 5);
        assert_eq!(metrics.resource_tracker_entries_for("unknown"), 0);
    }
}

