//! Executes a garbage-collection plan: deletes the entries a `garbage-collect` rule says to
//! delete now, in the configured order, stopping on the first failure when ordering matters
//! (spec.md §4.7 step 3, §7 "never advance past the failure in `order: dependency` mode").
use async_trait::async_trait;
use oam_policy::garbage_collect::{DeletionOrder, GarbageCollectPolicy};
use oam_types::ResourceTrackerEntry;
use tracing::info;

use crate::diff::delta_applied;
use crate::error::Error;
use crate::gc::{self, Disposition};

/// Deletes one tracked resource from its cluster. Implemented by the controller over
/// `oam-dispatch`'s client pool; this crate only decides *what* to delete and in what order.
#[async_trait]
pub trait ResourceDeleter: Send + Sync {
    async fn delete(&self, entry: &ResourceTrackerEntry) -> Result<(), Error>;
}

/// What happened to the entries considered for recycling.
#[derive(Debug, Default)]
pub struct RecycleOutcome {
    pub deleted: Vec<ResourceTrackerEntry>,
    pub retained: Vec<ResourceTrackerEntry>,
    pub forgotten: Vec<ResourceTrackerEntry>,
}

/// Recycles the entries in `current` that `new` no longer applies (spec.md §4.7 steps 1-3).
///
/// Returns the resulting split even if a deletion fails partway through; the caller decides
/// whether to requeue. In `order: dependency`/`reverseDependency` mode, recycling stops at the
/// first failed deletion so later entries aren't deleted out of order.
pub async fn recycle_on_revision_change(
    current: &[ResourceTrackerEntry],
    new: &[ResourceTrackerEntry],
    policy: &GarbageCollectPolicy,
    deleter: &dyn ResourceDeleter,
) -> (RecycleOutcome, Option<Error>) {
    let dropped = delta_applied(current, new);
    recycle(&dropped, policy, deleter, false).await
}

/// Recycles every entry still held by a tracker whose owning Application is being deleted
/// (spec.md §4.7 step 4): every entry is considered dropped, regardless of revision, and
/// `onAppDelete` entries are deleted now rather than retained.
pub async fn recycle_on_app_delete(
    entries: &[ResourceTrackerEntry],
    policy: &GarbageCollectPolicy,
    deleter: &dyn ResourceDeleter,
) -> (RecycleOutcome, Option<Error>) {
    let dropped: Vec<&ResourceTrackerEntry> = entries.iter().collect();
    recycle(&dropped, policy, deleter, true).await
}

async fn recycle(
    dropped: &[&ResourceTrackerEntry],
    policy: &GarbageCollectPolicy,
    deleter: &dyn ResourceDeleter,
    app_deleting: bool,
) -> (RecycleOutcome, Option<Error>) {
    let planned = gc::plan(dropped, policy, app_deleting);
    let ordered = gc::order_for_deletion(planned, policy.order);

    let mut outcome = RecycleOutcome::default();
    let stop_on_failure = policy.order != DeletionOrder::Unconstrained;

    for (entry, disposition) in ordered {
        match disposition {
            Disposition::DeleteNow => match deleter.delete(entry).await {
                Ok(()) => {
                    info!(name = %entry.name, kind = %entry.kind, cluster = %entry.cluster, "recycled tracker entry");
                    outcome.deleted.push(entry.clone());
                }
                Err(source) => {
                    if stop_on_failure {
                        return (outcome, Some(source));
                    }
                    outcome.retained.push(entry.clone());
                }
            },
            Disposition::KeepUntilAppDelete | Disposition::KeepForever => {
                outcome.retained.push(entry.clone());
            }
            Disposition::ForgetButKeep => {
                outcome.forgotten.push(entry.clone());
            }
        }
    }

    (outcome, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oam_types::{Creator, GcRule, GcStrategy, Selector};
    use std::sync::Mutex;

    fn entry(name: &str) -> ResourceTrackerEntry {
        ResourceTrackerEntry {
            cluster: "local".to_string(),
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            namespace: Some("default".to_string()),
            name: name.to_string(),
            component_name: "web".to_string(),
            trait_type: None,
            creator: Creator::Component,
            created: true,
            shared: false,
        }
    }

    struct RecordingDeleter {
        calls: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl ResourceDeleter for RecordingDeleter {
        async fn delete(&self, entry: &ResourceTrackerEntry) -> Result<(), Error> {
            self.calls.lock().unwrap().push(entry.name.clone());
            if self.fail_on.as_deref() == Some(entry.name.as_str()) {
                return Err(Error::Delete {
                    cluster: entry.cluster.clone(),
                    kind: entry.kind.clone(),
                    name: entry.name.clone(),
                    source: "boom".into(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn default_policy_deletes_every_dropped_entry() {
        let current = vec![entry("a"), entry("b")];
        let new = vec![];
        let deleter = RecordingDeleter {
            calls: Mutex::new(vec![]),
            fail_on: None,
        };
        let (outcome, err) =
            recycle_on_revision_change(&current, &new, &GarbageCollectPolicy::default(), &deleter).await;
        assert!(err.is_none());
        assert_eq!(outcome.deleted.len(), 2);
    }

    #[tokio::test]
    async fn dependency_order_stops_at_the_first_failure() {
        let current = vec![entry("a"), entry("b"), entry("c")];
        let new = vec![];
        let deleter = RecordingDeleter {
            calls: Mutex::new(vec![]),
            fail_on: Some("b".to_string()),
        };
        let policy = GarbageCollectPolicy {
            order: DeletionOrder::Dependency,
            ..Default::default()
        };
        let (outcome, err) = recycle_on_revision_change(&current, &new, &policy, &deleter).await;
        assert!(err.is_some());
        assert_eq!(outcome.deleted, vec![entry("a")]);
        assert_eq!(deleter.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn on_app_delete_entries_are_deleted_when_the_app_itself_is_removed() {
        let entries = vec![entry("a")];
        let policy = GarbageCollectPolicy {
            rules: vec![GcRule {
                selector: Selector::default(),
                strategy: GcStrategy::OnAppDelete,
            }],
            ..Default::default()
        };
        let deleter = RecordingDeleter {
            calls: Mutex::new(vec![]),
            fail_on: None,
        };
        let (outcome, err) = recycle_on_app_delete(&entries, &policy, &deleter).await;
        assert!(err.is_none());
        assert_eq!(outcome.deleted.len(), 1);
        assert!(outcome.retained.is_empty());
    }

    #[tokio::test]
    async fn on_app_delete_never_strategy_entries_are_still_retained() {
        let entries = vec![entry("a")];
        let policy = GarbageCollectPolicy {
            rules: vec![GcRule {
                selector: Selector::default(),
                strategy: GcStrategy::Never,
            }],
            keep_legacy_resource: true,
            ..Default::default()
        };
        let deleter = RecordingDeleter {
            calls: Mutex::new(vec![]),
            fail_on: None,
        };
        let (outcome, _err) = recycle_on_app_delete(&entries, &policy, &deleter).await;
        assert!(outcome.deleted.is_empty());
        assert_eq!(outcome.retained.len(), 1);
    }
}
