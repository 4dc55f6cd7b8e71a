//! Resolves the governing `garbage-collect` rule for each dropped entry and decides what happens
//! to it (spec.md §4.7 step 2-3).
use oam_policy::garbage_collect::{DeletionOrder, GarbageCollectPolicy};
use oam_types::{GcStrategy, ResourceTrackerEntry, SelectorCandidate};

/// What to do with one entry that `new` no longer applies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// `onAppUpdate`: delete now.
    DeleteNow,
    /// `onAppDelete`: leave in the tracker, deleted only when the Application itself is removed.
    KeepUntilAppDelete,
    /// `never`, kept in the tracker (`keepLegacyResource=true` or no explicit rule says
    /// otherwise).
    KeepForever,
    /// `never` with `keepLegacyResource=false`: the resource is left alone but dropped from the
    /// tracker's bookkeeping.
    ForgetButKeep,
}

fn candidate(entry: &ResourceTrackerEntry) -> SelectorCandidate<'_> {
    SelectorCandidate {
        component_name: Some(&entry.component_name),
        trait_type: entry.trait_type.as_deref(),
        resource_type: Some(&entry.kind),
        resource_name: Some(&entry.name),
        ..Default::default()
    }
}

/// Resolves each dropped entry's disposition under `policy`.
///
/// `app_deleting` is `true` only when the owning Application itself is being removed (spec.md
/// §4.7 step 4): `onAppDelete` means "deleted when the app is deleted", so at that point it
/// resolves to `DeleteNow` rather than `KeepUntilAppDelete`. `never` is unaffected — it's kept
/// (or forgotten) regardless of why the entry was dropped.
pub fn plan<'a>(
    dropped: &[&'a ResourceTrackerEntry],
    policy: &GarbageCollectPolicy,
    app_deleting: bool,
) -> Vec<(&'a ResourceTrackerEntry, Disposition)> {
    dropped
        .iter()
        .map(|entry| {
            let strategy = policy.strategy_for(&candidate(entry));
            let disposition = match strategy {
                GcStrategy::OnAppUpdate => Disposition::DeleteNow,
                GcStrategy::OnAppDelete if app_deleting => Disposition::DeleteNow,
                GcStrategy::OnAppDelete => Disposition::KeepUntilAppDelete,
                GcStrategy::Never if policy.keep_legacy_resource => Disposition::KeepForever,
                GcStrategy::Never => Disposition::ForgetButKeep,
            };
            (*entry, disposition)
        })
        .collect()
}

/// Orders entries slated for deletion per `order` (spec.md §4.7 step 3).
///
/// `Unconstrained` leaves the caller-supplied order untouched. `Dependency` deletes in the same
/// order entries were originally applied (the order they appear in the tracker). `Reverse
/// Dependency` deletes in the opposite order.
pub fn order_for_deletion<T>(mut entries: Vec<T>, order: DeletionOrder) -> Vec<T> {
    if order == DeletionOrder::ReverseDependency {
        entries.reverse();
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use oam_types::{Creator, GcRule, Selector};

    fn entry(name: &str, trait_type: Option<&str>) -> ResourceTrackerEntry {
        ResourceTrackerEntry {
            cluster: "local".to_string(),
            api_version: "v1".to_string(),
            kind: "Service".to_string(),
            namespace: Some("default".to_string()),
            name: name.to_string(),
            component_name: "web".to_string(),
            trait_type: trait_type.map(str::to_string),
            creator: Creator::Component,
            created: true,
            shared: false,
        }
    }

    #[test]
    fn unmatched_entries_default_to_delete_now() {
        let e = entry("a", None);
        let dropped = vec![&e];
        let result = plan(&dropped, &GarbageCollectPolicy::default(), false);
        assert_eq!(result[0].1, Disposition::DeleteNow);
    }

    #[test]
    fn on_app_delete_rule_keeps_the_entry_until_app_delete() {
        let e = entry("a", Some("expose"));
        let dropped = vec![&e];
        let policy = GarbageCollectPolicy {
            rules: vec![GcRule {
                selector: Selector {
                    trait_types: Some(vec!["expose".to_string()]),
                    ..Default::default()
                },
                strategy: GcStrategy::OnAppDelete,
            }],
            ..Default::default()
        };
        let result = plan(&dropped, &policy, false);
        assert_eq!(result[0].1, Disposition::KeepUntilAppDelete);
    }

    #[test]
    fn on_app_delete_rule_deletes_now_when_the_app_itself_is_deleted() {
        let e = entry("a", Some("expose"));
        let dropped = vec![&e];
        let policy = GarbageCollectPolicy {
            rules: vec![GcRule {
                selector: Selector {
                    trait_types: Some(vec!["expose".to_string()]),
                    ..Default::default()
                },
                strategy: GcStrategy::OnAppDelete,
            }],
            ..Default::default()
        };
        let result = plan(&dropped, &policy, true);
        assert_eq!(result[0].1, Disposition::DeleteNow);
    }

    #[test]
    fn never_without_keep_legacy_resource_forgets_the_entry() {
        let e = entry("a", None);
        let dropped = vec![&e];
        let policy = GarbageCollectPolicy {
            rules: vec![GcRule {
                selector: Selector::default(),
                strategy: GcStrategy::Never,
            }],
            keep_legacy_resource: false,
            ..Default::default()
        };
        let result = plan(&dropped, &policy, false);
        assert_eq!(result[0].1, Disposition::ForgetButKeep);
    }

    #[test]
    fn never_is_kept_even_when_the_app_itself_is_deleted() {
        let e = entry("a", None);
        let dropped = vec![&e];
        let policy = GarbageCollectPolicy {
            rules: vec![GcRule {
                selector: Selector::default(),
                strategy: GcStrategy::Never,
            }],
            keep_legacy_resource: true,
            ..Default::default()
        };
        let result = plan(&dropped, &policy, true);
        assert_eq!(result[0].1, Disposition::KeepForever);
    }

    #[test]
    fn never_with_keep_legacy_resource_keeps_forever() {
        let e = entry("a", None);
        let dropped = vec![&e];
        let policy = GarbageCollectPolicy {
            rules: vec![GcRule {
                selector: Selector::default(),
                strategy: GcStrategy::Never,
            }],
            keep_legacy_resource: true,
            ..Default::default()
        };
        let result = plan(&dropped, &policy, false);
        assert_eq!(result[0].1, Disposition::KeepForever);
    }

    #[test]
    fn reverse_dependency_order_reverses_applied_order() {
        let ordered = order_for_deletion(vec!["a", "b", "c"], DeletionOrder::ReverseDependency);
        assert_eq!(ordered, vec!["c", "b", "a"]);
    }

    #[test]
    fn unconstrained_order_is_unchanged() {
        let ordered = order_for_deletion(vec!["a", "b"], DeletionOrder::Unconstrained);
        assert_eq!(ordered, vec!["a", "b"]);
    }
}
