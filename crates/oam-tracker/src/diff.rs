//! Diffing two revisions' tracker entries (spec.md §4.7 step 1: `ΔApplied = currentRevision.entries
//! \ newRevision.entries`).
use oam_types::ResourceTrackerEntry;

/// The identity a [`ResourceTrackerEntry`] is deduplicated by: a resource is the same tracked
/// object across revisions iff these fields match (renaming a resource is delete-then-recreate,
/// per spec.md §4.7's invariant).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct EntryKey<'a> {
    cluster: &'a str,
    api_version: &'a str,
    kind: &'a str,
    namespace: Option<&'a str>,
    name: &'a str,
}

fn key(entry: &ResourceTrackerEntry) -> EntryKey<'_> {
    EntryKey {
        cluster: &entry.cluster,
        api_version: &entry.api_version,
        kind: &entry.kind,
        namespace: entry.namespace.as_deref(),
        name: &entry.name,
    }
}

/// Returns the entries present in `current` but absent from `new` — the resources the new
/// revision no longer applies and that are therefore GC candidates.
pub fn delta_applied<'a>(
    current: &'a [ResourceTrackerEntry],
    new: &'a [ResourceTrackerEntry],
) -> Vec<&'a ResourceTrackerEntry> {
    let new_keys: std::collections::BTreeSet<EntryKey<'a>> = new.iter().map(key).collect();
    current.iter().filter(|entry| !new_keys.contains(&key(entry))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oam_types::Creator;

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

    #[test]
    fn entries_dropped_from_the_new_revision_are_the_delta() {
        let current = vec![entry("a"), entry("b")];
        let new = vec![entry("b")];
        let delta = delta_applied(&current, &new);
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].name, "a");
    }

    #[test]
    fn identical_revisions_have_no_delta() {
        let current = vec![entry("a")];
        let new = vec![entry("a")];
        assert!(delta_applied(&current, &new).is_empty());
    }

    #[test]
    fn renaming_a_resource_is_delete_then_recreate() {
        let current = vec![entry("old-name")];
        let new = vec![entry("new-name")];
        let delta = delta_applied(&current, &new);
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].name, "old-name");
    }
}
