//! A cache keyed by `(kind, namespace, name, resourceVersion)` so repeated renders of the same
//! revision don't re-fetch Definitions from the API server (spec.md §4.1). Invalidation is
//! event-driven: callers wire a `kube::runtime::watcher` stream over each Definition kind and
//! call [`DefinitionCache::invalidate`] on every watch event.
use std::collections::HashMap;
use std::sync::RwLock;

use oam_types::DefinitionKind;

use crate::store::ResolvedDefinition;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    kind: DefinitionKind,
    namespace: String,
    name: String,
}

#[derive(Debug, Default)]
pub struct DefinitionCache {
    entries: RwLock<HashMap<CacheKey, (String, ResolvedDefinition)>>,
}

impl DefinitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached definition only if its `resourceVersion` still matches.
    pub fn get(
        &self,
        kind: DefinitionKind,
        namespace: &str,
        name: &str,
        resource_version: &str,
    ) -> Option<ResolvedDefinition> {
        let key = CacheKey {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        };
        let entries = self.entries.read().expect("cache lock poisoned");
        entries.get(&key).and_then(|(cached_version, definition)| {
            (cached_version == resource_version).then(|| definition.clone())
        })
    }

    /// Returns whatever is cached for `(kind, namespace, name)` regardless of `resourceVersion`,
    /// so a lookup that doesn't already know the live object's version (every call before it's
    /// fetched at least once) can still dedupe repeated resolves within one tick. Safe because
    /// invalidation is event-driven: a watcher stream calls [`DefinitionCache::invalidate`] on
    /// every add/modify/delete, so a hit here is never staler than the last watch event.
    pub fn get_any(&self, kind: DefinitionKind, namespace: &str, name: &str) -> Option<ResolvedDefinition> {
        let key = CacheKey {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        };
        let entries = self.entries.read().expect("cache lock poisoned");
        entries.get(&key).map(|(_, definition)| definition.clone())
    }

    pub fn insert(
        &self,
        kind: DefinitionKind,
        namespace: &str,
        name: &str,
        resource_version: String,
        definition: ResolvedDefinition,
    ) {
        let key = CacheKey {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        };
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(key, (resource_version, definition));
    }

    /// Drops any cached entry for `(kind, namespace, name)` regardless of its resource version,
    /// called from the watcher stream on add/modify/delete events.
    pub fn invalidate(&self, kind: DefinitionKind, namespace: &str, name: &str) {
        let key = CacheKey {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        };
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oam_types::{Attributes, Schematic};

    fn sample() -> ResolvedDefinition {
        ResolvedDefinition {
            attributes: Attributes::default(),
            applies_to_workloads: vec![],
            schematic: Schematic {
                template: serde_json::json!({}),
                parameter_schema: None,
            },
        }
    }

    #[test]
    fn stale_resource_version_misses() {
        let cache = DefinitionCache::new();
        cache.insert(
            DefinitionKind::Component,
            "default",
            "webservice",
            "1".to_string(),
            sample(),
        );
        assert!(cache
            .get(DefinitionKind::Component, "default", "webservice", "2")
            .is_none());
        assert!(cache
            .get(DefinitionKind::Component, "default", "webservice", "1")
            .is_some());
    }

    #[test]
    fn get_any_ignores_resource_version() {
        let cache = DefinitionCache::new();
        cache.insert(
            DefinitionKind::Component,
            "default",
            "webservice",
            "1".to_string(),
            sample(),
        );
        assert!(cache.get_any(DefinitionKind::Component, "default", "webservice").is_some());
    }

    #[test]
    fn get_any_misses_after_invalidate() {
        let cache = DefinitionCache::new();
        cache.insert(
            DefinitionKind::Component,
            "default",
            "webservice",
            "1".to_string(),
            sample(),
        );
        cache.invalidate(DefinitionKind::Component, "default", "webservice");
        assert!(cache.get_any(DefinitionKind::Component, "default", "webservice").is_none());
    }

    #[test]
    fn invalidate_drops_regardless_of_version() {
        let cache = DefinitionCache::new();
        cache.insert(
            DefinitionKind::Trait,
            "default",
            "expose",
            "7".to_string(),
            sample(),
        );
        cache.invalidate(DefinitionKind::Trait, "default", "expose");
        assert!(cache
            .get(DefinitionKind::Trait, "default", "expose", "7")
            .is_none());
    }
}
