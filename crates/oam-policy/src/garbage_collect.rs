//! `garbage-collect` (spec.md §4.4, §4.7): maps resource selectors to GC strategies and controls
//! deletion ordering on revision change.
use serde::Deserialize;

use oam_types::GcRule;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DeletionOrder {
    #[default]
    Unconstrained,
    Dependency,
    ReverseDependency,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarbageCollectPolicy {
    #[serde(default)]
    pub rules: Vec<GcRule>,

    #[serde(default)]
    pub order: DeletionOrder,

    /// Disables automatic cleanup of outdated tracker revisions whose entries are all `never`.
    #[serde(default)]
    pub keep_legacy_resource: bool,
}

impl GarbageCollectPolicy {
    /// Returns the first matching rule's strategy, defaulting to `onAppUpdate` when no rule
    /// matches (spec.md §4.4).
    pub fn strategy_for(&self, candidate: &oam_types::SelectorCandidate<'_>) -> oam_types::GcStrategy {
        self.rules
            .iter()
            .find(|rule| rule.selector.matches(candidate))
            .map(|rule| rule.strategy)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oam_types::{GcStrategy, Selector, SelectorCandidate};

    #[test]
    fn first_matching_rule_wins() {
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
        let strategy = policy.strategy_for(&SelectorCandidate {
            trait_type: Some("expose"),
            ..Default::default()
        });
        assert_eq!(strategy, GcStrategy::OnAppDelete);
    }

    #[test]
    fn unmatched_candidate_defaults_to_on_app_update() {
        let policy = GarbageCollectPolicy::default();
        let strategy = policy.strategy_for(&SelectorCandidate::default());
        assert_eq!(strategy, GcStrategy::OnAppUpdate);
    }
}
