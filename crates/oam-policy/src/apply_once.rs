//! `apply-once` (spec.md §4.4): allows configuration drift on matching resources (or matched
//! field paths within them); they are applied once and not reconciled thereafter.
use serde::Deserialize;

use oam_types::Selector;

/// When the policy is honored (spec.md §4.4).
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Affect {
    #[default]
    OnUpdate,
    OnStateKeep,
    Always,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOncePolicy {
    #[serde(default)]
    pub selector: Selector,

    #[serde(default)]
    pub affect: Affect,

    /// Field paths (dot notation) the policy is scoped to; empty means the whole resource.
    #[serde(default)]
    pub paths: Vec<String>,
}

impl ApplyOncePolicy {
    /// `Open Question` resolution (spec.md §9): on `Affect::Always`, a field is re-applied only
    /// when it falls outside `paths` — i.e. the apply-once guard never blocks an edit to a field
    /// it doesn't name.
    pub fn blocks_field(&self, field_path: &str) -> bool {
        match self.affect {
            Affect::Always => self.paths.is_empty() || self.paths.iter().any(|p| p == field_path),
            Affect::OnUpdate | Affect::OnStateKeep => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_affect_only_blocks_named_paths() {
        let policy = ApplyOncePolicy {
            affect: Affect::Always,
            paths: vec!["spec.replicas".to_string()],
            ..Default::default()
        };
        assert!(policy.blocks_field("spec.replicas"));
        assert!(!policy.blocks_field("spec.image"));
    }

    #[test]
    fn on_update_blocks_everything() {
        let policy = ApplyOncePolicy {
            affect: Affect::OnUpdate,
            ..Default::default()
        };
        assert!(policy.blocks_field("anything"));
    }
}
