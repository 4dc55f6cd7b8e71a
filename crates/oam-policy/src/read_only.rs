//! `read-only` (spec.md §4.4): matching resources must pre-exist and are never mutated or
//! garbage-collected by this Application.
use serde::Deserialize;

use oam_types::Selector;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOnlyPolicy {
    #[serde(default)]
    pub selector: Selector,
}
