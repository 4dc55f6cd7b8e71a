//! `shared-resource` (spec.md §3, §4.4): declares matching resources shareable across
//! Applications. Ownership itself (the sharer list, join order, first-sharer mutation rights) is
//! tracked per-resource by the Resource Tracker (C7); this policy only decides which resources
//! are eligible.
use serde::Deserialize;

use oam_types::Selector;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedResourcePolicy {
    #[serde(default)]
    pub selector: Selector,
}
