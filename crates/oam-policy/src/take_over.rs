//! `take-over` (spec.md §4.4): matching orphan resources (owned by no Application) become owned
//! by this Application on next apply.
use serde::Deserialize;

use oam_types::Selector;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeOverPolicy {
    #[serde(default)]
    pub selector: Selector,
}
