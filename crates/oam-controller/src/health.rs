//! Aggregates per-manifest apply outcomes into the component/trait health reported under
//! `status.services[]` (spec.md §6). Health here means "did server-side apply succeed", not a
//! live readiness-condition poll or a Definition health-check template evaluation — neither is
//! modeled anywhere else in this codebase, so this is a deliberate simplification (see
//! DESIGN.md).
use std::collections::BTreeMap;

use oam_types::{ServiceStatus, TraitStatus};

/// One manifest's apply result, already resolved to a single healthy/unhealthy verdict by the
/// caller (an `Ok(ApplyOutcome::Applied { .. })` is healthy; anything else, including a skip or
/// a dispatch error, is not).
#[derive(Clone)]
pub struct ManifestHealth {
    pub component_name: String,
    pub trait_type: Option<String>,
    pub healthy: bool,
    pub message: Option<String>,
}

/// Rolls per-manifest health up to one [`ServiceStatus`] per component, preserving the order
/// components were first seen in.
pub fn aggregate(manifests: &[ManifestHealth]) -> Vec<ServiceStatus> {
    let mut order: Vec<String> = Vec::new();
    let mut by_component: BTreeMap<String, ServiceStatus> = BTreeMap::new();

    for manifest in manifests {
        if !by_component.contains_key(&manifest.component_name) {
            order.push(manifest.component_name.clone());
            by_component.insert(
                manifest.component_name.clone(),
                ServiceStatus {
                    name: manifest.component_name.clone(),
                    healthy: true,
                    traits: Vec::new(),
                    message: None,
                },
            );
        }
        let status = by_component
            .get_mut(&manifest.component_name)
            .expect("just inserted above");

        if let Some(trait_type) = &manifest.trait_type {
            status.traits.push(TraitStatus {
                type_: trait_type.clone(),
                healthy: manifest.healthy,
            });
        }
        status.healthy = status.healthy && manifest.healthy;
        if !manifest.healthy && status.message.is_none() {
            status.message = manifest.message.clone();
        }
    }

    order
        .into_iter()
        .filter_map(|name| by_component.remove(&name))
        .collect()
}
