//! `override` (spec.md §4.4): patches named components' `properties`/`traits` before rendering.
use serde::Deserialize;

use crate::error::{Error, UnknownComponentSnafu};

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitOverride {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default)]
    pub properties: Option<serde_json::Value>,

    #[serde(default)]
    pub disable: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentOverride {
    pub name: String,

    #[serde(default)]
    pub properties: Option<serde_json::Value>,

    #[serde(default)]
    pub traits: Vec<TraitOverride>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverridePolicy {
    #[serde(default)]
    pub components: Vec<ComponentOverride>,
}

impl OverridePolicy {
    /// Applies every `ComponentOverride` in order, merging `properties` and patching/removing
    /// traits; `disable: true` on a trait override removes that trait entirely.
    pub fn apply(&self, policy_name: &str, components: &mut [oam_types::Component]) -> Result<(), Error> {
        for component_override in &self.components {
            let component = components
                .iter_mut()
                .find(|c| c.name == component_override.name)
                .ok_or_else(|| {
                    UnknownComponentSnafu {
                        name: policy_name.to_string(),
                        component: component_override.name.clone(),
                    }
                    .build()
                })?;

            if let Some(properties) = &component_override.properties {
                merge_properties(&mut component.properties, properties);
            }

            for trait_override in &component_override.traits {
                if trait_override.disable {
                    component.traits.retain(|t| t.type_ != trait_override.type_);
                    continue;
                }
                if let Some(existing) = component
                    .traits
                    .iter_mut()
                    .find(|t| t.type_ == trait_override.type_)
                {
                    if let Some(properties) = &trait_override.properties {
                        merge_properties(&mut existing.properties, properties);
                    }
                } else if let Some(properties) = &trait_override.properties {
                    component.traits.push(oam_types::Trait {
                        type_: trait_override.type_.clone(),
                        properties: properties.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn merge_properties(base: &mut serde_json::Value, patch: &serde_json::Value) {
    if let (Some(base_object), Some(patch_object)) = (base.as_object_mut(), patch.as_object()) {
        for (key, value) in patch_object {
            base_object.insert(key.clone(), value.clone());
        }
    } else {
        *base = patch.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oam_types::Component;

    fn component(name: &str) -> Component {
        Component {
            name: name.to_string(),
            type_: "webservice".to_string(),
            properties: serde_json::json!({"image": "nginx:1.21"}),
            traits: vec![],
            depends_on: vec![],
            inputs: vec![],
            outputs: vec![],
        }
    }

    #[test]
    fn overrides_component_properties() {
        let policy = OverridePolicy {
            components: vec![ComponentOverride {
                name: "nginx".to_string(),
                properties: Some(serde_json::json!({"image": "nginx:1.22"})),
                traits: vec![],
            }],
        };
        let mut components = vec![component("nginx")];
        policy.apply("prod-override", &mut components).unwrap();
        assert_eq!(components[0].properties["image"], serde_json::json!("nginx:1.22"));
    }

    #[test]
    fn disabled_trait_override_removes_the_trait() {
        let mut nginx = component("nginx");
        nginx.traits.push(oam_types::Trait {
            type_: "scaler".to_string(),
            properties: serde_json::json!({"replicas": 3}),
        });
        let policy = OverridePolicy {
            components: vec![ComponentOverride {
                name: "nginx".to_string(),
                properties: None,
                traits: vec![TraitOverride {
                    type_: "scaler".to_string(),
                    properties: None,
                    disable: true,
                }],
            }],
        };
        let mut components = vec![nginx];
        policy.apply("prod-override", &mut components).unwrap();
        assert!(components[0].traits.is_empty());
    }

    #[test]
    fn unknown_component_is_an_error() {
        let policy = OverridePolicy {
            components: vec![ComponentOverride {
                name: "missing".to_string(),
                properties: None,
                traits: vec![],
            }],
        };
        let mut components = vec![component("nginx")];
        assert!(policy.apply("prod-override", &mut components).is_err());
    }
}
