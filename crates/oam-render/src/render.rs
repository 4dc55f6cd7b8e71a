//! `Render(component, definitions, context) -> {primary, extras} | RenderError` (spec.md §4.3).
use oam_definitions::store::{DefinitionKey, DefinitionStore};
use oam_shared::kvp::sets;
use oam_shared::kvp::ObjectLabels;
use oam_template::Context;
use oam_types::{Component, DefinitionKind};
use tracing::instrument;

use crate::error::{
    ComponentEvalSnafu, Error, PatchMergeSnafu, TaggingSnafu, TraitEvalSnafu,
    TraitNotApplicableSnafu, UndefinedComponentTypeSnafu, UndefinedTraitTypeSnafu,
};
use crate::manifest::Manifest;
use snafu::ResultExt;

/// The result of rendering one Component and its attached Traits.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOutput {
    pub primary: Manifest,
    pub extras: Vec<Manifest>,
}

#[instrument(skip(store, component, context), fields(component = %component.name))]
pub async fn render_component(
    store: &DefinitionStore,
    component: &Component,
    namespace: &str,
    context: &mut Context,
) -> Result<RenderOutput, Error> {
    let component_definition = store
        .get(DefinitionKey {
            kind: DefinitionKind::Component,
            namespace,
            name: &component.type_,
        })
        .await
        .context(UndefinedComponentTypeSnafu {
            component: component.name.clone(),
            type_: component.type_.clone(),
        })?;

    let template = oam_template::Template::new(
        component_definition.schematic.template.clone(),
        component_definition.schematic.parameter_schema.clone(),
        Default::default(),
    );

    let evaluation = template
        .evaluate_component(&component.properties, context)
        .context(ComponentEvalSnafu {
            component: component.name.clone(),
        })?;

    let mut primary_body = evaluation.output;
    let workload_kind = primary_body
        .get("kind")
        .and_then(serde_json::Value::as_str)
        .unwrap_or(&component.type_)
        .to_string();

    let mut extras = Vec::new();
    if let Some(outputs) = evaluation.outputs {
        extras.extend(extras_from_value(&component.name, None, outputs));
    }

    for component_trait in &component.traits {
        let trait_definition = store
            .get(DefinitionKey {
                kind: DefinitionKind::Trait,
                namespace,
                name: &component_trait.type_,
            })
            .await
            .context(UndefinedTraitTypeSnafu {
                component: component.name.clone(),
                trait_type: component_trait.type_.clone(),
            })?;

        if !trait_definition.applies_to_workloads.is_empty()
            && !trait_definition
                .applies_to_workloads
                .iter()
                .any(|allowed| allowed == &workload_kind)
        {
            return TraitNotApplicableSnafu {
                component: component.name.clone(),
                trait_type: component_trait.type_.clone(),
                workload_kind,
            }
            .fail();
        }

        context.output = Some(primary_body.clone());
        context.outputs = Some(serde_json::Value::Array(
            extras.iter().map(|manifest| manifest.body.clone()).collect(),
        ));

        let trait_template = oam_template::Template::new(
            trait_definition.schematic.template.clone(),
            trait_definition.schematic.parameter_schema.clone(),
            Default::default(),
        );
        let trait_evaluation = trait_template
            .evaluate_trait(&component_trait.properties, context)
            .context(TraitEvalSnafu {
                component: component.name.clone(),
                trait_type: component_trait.type_.clone(),
            })?;

        if let Some(patch) = trait_evaluation.patch {
            primary_body = oam_template::merge::merge(&primary_body, &patch, trait_template.patch_keys())
                .context(PatchMergeSnafu {
                    component: component.name.clone(),
                    trait_type: component_trait.type_.clone(),
                })?;
        }
        if let Some(outputs) = trait_evaluation.outputs {
            extras.extend(extras_from_value(
                &component.name,
                Some(component_trait.type_.clone()),
                outputs,
            ));
        }
    }

    let labels = sets::recommended(ObjectLabels {
        owner: &(),
        app_name: &context.app_name,
        component_name: &component.name,
        trait_type: None,
        revision_name: &context.app_revision,
        cluster: "local",
    })
    .context(TaggingSnafu {
        component: component.name.clone(),
    })?;
    tag(&mut primary_body, &labels);

    for extra in &mut extras {
        let extra_labels = sets::recommended(ObjectLabels {
            owner: &(),
            app_name: &context.app_name,
            component_name: &component.name,
            trait_type: extra.trait_type.as_deref(),
            revision_name: &context.app_revision,
            cluster: "local",
        })
        .context(TaggingSnafu {
            component: component.name.clone(),
        })?;
        tag(&mut extra.body, &extra_labels);
    }

    Ok(RenderOutput {
        primary: Manifest {
            body: primary_body,
            component_name: component.name.clone(),
            trait_type: None,
        },
        extras,
    })
}

fn extras_from_value(
    component_name: &str,
    trait_type: Option<String>,
    outputs: serde_json::Value,
) -> Vec<Manifest> {
    match outputs {
        serde_json::Value::Object(named) => named
            .into_values()
            .map(|body| Manifest {
                body,
                component_name: component_name.to_string(),
                trait_type: trait_type.clone(),
            })
            .collect(),
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|body| Manifest {
                body,
                component_name: component_name.to_string(),
                trait_type: trait_type.clone(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn tag(body: &mut serde_json::Value, labels: &oam_shared::kvp::Labels) {
    let Some(object) = body.as_object_mut() else {
        return;
    };
    let metadata = object
        .entry("metadata")
        .or_insert_with(|| serde_json::json!({}));
    let Some(metadata) = metadata.as_object_mut() else {
        return;
    };
    let label_map = metadata
        .entry("labels")
        .or_insert_with(|| serde_json::json!({}));
    if let Some(label_map) = label_map.as_object_mut() {
        for (key, value) in labels.iter() {
            label_map.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        }
    }
}
