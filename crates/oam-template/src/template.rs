//! The `Template` type and the three evaluation entry points spec.md §4.2 names: Components
//! produce `output`/`outputs`, Traits produce `patch`/`outputs`, Application-scoped Policies
//! produce `components`/`workflow`/`policies`/`labels`/`annotations`/`ctx` deltas.
use serde_json::Value;

use crate::context::Context;
use crate::error::Error;
use crate::merge::PatchKeys;
use crate::path::{substitute, TemplateRoots};
use crate::schema;

/// A Definition's `schematic.template`, already parsed out of its resolved JSON body.
#[derive(Clone, Debug)]
pub struct Template {
    body: Value,
    parameter_schema: Option<Value>,
    patch_keys: PatchKeys,
}

impl Template {
    pub fn new(body: Value, parameter_schema: Option<Value>, patch_keys: PatchKeys) -> Self {
        Self {
            body,
            parameter_schema,
            patch_keys,
        }
    }

    pub fn patch_keys(&self) -> &PatchKeys {
        &self.patch_keys
    }

    fn validate_and_substitute(&self, parameter: &Value, context: &Context) -> Result<Value, Error> {
        if let Some(schema) = &self.parameter_schema {
            schema::validate(parameter, schema)?;
        }
        let roots = TemplateRoots {
            parameter,
            context: &context.to_value(),
        };
        substitute(&self.body, &roots)
    }

    /// Evaluates a Component Definition's template: `parameter = component.properties`.
    pub fn evaluate_component(
        &self,
        parameter: &Value,
        context: &Context,
    ) -> Result<ComponentEvaluation, Error> {
        let evaluated = self.validate_and_substitute(parameter, context)?;
        Ok(ComponentEvaluation {
            output: field(&evaluated, "output").unwrap_or(evaluated.clone()),
            outputs: field(&evaluated, "outputs"),
        })
    }

    /// Evaluates a Trait Definition's template: `context.output`/`context.outputs` expose the
    /// component's already-rendered manifests.
    pub fn evaluate_trait(
        &self,
        parameter: &Value,
        context: &Context,
    ) -> Result<TraitEvaluation, Error> {
        let evaluated = self.validate_and_substitute(parameter, context)?;
        Ok(TraitEvaluation {
            patch: field(&evaluated, "patch"),
            outputs: field(&evaluated, "outputs"),
        })
    }

    /// Evaluates an Application-scoped Policy Definition's template.
    pub fn evaluate_policy(
        &self,
        parameter: &Value,
        context: &Context,
    ) -> Result<PolicyEvaluation, Error> {
        let evaluated = self.validate_and_substitute(parameter, context)?;
        Ok(PolicyEvaluation {
            components: field(&evaluated, "components"),
            workflow: field(&evaluated, "workflow"),
            policies: field(&evaluated, "policies"),
            labels: field(&evaluated, "labels"),
            annotations: field(&evaluated, "annotations"),
            ctx: field(&evaluated, "ctx"),
        })
    }
}

fn field(evaluated: &Value, name: &str) -> Option<Value> {
    evaluated.get(name).cloned()
}

/// What a Component Definition's template evaluation yields (spec.md §4.2).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComponentEvaluation {
    pub output: Value,
    pub outputs: Option<Value>,
}

/// What a Trait Definition's template evaluation yields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TraitEvaluation {
    pub patch: Option<Value>,
    pub outputs: Option<Value>,
}

/// What an Application-scoped Policy Definition's template evaluation yields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolicyEvaluation {
    pub components: Option<Value>,
    pub workflow: Option<Value>,
    pub policies: Option<Value>,
    pub labels: Option<Value>,
    pub annotations: Option<Value>,
    pub ctx: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> Context {
        Context {
            name: "nginx".to_string(),
            app_name: "web".to_string(),
            namespace: "default".to_string(),
            app_revision: "web-v1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn component_template_substitutes_parameter_into_output() {
        let template = Template::new(
            json!({
                "output": {
                    "apiVersion": "v1",
                    "kind": "Pod",
                    "metadata": {"name": "{{ context.name }}"},
                    "spec": {"containers": [{"image": "{{ parameter.image }}"}]}
                }
            }),
            Some(json!({"required": ["image"]})),
            PatchKeys::new(),
        );
        let evaluation = template
            .evaluate_component(&json!({"image": "nginx:1.21"}), &ctx())
            .unwrap();
        assert_eq!(evaluation.output["metadata"]["name"], json!("nginx"));
        assert_eq!(
            evaluation.output["spec"]["containers"][0]["image"],
            json!("nginx:1.21")
        );
    }

    #[test]
    fn component_template_rejects_parameter_missing_required_field() {
        let template = Template::new(
            json!({"output": {}}),
            Some(json!({"required": ["image"]})),
            PatchKeys::new(),
        );
        assert!(template.evaluate_component(&json!({}), &ctx()).is_err());
    }

    #[test]
    fn trait_template_reads_component_output_from_context() {
        let template = Template::new(
            json!({"patch": {"spec": {"replicas": "{{ parameter.replicas }}"}}}),
            None,
            PatchKeys::new(),
        );
        let mut context = ctx();
        context.output = Some(json!({"spec": {"replicas": 1}}));
        let evaluation = template
            .evaluate_trait(&json!({"replicas": 3}), &context)
            .unwrap();
        assert_eq!(evaluation.patch.unwrap()["spec"]["replicas"], json!(3));
    }

    #[test]
    fn policy_template_produces_label_delta() {
        let template = Template::new(
            json!({"labels": {"env": "{{ parameter.env }}"}}),
            None,
            PatchKeys::new(),
        );
        let evaluation = template
            .evaluate_policy(&json!({"env": "prod"}), &ctx())
            .unwrap();
        assert_eq!(evaluation.labels.unwrap()["env"], json!("prod"));
    }
}
