//! Schema helpers for CRD fields whose shape isn't known until runtime: a component's
//! `properties`, a trait's patch document, a workflow step's `valueFrom`/`inputs`. These are all
//! opaque JSON as far as the Kubernetes API server is concerned.
use schemars::Schema;

pub fn raw_object_schema(_: &mut schemars::SchemaGenerator) -> Schema {
    schemars::json_schema!({
        "type": "object",
        "x-kubernetes-preserve-unknown-fields": true,
    })
}

pub fn raw_object_list_schema(_: &mut schemars::SchemaGenerator) -> Schema {
    schemars::json_schema!({
        "type": "array",
        "items": {
            "type": "object",
            "x-kubernetes-preserve-unknown-fields": true,
        }
    })
}

#[cfg(test)]
mod tests {
    use schemars::JsonSchema;
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    use super::*;

    #[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Test {
        #[schemars(schema_with = "raw_object_schema")]
        #[serde(default)]
        pub properties: Value,
    }

    #[test]
    fn accepts_arbitrary_nested_json() {
        let input = r#"
          properties:
            image: nginx:1.25
            port: 8080
            env:
              - name: LOG_LEVEL
                value: debug
        "#;

        serde_yaml::from_str::<Test>(input).expect("failed to parse arbitrary properties object");
    }

    #[test]
    fn missing_properties_defaults_to_null() {
        let input = "{}";
        let parsed = serde_yaml::from_str::<Test>(input).unwrap();
        assert!(parsed.properties.is_null());
    }
}
