//! Minimal structural validation of a `parameter` object against a Definition's
//! `parameterSchema` (spec.md §4.2): presence of `required` fields and `type` agreement.
//! The schema is an ordinary JSON Schema document; only the subset needed to reject malformed
//! `properties` blocks is interpreted, not the full JSON Schema vocabulary.
use serde_json::Value;

use crate::error::{Error, SchemaSnafu};

pub fn validate(parameter: &Value, schema: &Value) -> Result<(), Error> {
    validate_at("", parameter, schema)
}

fn validate_at(path: &str, value: &Value, schema: &Value) -> Result<(), Error> {
    let Some(schema_object) = schema.as_object() else {
        return Ok(());
    };

    if let Some(Value::Array(required)) = schema_object.get("required") {
        let Some(value_object) = value.as_object() else {
            return SchemaSnafu {
                path: path.to_string(),
                message: "expected an object to check required fields against".to_string(),
            }
            .fail();
        };
        for field in required {
            let Some(field_name) = field.as_str() else {
                continue;
            };
            if !value_object.contains_key(field_name) {
                return SchemaSnafu {
                    path: join(path, field_name),
                    message: "required field is missing".to_string(),
                }
                .fail();
            }
        }
    }

    if let Some(Value::String(expected_type)) = schema_object.get("type") {
        if !matches_type(value, expected_type) {
            return SchemaSnafu {
                path: path.to_string(),
                message: format!("expected type {expected_type:?}, got {}", type_name(value)),
            }
            .fail();
        }
    }

    if let (Value::Object(value_object), Some(Value::Object(properties))) =
        (value, schema_object.get("properties"))
    {
        for (property_name, property_schema) in properties {
            if let Some(property_value) = value_object.get(property_name) {
                validate_at(&join(path, property_name), property_value, property_schema)?;
            }
        }
    }

    Ok(())
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_required_field_fails() {
        let schema = json!({"type": "object", "required": ["image"]});
        assert!(validate(&json!({"port": 80}), &schema).is_err());
    }

    #[test]
    fn present_required_field_passes() {
        let schema = json!({"type": "object", "required": ["image"]});
        assert!(validate(&json!({"image": "nginx"}), &schema).is_ok());
    }

    #[test]
    fn nested_property_type_mismatch_fails() {
        let schema = json!({
            "type": "object",
            "properties": {"port": {"type": "integer"}}
        });
        assert!(validate(&json!({"port": "eighty"}), &schema).is_err());
    }

    #[test]
    fn absent_schema_field_is_permissive() {
        assert!(validate(&json!({"anything": true}), &json!({})).is_ok());
    }
}
