//! Resolution of `parameter.*` / `context.*` dot-paths and `{{ ... }}` substitution over a JSON
//! tree (spec.md §4.2).
use serde_json::Value;

use crate::error::{Error, MissingFieldSnafu};
use snafu::OptionExt;

/// Resolves a dot/bracket path like `image` or `metadata.labels.app` or `containers[0].name`
/// against `root`.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in split_path(path) {
        match segment {
            Segment::Field(name) => {
                current = current.as_object()?.get(&name)?;
            }
            Segment::Index(index) => {
                current = current.as_array()?.get(index)?;
            }
        }
    }
    Some(current)
}

enum Segment {
    Field(String),
    Index(usize),
}

fn split_path(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for dot_part in path.split('.') {
        let mut rest = dot_part;
        while let Some(bracket_start) = rest.find('[') {
            let (field, tail) = rest.split_at(bracket_start);
            if !field.is_empty() {
                segments.push(Segment::Field(field.to_string()));
            }
            let bracket_end = tail.find(']').unwrap_or(tail.len());
            if let Ok(index) = tail[1..bracket_end].parse::<usize>() {
                segments.push(Segment::Index(index));
            }
            rest = &tail[(bracket_end + 1).min(tail.len())..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Field(rest.to_string()));
        }
    }
    segments
}

/// Walks `node`, replacing every string leaf that contains `{{ ... }}` references. A leaf whose
/// *entire* trimmed content is a single reference is replaced with the referenced value
/// verbatim (preserving its type); a leaf with embedded references is replaced with their
/// stringified values spliced into the surrounding text.
pub fn substitute(node: &Value, roots: &TemplateRoots<'_>) -> Result<Value, Error> {
    match node {
        Value::String(text) => substitute_string(text, roots),
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| substitute(item, roots))
                .collect::<Result<_, _>>()?,
        )),
        Value::Object(fields) => {
            let mut result = serde_json::Map::with_capacity(fields.len());
            for (key, value) in fields {
                result.insert(key.clone(), substitute(value, roots)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

/// The two roots a template reference resolves against.
pub struct TemplateRoots<'a> {
    pub parameter: &'a Value,
    pub context: &'a Value,
}

impl<'a> TemplateRoots<'a> {
    fn resolve_reference(&self, reference: &str) -> Result<Value, Error> {
        let reference = reference.trim();
        let (root_name, path) = reference
            .split_once('.')
            .unwrap_or((reference, ""));
        let root = match root_name {
            "parameter" => self.parameter,
            "context" => self.context,
            _ => {
                return MissingFieldSnafu {
                    path: reference.to_string(),
                }
                .fail()
            }
        };
        if path.is_empty() {
            return Ok(root.clone());
        }
        resolve(root, path)
            .cloned()
            .context(MissingFieldSnafu {
                path: reference.to_string(),
            })
    }
}

fn substitute_string(text: &str, roots: &TemplateRoots<'_>) -> Result<Value, Error> {
    let trimmed = text.trim();
    if let Some(reference) = whole_reference(trimmed) {
        return roots.resolve_reference(reference);
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let Some(end) = rest[start..].find("}}") else {
            result.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let reference = &rest[start + 2..start + end];
        let value = roots.resolve_reference(reference)?;
        result.push_str(&scalar_to_string(&value));
        rest = &rest[start + end + 2..];
    }
    result.push_str(rest);
    Ok(Value::String(result))
}

fn whole_reference(trimmed: &str) -> Option<&str> {
    let inner = trimmed.strip_prefix("{{")?.strip_suffix("}}")?;
    Some(inner)
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whole_reference_preserves_type() {
        let roots = TemplateRoots {
            parameter: &json!({"port": 80}),
            context: &json!({}),
        };
        let result = substitute(&json!("{{ parameter.port }}"), &roots).unwrap();
        assert_eq!(result, json!(80));
    }

    #[test]
    fn embedded_reference_splices_as_text() {
        let roots = TemplateRoots {
            parameter: &json!({"name": "nginx"}),
            context: &json!({}),
        };
        let result = substitute(&json!("svc-{{ parameter.name }}"), &roots).unwrap();
        assert_eq!(result, json!("svc-nginx"));
    }

    #[test]
    fn missing_reference_errors() {
        let roots = TemplateRoots {
            parameter: &json!({}),
            context: &json!({}),
        };
        assert!(substitute(&json!("{{ parameter.missing }}"), &roots).is_err());
    }

    #[test]
    fn nested_object_and_array_substitution() {
        let roots = TemplateRoots {
            parameter: &json!({"image": "nginx:1.21", "port": 80}),
            context: &json!({}),
        };
        let template = json!({
            "spec": {"containers": [{"image": "{{ parameter.image }}", "port": "{{ parameter.port }}"}]}
        });
        let result = substitute(&template, &roots).unwrap();
        assert_eq!(result["spec"]["containers"][0]["image"], json!("nginx:1.21"));
        assert_eq!(result["spec"]["containers"][0]["port"], json!(80));
    }

    #[test]
    fn resolve_supports_array_indexing() {
        let root = json!({"containers": [{"name": "a"}, {"name": "b"}]});
        assert_eq!(resolve(&root, "containers[1].name"), Some(&json!("b")));
    }
}
