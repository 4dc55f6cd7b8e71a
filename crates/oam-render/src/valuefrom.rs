//! Resolves a `valueFrom` JSON-path expression against an applied resource, used by Component
//! `outputs` and, later, `WorkflowStep` outputs (spec.md §3, §4.5).
use serde_json::Value;
use serde_json_path::JsonPath;

pub fn resolve(resource: &Value, value_from: &str) -> Option<Value> {
    let path = JsonPath::parse(value_from).ok()?;
    path.query(resource).all().first().map(|v| (*v).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_a_simple_json_path() {
        let resource = json!({"status": {"podIP": "10.0.0.5"}});
        assert_eq!(resolve(&resource, "$.status.podIP"), Some(json!("10.0.0.5")));
    }

    #[test]
    fn missing_path_resolves_to_none() {
        let resource = json!({"status": {}});
        assert_eq!(resolve(&resource, "$.status.podIP"), None);
    }
}
