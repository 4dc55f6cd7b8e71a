//! A single rendered Kubernetes-style resource, tagged with the provenance labels the Resource
//! Tracker (C7) and Dispatcher (C6) key off of (spec.md §4.3).
use serde_json::Value;

/// One resource produced by rendering a Component (the `primary`) or a Trait (an `extra`).
#[derive(Clone, Debug, PartialEq)]
pub struct Manifest {
    pub body: Value,
    pub component_name: String,
    pub trait_type: Option<String>,
}

impl Manifest {
    pub fn api_version(&self) -> Option<&str> {
        self.body.get("apiVersion").and_then(Value::as_str)
    }

    pub fn kind(&self) -> Option<&str> {
        self.body.get("kind").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.body
            .get("metadata")
            .and_then(|metadata| metadata.get("name"))
            .and_then(Value::as_str)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.body
            .get("metadata")
            .and_then(|metadata| metadata.get("namespace"))
            .and_then(Value::as_str)
    }
}
