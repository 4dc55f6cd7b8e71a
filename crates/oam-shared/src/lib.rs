//! This crate contains various shared helpers and utilities used across other crates in this
//! workspace: Kubernetes key/value pair validation, CRD schema printing, YAML serialization,
//! humantime durations, structural validation, logging setup, and signal handling.

pub mod crd;
pub mod iter;
pub mod kvp;
pub mod logging;
pub mod schema_ext;
pub mod signal;
pub mod time;
pub mod validation;
pub mod yaml;
