//! Logging and error-reporting setup shared by every engine component (C1-C8) and the
//! `oam-controller` CLI.
use std::error::Error;

use kube::runtime::reflector::ObjectRef;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

pub mod k8s_events;

/// Initializes `tracing` with an [`EnvFilter`] read from `env` (falling back to `INFO`) and a
/// human-readable terminal formatter.
///
/// We force callers to name the environment variable explicitly so each binary can use its own,
/// e.g. `OAM_CONTROLLER_LOG`.
pub fn init_logging(env: &str) {
    let filter = EnvFilter::try_from_env(env)
        .unwrap_or_else(|_| EnvFilter::new(tracing::Level::INFO.to_string()));

    Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Implemented by the per-module `Error` enums (`oam_template::Error`, `oam_render::Error`, ...)
/// so the controller (C8) can turn a failed reconcile into a Kubernetes Event without knowing the
/// concrete error type.
pub trait ReconcilerError: Error {
    /// A short, PascalCase machine-readable reason, usually the enum variant name.
    fn category(&self) -> &'static str;

    /// The object the error should be attributed to, if different from the `Application` being
    /// reconciled (e.g. the `ComponentDefinition` a component references).
    fn secondary_object(&self) -> Option<ObjectRef<kube::core::DynamicObject>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::init_logging;

    #[test]
    fn default_level_is_info_when_env_var_unset() {
        init_logging("OAM_SHARED_TEST_LOG_UNSET_VAR");
    }
}
