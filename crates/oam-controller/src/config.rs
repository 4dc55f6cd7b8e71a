//! Operator-facing knobs (spec.md §6), built via `clap::Parser` like the teacher's `cli` module,
//! with env-var fallback. No field here is a process-wide singleton (spec.md §9 design note):
//! every consumer takes a `&ControllerConfig` or one of the narrower configs it converts into.
use oam_shared::time::Duration;

#[derive(clap::Parser, Clone, Debug)]
pub struct ControllerConfig {
    /// Parallel Application reconciliation loops.
    #[arg(long, env, default_value_t = 4)]
    pub concurrent_reconciles: usize,

    /// Parallel `apply` calls dispatched per reconciliation.
    #[arg(long, env, default_value_t = 10)]
    pub max_dispatch_concurrent: usize,

    /// Periodic resync interval, independent of watch events.
    #[arg(long, env, default_value = "10h")]
    pub informer_sync_period: Duration,

    /// Per-cluster client-side rate limit, queries per second.
    #[arg(long, env, default_value_t = 50.0)]
    pub kube_api_qps: f32,

    /// Per-cluster client-side rate limit, burst size.
    #[arg(long, env, default_value_t = 100)]
    pub kube_api_burst: u32,

    /// How often a terminal, healthy Application is re-checked even without a watch event.
    #[arg(long, env)]
    pub application_re_sync_period: Option<Duration>,

    /// Cap on exponential backoff for a workflow step in `Pending` (wait) state.
    #[arg(long, env, default_value = "60s")]
    pub max_workflow_wait_backoff_time: Duration,

    /// Cap on exponential backoff for a workflow step that failed retryably.
    #[arg(long, env, default_value = "300s")]
    pub max_workflow_failed_backoff_time: Duration,

    /// Attempts a retryable workflow step gets before it is marked `Failed`.
    #[arg(long, env, default_value_t = 10)]
    pub max_workflow_step_error_retry_times: u32,

    /// Pause before a step's unmet `dependsOn` is reported as blocking, to absorb transient
    /// watch-cache staleness.
    #[arg(long, env, default_value = "30s")]
    pub depend_check_wait: Duration,

    /// Route multi-cluster dispatch through a gateway instead of direct per-cluster clients.
    /// Carried as a configuration flag; the gateway transport itself is not implemented here.
    #[arg(long, env, default_value_t = false)]
    pub enable_cluster_gateway: bool,

    /// Only reconcile Applications in this namespace; unset watches every namespace.
    #[arg(long, env)]
    pub watch_namespace: Option<String>,

    /// Namespace Definitions fall back to when not found alongside the Application.
    #[arg(long, env, default_value = "vela-system")]
    pub system_namespace: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            concurrent_reconciles: 4,
            max_dispatch_concurrent: 10,
            informer_sync_period: Duration::from_secs(10 * 60 * 60),
            kube_api_qps: 50.0,
            kube_api_burst: 100,
            application_re_sync_period: None,
            max_workflow_wait_backoff_time: Duration::from_secs(60),
            max_workflow_failed_backoff_time: Duration::from_secs(300),
            max_workflow_step_error_retry_times: 10,
            depend_check_wait: Duration::from_secs(30),
            enable_cluster_gateway: false,
            watch_namespace: None,
            system_namespace: oam_definitions::store::DEFAULT_SYSTEM_NAMESPACE.to_string(),
        }
    }
}

impl ControllerConfig {
    pub fn workflow_runtime_config(&self) -> oam_workflow::RuntimeConfig {
        oam_workflow::RuntimeConfig {
            max_wait_backoff: self.max_workflow_wait_backoff_time.as_std(),
            max_failed_backoff: self.max_workflow_failed_backoff_time.as_std(),
            max_step_error_retry_times: self.max_workflow_step_error_retry_times,
        }
    }

    pub fn dispatch_config(&self) -> oam_dispatch::DispatchConfig {
        oam_dispatch::DispatchConfig {
            qps: self.kube_api_qps,
            burst: self.kube_api_burst,
            max_concurrent: self.max_dispatch_concurrent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_the_documented_table() {
        let config = ControllerConfig::default();
        assert_eq!(config.concurrent_reconciles, 4);
        assert_eq!(config.max_dispatch_concurrent, 10);
        assert_eq!(config.kube_api_qps, 50.0);
        assert_eq!(config.kube_api_burst, 100);
        assert_eq!(config.depend_check_wait.as_std().as_secs(), 30);
    }
}
