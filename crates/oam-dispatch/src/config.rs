//! Operator-facing dispatch knobs (spec.md §6).

/// Tunables for the dispatcher. `qps`/`burst` size each per-cluster client's request budget;
/// `max_concurrent` bounds how many applies run at once across all clusters in a single tick.
#[derive(Clone, Copy, Debug)]
pub struct DispatchConfig {
    pub qps: f32,
    pub burst: u32,
    pub max_concurrent: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            qps: 50.0,
            burst: 100,
            max_concurrent: 10,
        }
    }
}
