//! Fans a set of rendered manifests out to their target clusters (spec.md §4.6), bounding
//! in-flight applies to [`DispatchConfig::max_concurrent`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::future::join_all;
use kube::discovery::Discovery;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::apply::{self, ApplyOutcome, Disposition};
use crate::client_pool::SharedClientPool;
use crate::config::DispatchConfig;
use crate::error::{classify_apply_error, Error};
use oam_types::cluster::ClusterSpec;

/// One manifest to apply, addressed at a specific cluster.
pub struct DispatchItem<'a> {
    pub cluster: &'a str,
    pub cluster_spec: &'a ClusterSpec,
    pub body: &'a Value,
    pub disposition: Disposition,
}

/// The outcome of dispatching one item, paired with the cluster it targeted.
pub struct DispatchResult {
    pub cluster: String,
    pub outcome: Result<ApplyOutcome, Error>,
}

type BoxedDispatch = Pin<Box<dyn Future<Output = DispatchResult> + Send>>;

/// Applies every item concurrently, capped at `config.max_concurrent` in-flight applies.
///
/// Discovery is resolved once per cluster up front rather than per item, since a single tick
/// typically dispatches many manifests at the same handful of clusters.
pub async fn dispatch_all(
    pool: &SharedClientPool,
    app_name: &str,
    items: Vec<DispatchItem<'_>>,
    config: &DispatchConfig,
) -> Vec<DispatchResult> {
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
    let mut discovery_cache: HashMap<String, Arc<Discovery>> = HashMap::new();
    let mut tasks: Vec<BoxedDispatch> = Vec::with_capacity(items.len());

    for item in items {
        let cluster = item.cluster.to_string();

        let client = match pool.get_or_connect(item.cluster, item.cluster_spec).await {
            Ok(client) => client,
            Err(source) => {
                tasks.push(ready(DispatchResult {
                    cluster,
                    outcome: Err(source),
                }));
                continue;
            }
        };

        let discovery = if let Some(discovery) = discovery_cache.get(item.cluster) {
            discovery.clone()
        } else {
            match Discovery::new(client.clone()).run().await {
                Ok(discovery) => {
                    let discovery = Arc::new(discovery);
                    discovery_cache.insert(cluster.clone(), discovery.clone());
                    discovery
                }
                Err(source) => {
                    warn!(cluster = item.cluster, error = %source, "discovery run failed");
                    tasks.push(ready(DispatchResult {
                        cluster: cluster.clone(),
                        outcome: Err(classify_apply_error(item.cluster, source)),
                    }));
                    continue;
                }
            }
        };

        let semaphore = semaphore.clone();
        let body = item.body.clone();
        let disposition = item.disposition;
        let app_name = app_name.to_string();

        tasks.push(Box::pin(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            let outcome = apply::apply(&client, &cluster, &discovery, &app_name, &body, disposition).await;
            DispatchResult { cluster, outcome }
        }));
    }

    join_all(tasks).await
}

fn ready(result: DispatchResult) -> BoxedDispatch {
    Box::pin(async move { result })
}
