//! Builds and caches a [`kube::Client`] per registered [`ClusterSpec`] (spec.md §4.6, §9 Design
//! Note: "no unbounded global singleton" — clients are built lazily and kept in a bounded map
//! scoped to the clusters the caller actually registers).

use std::collections::HashMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use oam_types::cluster::{ClusterSpec, LOCAL_CLUSTER};
use snafu::{OptionExt, ResultExt};
use tokio::sync::RwLock;

use crate::error::{
    ClientBuildSnafu, Error, MissingCredentialSnafu, SecretFetchSnafu, SecretKeyMissingSnafu,
};

/// Lazily connects to member clusters and remembers the resulting clients.
///
/// The local cluster's client is supplied up front (it's simply the controller's own in-cluster
/// or kubeconfig-derived client); every other cluster is connected to on first use via its
/// `credentialRef` secret and cached under the cluster's name.
pub struct ClusterClientPool {
    local: kube::Client,
    remotes: RwLock<HashMap<String, kube::Client>>,
}

impl ClusterClientPool {
    pub fn new(local: kube::Client) -> Self {
        Self {
            local,
            remotes: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a client for `cluster`, connecting and caching it if this is the first request
    /// for that cluster name.
    pub async fn get_or_connect(&self, name: &str, spec: &ClusterSpec) -> Result<kube::Client, Error> {
        if ClusterSpec::is_local(name) {
            return Ok(self.local.clone());
        }

        if let Some(client) = self.remotes.read().await.get(name) {
            return Ok(client.clone());
        }

        let client = self.connect(name, spec).await?;

        let mut remotes = self.remotes.write().await;
        Ok(remotes.entry(name.to_string()).or_insert(client).clone())
    }

    async fn connect(&self, name: &str, spec: &ClusterSpec) -> Result<kube::Client, Error> {
        let credential_ref = spec.credential_ref.as_ref().context(MissingCredentialSnafu {
            cluster: name.to_string(),
        })?;

        let secrets: Api<Secret> = Api::namespaced(self.local.clone(), &credential_ref.namespace);
        let secret = secrets
            .get(&credential_ref.name)
            .await
            .context(SecretFetchSnafu {
                cluster: name.to_string(),
            })?;

        let raw = secret
            .data
            .as_ref()
            .and_then(|data| data.get(&credential_ref.key))
            .context(SecretKeyMissingSnafu {
                cluster: name.to_string(),
                key: credential_ref.key.clone(),
            })?;

        let kubeconfig: kube::config::Kubeconfig =
            serde_yaml::from_slice(&raw.0).context(crate::error::KubeconfigDecodeSnafu {
                cluster: name.to_string(),
            })?;

        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &kube::config::KubeConfigOptions::default())
            .await
            .map_err(|source| Box::new(source) as Box<dyn std::error::Error + Send + Sync>)
            .context(ClientBuildSnafu {
                cluster: name.to_string(),
            })?;

        kube::Client::try_from(config)
            .map_err(|source| Box::new(source) as Box<dyn std::error::Error + Send + Sync>)
            .context(ClientBuildSnafu {
                cluster: name.to_string(),
            })
    }
}

/// Shared handle, cloned into every reconcile task that needs to dispatch.
pub type SharedClientPool = Arc<ClusterClientPool>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_cluster_name_constant_matches_is_local() {
        assert!(ClusterSpec::is_local(LOCAL_CLUSTER));
    }
}
