//! `topology` (spec.md §4.4): selects the set of target clusters a Workflow's `deploy` steps
//! dispatch to, by name and/or label selector, and optionally overrides the deploy namespace.
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{EmptyTopologySnafu, Error};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyPolicy {
    #[serde(default)]
    pub clusters: Vec<String>,

    #[serde(default)]
    pub cluster_label_selector: BTreeMap<String, String>,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub allow_empty: bool,
}

impl TopologyPolicy {
    /// Resolves to the union of explicitly-named clusters and clusters whose labels match
    /// `clusterLabelSelector`, erroring when both are empty unless `allowEmpty` is set.
    pub fn resolve_clusters(
        &self,
        policy_name: &str,
        cluster_labels: &BTreeMap<String, BTreeMap<String, String>>,
    ) -> Result<Vec<String>, Error> {
        let mut clusters: Vec<String> = self.clusters.clone();
        for (cluster, labels) in cluster_labels {
            if !self.cluster_label_selector.is_empty()
                && self
                    .cluster_label_selector
                    .iter()
                    .all(|(key, value)| labels.get(key) == Some(value))
                && !clusters.contains(cluster)
            {
                clusters.push(cluster.clone());
            }
        }

        if clusters.is_empty() && !self.allow_empty {
            return EmptyTopologySnafu {
                name: policy_name.to_string(),
            }
            .fail();
        }
        Ok(clusters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_clusters_are_returned_directly() {
        let policy = TopologyPolicy {
            clusters: vec!["cluster-a".to_string(), "cluster-b".to_string()],
            ..Default::default()
        };
        let resolved = policy.resolve_clusters("prod", &BTreeMap::new()).unwrap();
        assert_eq!(resolved, vec!["cluster-a", "cluster-b"]);
    }

    #[test]
    fn label_selector_matches_are_unioned_in() {
        let mut cluster_labels = BTreeMap::new();
        cluster_labels.insert(
            "cluster-c".to_string(),
            BTreeMap::from([("region".to_string(), "eu".to_string())]),
        );
        let policy = TopologyPolicy {
            cluster_label_selector: BTreeMap::from([("region".to_string(), "eu".to_string())]),
            ..Default::default()
        };
        assert_eq!(
            policy.resolve_clusters("prod", &cluster_labels).unwrap(),
            vec!["cluster-c"]
        );
    }

    #[test]
    fn empty_result_without_allow_empty_is_an_error() {
        let policy = TopologyPolicy::default();
        assert!(policy.resolve_clusters("prod", &BTreeMap::new()).is_err());
    }

    #[test]
    fn empty_result_with_allow_empty_is_ok() {
        let policy = TopologyPolicy {
            allow_empty: true,
            ..Default::default()
        };
        assert_eq!(policy.resolve_clusters("prod", &BTreeMap::new()).unwrap(), Vec::<String>::new());
    }
}
