use oam_shared::logging::ReconcilerError;
use snafu::Snafu;

/// The failure taxonomy the dispatcher (C6) reports for a single apply (spec.md §4.6).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("cluster {cluster:?} has no credentialRef and is not the local cluster"))]
    MissingCredential { cluster: String },

    #[snafu(display("failed to read kubeconfig secret for cluster {cluster:?}"))]
    SecretFetch { cluster: String, source: kube::Error },

    #[snafu(display("secret for cluster {cluster:?} has no key {key:?}"))]
    SecretKeyMissing { cluster: String, key: String },

    #[snafu(display("kubeconfig for cluster {cluster:?} is not valid YAML"))]
    KubeconfigDecode {
        cluster: String,
        source: serde_yaml::Error,
    },

    #[snafu(display("failed to build a client for cluster {cluster:?}"))]
    ClientBuild {
        cluster: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[snafu(display("resource type {api_version}/{kind} is not served by cluster {cluster:?}"))]
    UnknownResourceType {
        cluster: String,
        api_version: String,
        kind: String,
    },

    #[snafu(display("cluster {cluster:?} is unreachable"))]
    ClusterUnreachable { cluster: String, source: kube::Error },

    #[snafu(display("conflicting update applying to cluster {cluster:?}"))]
    Conflict { cluster: String, source: kube::Error },

    #[snafu(display("apply to cluster {cluster:?} was forbidden"))]
    Forbidden { cluster: String, source: kube::Error },

    #[snafu(display("manifest rejected as invalid by cluster {cluster:?}"))]
    Invalid { cluster: String, source: kube::Error },
}

impl Error {
    /// `true` when the caller should requeue and retry without giving up on the step
    /// (spec.md §4.6: `ClusterUnreachable` and `Conflict` are retryable).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ClusterUnreachable { .. } | Error::Conflict { .. })
    }
}

impl ReconcilerError for Error {
    fn category(&self) -> &'static str {
        match self {
            Error::MissingCredential { .. } => "MissingCredential",
            Error::SecretFetch { .. } => "SecretFetch",
            Error::SecretKeyMissing { .. } => "SecretKeyMissing",
            Error::KubeconfigDecode { .. } => "KubeconfigDecode",
            Error::ClientBuild { .. } => "ClientBuild",
            Error::UnknownResourceType { .. } => "UnknownResourceType",
            Error::ClusterUnreachable { .. } => "ClusterUnreachable",
            Error::Conflict { .. } => "Conflict",
            Error::Forbidden { .. } => "Forbidden",
            Error::Invalid { .. } => "Invalid",
        }
    }
}

/// Classifies a raw [`kube::Error`] from an apply call into the dispatcher's own taxonomy
/// (spec.md §4.6).
pub(crate) fn classify_apply_error(cluster: &str, source: kube::Error) -> Error {
    match &source {
        kube::Error::Api(response) => match response.code {
            409 => Error::Conflict {
                cluster: cluster.to_string(),
                source,
            },
            403 => Error::Forbidden {
                cluster: cluster.to_string(),
                source,
            },
            422 => Error::Invalid {
                cluster: cluster.to_string(),
                source,
            },
            _ => Error::ClusterUnreachable {
                cluster: cluster.to_string(),
                source,
            },
        },
        _ => Error::ClusterUnreachable {
            cluster: cluster.to_string(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "boom".to_string(),
            reason: "Boom".to_string(),
            code,
        })
    }

    #[test]
    fn conflict_and_unreachable_are_retryable() {
        assert!(classify_apply_error("west", api_error(409)).is_retryable());
        assert!(classify_apply_error("west", api_error(500)).is_retryable());
    }

    #[test]
    fn forbidden_and_invalid_are_not_retryable() {
        assert!(!classify_apply_error("west", api_error(403)).is_retryable());
        assert!(!classify_apply_error("west", api_error(422)).is_retryable());
    }

    #[test]
    fn classification_matches_taxonomy() {
        assert!(matches!(
            classify_apply_error("west", api_error(409)),
            Error::Conflict { .. }
        ));
        assert!(matches!(
            classify_apply_error("west", api_error(403)),
            Error::Forbidden { .. }
        ));
        assert!(matches!(
            classify_apply_error("west", api_error(422)),
            Error::Invalid { .. }
        ));
        assert!(matches!(
            classify_apply_error("west", api_error(503)),
            Error::ClusterUnreachable { .. }
        ));
    }
}
