//! This module provides various types and functions to construct valid
//! Kubernetes labels. Labels are key/value pairs, where the key must meet
//! certain requirements regarding length and character set. The value can
//! contain a limited set of ASCII characters.
//!
//! Additionally, the [`Label`] struct provides various helper functions to
//! construct the `app.oam.dev/*`/`trait.oam.dev/*` provenance labels the
//! renderer (C3) tags every manifest with.
//!
//! See <https://kubernetes.io/docs/concepts/overview/working-with-objects/labels/>
//! for more information on Kubernetes labels.

use crate::kvp::{KeyValuePair, KeyValuePairError, KeyValuePairs};

mod selector;
mod value;

pub use selector::*;
pub use value::*;

/// A type alias for errors returned when construction or manipulation of a set
/// of labels fails.
pub type LabelError = KeyValuePairError<LabelValueError>;

/// A specialized implementation of a key/value pair representing Kubernetes
/// labels.
///
/// ```
/// # use oam_shared::kvp::Label;
/// let label = Label::try_from(("app.oam.dev/name", "webapp")).unwrap();
/// assert_eq!(label.to_string(), "app.oam.dev/name=webapp");
/// ```
///
/// The validation of the label value can fail due to multiple reasons. It can
/// only contain a limited set and combination of ASCII characters. See
/// <https://kubernetes.io/docs/concepts/overview/working-with-objects/labels/>
/// for more information on Kubernetes labels.
pub type Label = KeyValuePair<LabelValue>;

/// A validated set/list of Kubernetes labels.
///
/// It provides selected associated functions to manipulate the set of labels,
/// like inserting or extending.
///
/// ## Examples
///
/// ### Converting a BTreeMap into a list of labels
///
/// ```
/// # use std::collections::BTreeMap;
/// # use oam_shared::iter::TryFromIterator;
/// # use oam_shared::kvp::Labels;
/// let map = BTreeMap::from([
///     ("app.oam.dev/cluster", "local"),
///     ("app.oam.dev/name", "webapp"),
/// ]);
///
/// let labels = Labels::try_from_iter(map).unwrap();
/// ```
///
/// ### Creating a list of labels from an array
///
/// ```
/// # use oam_shared::iter::TryFromIterator;
/// # use oam_shared::kvp::Labels;
/// let labels = Labels::try_from_iter([
///     ("app.oam.dev/cluster", "local"),
///     ("app.oam.dev/name", "webapp"),
/// ]).unwrap();
/// ```
pub type Labels = KeyValuePairs<LabelValue>;

/// The `app.oam.dev/*`/`trait.oam.dev/*` provenance labels (spec §4.3).
pub mod well_known {
    use crate::kvp::consts::{
        OAM_APP_CLUSTER_KEY, OAM_APP_COMPONENT_KEY, OAM_APP_NAME_KEY, OAM_APP_REVISION_KEY,
        OAM_TRAIT_RESOURCE_KEY, OAM_TRAIT_TYPE_KEY,
    };

    use super::{Label, LabelError};

    /// Creates the `app.oam.dev/name` label.
    pub fn app_name(app_name: &str) -> Result<Label, LabelError> {
        Label::try_from((OAM_APP_NAME_KEY, app_name))
    }

    /// Creates the `app.oam.dev/component` label.
    pub fn component(component_name: &str) -> Result<Label, LabelError> {
        Label::try_from((OAM_APP_COMPONENT_KEY, component_name))
    }

    /// Creates the `app.oam.dev/revision` label.
    pub fn revision(revision_name: &str) -> Result<Label, LabelError> {
        Label::try_from((OAM_APP_REVISION_KEY, revision_name))
    }

    /// Creates the `app.oam.dev/cluster` label.
    pub fn cluster(cluster: &str) -> Result<Label, LabelError> {
        Label::try_from((OAM_APP_CLUSTER_KEY, cluster))
    }

    /// Creates the `trait.oam.dev/type` label.
    pub fn trait_type(trait_type: &str) -> Result<Label, LabelError> {
        Label::try_from((OAM_TRAIT_TYPE_KEY, trait_type))
    }

    /// Creates the `trait.oam.dev/resource` label.
    pub fn trait_resource(resource_name: &str) -> Result<Label, LabelError> {
        Label::try_from((OAM_TRAIT_RESOURCE_KEY, resource_name))
    }
}

/// Common sets of labels the renderer (C3) tags manifests with.
pub mod sets {
    use super::{well_known, Labels};
    use crate::kvp::{LabelError, ObjectLabels};

    /// Returns the full set of provenance labels for a rendered manifest:
    /// `app.oam.dev/name`, `app.oam.dev/component`, `app.oam.dev/revision`,
    /// `app.oam.dev/cluster`, and (for trait-produced manifests)
    /// `trait.oam.dev/type`.
    pub fn recommended<T>(object_labels: ObjectLabels<'_, T>) -> Result<Labels, LabelError> {
        let mut labels = Labels::from_iter([
            well_known::app_name(object_labels.app_name)?,
            well_known::component(object_labels.component_name)?,
            well_known::revision(object_labels.revision_name)?,
            well_known::cluster(object_labels.cluster)?,
        ]);

        if let Some(trait_type) = object_labels.trait_type {
            labels.extend([well_known::trait_type(trait_type)?]);
        }

        Ok(labels)
    }
}
