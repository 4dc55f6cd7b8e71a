//! This module provides various types and functions to construct valid Kubernetes
//! annotations. Annotations are key/value pairs, where the key must meet certain
//! requirementens regarding length and character set. The value can contain
//! **any** valid UTF-8 data.
//!
//! See <https://kubernetes.io/docs/concepts/overview/working-with-objects/annotations/>
//! for more information on Kubernetes annotations.
use std::convert::Infallible;

use crate::kvp::{KeyValuePair, KeyValuePairError, KeyValuePairs};

mod value;

pub use value::*;

/// A type alias for errors returned when construction or manipulation of a set
/// of annotations fails.
pub type AnnotationError = KeyValuePairError<Infallible>;

/// A specialized implementation of a key/value pair representing Kubernetes
/// annotations.
///
/// The validation of the annotation value can **never** fail, as [`str`] is
/// guaranteed  to only contain valid UTF-8 data - which is the only
/// requirement for a valid Kubernetes annotation value.
///
/// See <https://kubernetes.io/docs/concepts/overview/working-with-objects/annotations/>
/// for more information on Kubernetes annotations.
pub type Annotation = KeyValuePair<AnnotationValue>;

/// A validated set/list of Kubernetes annotations.
///
/// It provides selected associated functions to manipulate the set of
/// annotations, like inserting or extending.
///
/// ## Examples
///
/// ### Converting a BTreeMap into a list of labels
///
/// ```
/// # use std::collections::BTreeMap;
/// # use oam_shared::iter::TryFromIterator;
/// # use oam_shared::kvp::Annotations;
/// let map = BTreeMap::from([
///     ("app.oam.dev/description", "Example web application"),
/// ]);
///
/// let labels = Annotations::try_from_iter(map).unwrap();
/// ```
///
/// ### Creating a list of labels from an array
///
/// ```
/// # use oam_shared::iter::TryFromIterator;
/// # use oam_shared::kvp::Annotations;
/// let labels = Annotations::try_from_iter([
///     ("app.oam.dev/description", "Example web application"),
/// ]).unwrap();
/// ```
pub type Annotations = KeyValuePairs<AnnotationValue>;

/// Well-known annotations used by the engine itself.
pub mod well_known {
    use crate::kvp::{Annotation, AnnotationError};

    /// Constructs the `app.oam.dev/last-applied-configuration` annotation, storing the
    /// last-applied `spec` of an `Application` as JSON, mirroring `kubectl apply`'s
    /// three-way-merge bookkeeping.
    pub fn last_applied_configuration(spec_json: &str) -> Result<Annotation, AnnotationError> {
        Annotation::try_from(("app.oam.dev/last-applied-configuration", spec_json))
    }

    /// Constructs the `app.oam.dev/publish-version` annotation used to trigger a new
    /// `ApplicationRevision` even when `spec` is otherwise unchanged.
    pub fn publish_version(version: &str) -> Result<Annotation, AnnotationError> {
        Annotation::try_from(("app.oam.dev/publish-version", version))
    }
}
