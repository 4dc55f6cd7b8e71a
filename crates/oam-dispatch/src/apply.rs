//! Applies one rendered manifest to a member cluster via server-side apply (spec.md §4.6).

use kube::api::{Api, DynamicObject, Patch, PatchParams};
use kube::core::GroupVersionKind;
use kube::discovery::{Discovery, Scope};
use kube::Client;
use serde_json::Value;
use snafu::OptionExt;
use tracing::{info, warn};

use crate::error::{classify_apply_error, Error, UnknownResourceTypeSnafu};

/// Field manager stamped on every object this dispatcher applies.
pub const FIELD_MANAGER: &str = "oam-controller";

/// What the caller has already decided about this manifest, resolved from the composed
/// resource-scoped policies (spec.md §4.4) before it reaches the dispatcher. The dispatcher
/// itself doesn't evaluate selectors; it only acts on the resulting disposition.
#[derive(Clone, Copy, Debug, Default)]
pub struct Disposition {
    /// `read-only` matched: the resource must already exist and is never mutated.
    pub read_only: bool,

    /// `take-over` matched: an orphaned resource (owned by no Application) may be adopted.
    pub take_over: bool,

    /// `shared-resource` matched: the object may be jointly owned by more than one Application
    /// through the ordered sharer list in its `app.oam.dev/sharers` annotation (spec.md §3,
    /// §4.4). Only the first (oldest) sharer mutates the object; later sharers only record their
    /// membership.
    pub shared: bool,
}

/// The result of attempting to apply one manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied { created: bool },
    SkippedReadOnlyMissing,
    SkippedForeignOwner { owner: String },
    /// Joined a `shared-resource` as a later sharer: the object wasn't mutated, only the sharer
    /// list was updated to record this Application's membership.
    SharedReadOnly { first_sharer: String },
}

/// Applies `body` to `cluster` through `client`, using `discovery` to resolve its `ApiResource`.
///
/// Reads the live object first to decide whether an existing foreign `app.oam.dev/name` owner
/// should block the apply (unless `disposition.take_over` allows adopting it).
pub async fn apply(
    client: &Client,
    cluster: &str,
    discovery: &Discovery,
    app_name: &str,
    body: &Value,
    disposition: Disposition,
) -> Result<ApplyOutcome, Error> {
    let api_version = body.get("apiVersion").and_then(Value::as_str).unwrap_or_default();
    let kind = body.get("kind").and_then(Value::as_str).unwrap_or_default();
    let gvk = gvk_from_api_version_and_kind(api_version, kind);

    let (api_resource, capabilities) =
        discovery
            .resolve_gvk(&gvk)
            .context(UnknownResourceTypeSnafu {
                cluster: cluster.to_string(),
                api_version: api_version.to_string(),
                kind: kind.to_string(),
            })?;

    let namespace = body
        .get("metadata")
        .and_then(|m| m.get("namespace"))
        .and_then(Value::as_str);

    let api: Api<DynamicObject> = match (capabilities.scope, namespace) {
        (Scope::Namespaced, Some(ns)) => Api::namespaced_with(client.clone(), ns, &api_resource),
        _ => Api::all_with(client.clone(), &api_resource),
    };

    let name = body
        .get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let existing = api
        .get_opt(name)
        .await
        .map_err(|source| classify_apply_error(cluster, source))?;

    if disposition.shared {
        return apply_shared(&api, cluster, &gvk, app_name, name, body, existing).await;
    }

    if let Some(existing) = &existing {
        if let Some(owner) = owner_label(existing) {
            if owner != app_name && !disposition.take_over {
                warn!(cluster, kind = %gvk.kind, name, owner = %owner, "skipping resource owned by another Application");
                return Ok(ApplyOutcome::SkippedForeignOwner { owner });
            }
        }
    } else if disposition.read_only {
        warn!(cluster, kind = %gvk.kind, name, "read-only resource does not exist, skipping");
        return Ok(ApplyOutcome::SkippedReadOnlyMissing);
    }

    if disposition.read_only {
        return Ok(ApplyOutcome::Applied { created: false });
    }

    let mut params = PatchParams::apply(FIELD_MANAGER);
    params.force = true;

    api.patch(name, &params, &Patch::Apply(body))
        .await
        .map_err(|source| classify_apply_error(cluster, source))?;

    info!(cluster, kind = %gvk.kind, name, "applied manifest");

    Ok(ApplyOutcome::Applied {
        created: existing.is_none(),
    })
}

/// Applies `body` under `shared-resource` semantics (spec.md §3): the object's sharer list is an
/// ordered, comma-separated `app.oam.dev/sharers` annotation, oldest joiner first. Only the first
/// sharer's apply actually mutates the object; every later sharer joining the list only has its
/// name recorded, leaving the object's body untouched.
async fn apply_shared(
    api: &Api<DynamicObject>,
    cluster: &str,
    gvk: &GroupVersionKind,
    app_name: &str,
    name: &str,
    body: &Value,
    existing: Option<DynamicObject>,
) -> Result<ApplyOutcome, Error> {
    let mut sharers = existing.as_ref().map(sharer_list).unwrap_or_default();
    if sharers.is_empty() {
        // A pre-existing object with no sharer list yet (single-owner, or newly opted into
        // `shared-resource`): its current owner label, if any, becomes the first sharer.
        if let Some(owner) = existing.as_ref().and_then(owner_label) {
            sharers.push(owner);
        }
    }

    let already_joined = sharers.iter().any(|sharer| sharer == app_name);
    if !already_joined {
        sharers.push(app_name.to_string());
    }

    let is_first_sharer = sharers.first().map(String::as_str) == Some(app_name);

    if !is_first_sharer {
        if !already_joined {
            patch_sharer_list(api, cluster, name, &sharers).await?;
            info!(cluster, kind = %gvk.kind, name, first_sharer = %sharers[0], "joined shared resource as a read-only sharer");
        }
        return Ok(ApplyOutcome::SharedReadOnly {
            first_sharer: sharers[0].clone(),
        });
    }

    let mut stamped = body.clone();
    set_sharer_list(&mut stamped, &sharers);

    let mut params = PatchParams::apply(FIELD_MANAGER);
    params.force = true;
    api.patch(name, &params, &Patch::Apply(&stamped))
        .await
        .map_err(|source| classify_apply_error(cluster, source))?;

    info!(cluster, kind = %gvk.kind, name, sharer_count = sharers.len(), "applied shared resource as first sharer");

    Ok(ApplyOutcome::Applied {
        created: existing.is_none(),
    })
}

async fn patch_sharer_list(api: &Api<DynamicObject>, cluster: &str, name: &str, sharers: &[String]) -> Result<(), Error> {
    let patch = serde_json::json!({
        "metadata": {
            "annotations": {
                oam_shared::kvp::consts::keys::OAM_SHARERS_KEY: sharers.join(","),
            }
        }
    });
    api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .map_err(|source| classify_apply_error(cluster, source))?;
    Ok(())
}

/// Reads the ordered sharer list off a live object's `app.oam.dev/sharers` annotation.
pub fn sharer_list(object: &DynamicObject) -> Vec<String> {
    object
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(oam_shared::kvp::consts::keys::OAM_SHARERS_KEY))
        .map(|value| value.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

fn set_sharer_list(body: &mut Value, sharers: &[String]) {
    let metadata = body
        .as_object_mut()
        .expect("manifest body is always a JSON object")
        .entry("metadata")
        .or_insert_with(|| Value::Object(Default::default()));
    let annotations = metadata
        .as_object_mut()
        .expect("metadata is always a JSON object")
        .entry("annotations")
        .or_insert_with(|| Value::Object(Default::default()));
    if let Some(annotations) = annotations.as_object_mut() {
        annotations.insert(
            oam_shared::kvp::consts::keys::OAM_SHARERS_KEY.to_string(),
            Value::String(sharers.join(",")),
        );
    }
}

fn owner_label(object: &DynamicObject) -> Option<String> {
    object
        .metadata
        .labels
        .as_ref()?
        .get(oam_shared::kvp::consts::keys::OAM_APP_NAME_KEY)
        .cloned()
}

fn gvk_from_api_version_and_kind(api_version: &str, kind: &str) -> GroupVersionKind {
    let (group, version) = match api_version.rsplit_once('/') {
        Some((g, v)) => (g.to_string(), v.to_string()),
        None => (String::new(), api_version.to_string()),
    };

    GroupVersionKind {
        group,
        version,
        kind: kind.to_string(),
    }
}
