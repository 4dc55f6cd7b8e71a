use const_format::concatcp;

/// The well-known OAM application key prefix.
const OAM_APP_KEY_PREFIX: &str = "app.oam.dev/";

/// The well-known OAM trait key prefix.
const OAM_TRAIT_KEY_PREFIX: &str = "trait.oam.dev/";

/// `app.oam.dev/name` — the name of the owning Application. Set on every manifest the
/// renderer (C3) produces. See spec §4.3 and scenario S1.
pub const OAM_APP_NAME_KEY: &str = concatcp!(OAM_APP_KEY_PREFIX, "name");

/// `app.oam.dev/component` — the name of the component that produced this manifest.
pub const OAM_APP_COMPONENT_KEY: &str = concatcp!(OAM_APP_KEY_PREFIX, "component");

/// `app.oam.dev/revision` — the `ApplicationRevision` this manifest was rendered from.
pub const OAM_APP_REVISION_KEY: &str = concatcp!(OAM_APP_KEY_PREFIX, "revision");

/// `app.oam.dev/cluster` — the target cluster this manifest was dispatched to.
pub const OAM_APP_CLUSTER_KEY: &str = concatcp!(OAM_APP_KEY_PREFIX, "cluster");

/// `app.oam.dev/sharers` — ordered, comma-separated list of Applications jointly owning a
/// `shared-resource`-matched object, oldest (first) joiner first. Only the first sharer may
/// mutate the object; later sharers get read-only access (spec §3, §4.4).
pub const OAM_SHARERS_KEY: &str = concatcp!(OAM_APP_KEY_PREFIX, "sharers");

/// `trait.oam.dev/type` — the type of the trait that produced (or patched) this manifest.
pub const OAM_TRAIT_TYPE_KEY: &str = concatcp!(OAM_TRAIT_KEY_PREFIX, "type");

/// `trait.oam.dev/resource` — the short name of a sibling resource a trait emitted via
/// `outputs`, distinguishing it from the trait's patch target.
pub const OAM_TRAIT_RESOURCE_KEY: &str = concatcp!(OAM_TRAIT_KEY_PREFIX, "resource");
