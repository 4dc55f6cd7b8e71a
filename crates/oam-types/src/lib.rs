//! Shared data model for the Application reconciliation engine: the CRDs persisted in the
//! cluster (`Application`, `ApplicationRevision`, `ResourceTracker`, `*Definition`, `Cluster`)
//! and the plain structs embedded in their specs (`Component`, `Trait`, `Policy`,
//! `WorkflowStep`).

pub mod application;
pub mod cluster;
pub mod definition;
pub mod hash;
pub mod policy;
pub mod revision;
pub mod tracker;
pub mod workflow;

pub use application::{
    Application, ApplicationPhase, ApplicationSpec, ApplicationStatus, Component,
    LatestRevision, ServiceStatus, StepStatus, Trait, TraitStatus, WorkflowStatus,
};
pub use cluster::{Cluster, ClusterSpec, SecretClassRef, LOCAL_CLUSTER};
pub use definition::{
    Attributes, ComponentDefinition, DefinitionKind, PolicyDefinition, Schematic,
    TraitDefinition, WorkflowStepDefinition,
};
pub use hash::revision_hash;
pub use policy::{GcRule, GcStrategy, Policy, Selector, SelectorCandidate};
pub use revision::{ApplicationRevision, ApplicationRevisionSpec};
pub use tracker::{Creator, ResourceTracker, ResourceTrackerEntry, ResourceTrackerSpec};
pub use workflow::{Workflow, WorkflowStep};
