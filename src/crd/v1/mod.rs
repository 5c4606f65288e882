//! v1 CRD types (hub)
//!
//! Canonical storage version. v1alpha1 objects convert to and from these
//! types; see `crate::conversion`.

mod cluster;
mod component_definition;

pub use super::common::*;
pub use cluster::{
    Cluster, ClusterComponentSpec, ClusterComponentStatus, ClusterSharding, ClusterSpec,
    ClusterStatus, PodUpdatePolicy, SchedulingPolicy, TerminationPolicy,
};
pub use component_definition::{
    Action, ComponentDefinition, ComponentDefinitionSpec, ComponentLifecycleActions,
    ComponentVarSelector, ComponentVars, EnvVar, ExecAction, Probe, UpdateConcurrency, VarSource,
};
