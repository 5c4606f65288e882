//! v1alpha1 CRD types (spoke)
//!
//! The original API version. Still served so existing manifests keep
//! working, but every object is stored as v1 and converted on read.

mod cluster;
mod component_definition;

pub use super::common::*;
pub use cluster::{
    Affinity, AvailabilityPolicy, ClassDefRef, Cluster, ClusterComponentSpec,
    ClusterComponentStatus, ClusterMonitor, ClusterNetwork, ClusterResources, ClusterSpec,
    ClusterStatus, ClusterStorage, ClusterSwitchPolicy, ConfigMapRef, MemberStatus,
    PodAntiAffinity, SecretRef, ShardingSpec, SwitchPolicyType, Tenancy, TerminationPolicy,
    UserResourceRefs,
};
pub use component_definition::{
    Action, BuiltinActionHandler, ComponentDefinition, ComponentDefinitionSpec,
    ComponentLifecycleActions, ComponentSwitchover, ComponentVarSelector, ComponentVars, EnvVar,
    ExecAction, ExporterConfig, LifecycleActionHandler, MonitorConfig, RoleArbitrator, RoleProbe,
    ScriptSpecSelector, VarSource,
};
