//! Version-independent types shared by v1alpha1 and v1
//!
//! Everything here has the same shape in both API versions, so the
//! conversion engine moves these values by plain clone. Version-specific
//! shapes live in `v1alpha1` and `v1`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a referenced variable must resolve
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum VarOption {
    Required,
    Optional,
}

/// How values are combined when a reference matches several objects
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum MultipleClusterObjectStrategy {
    Individual,
    Combined,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct MultipleClusterObjectOption {
    pub strategy: MultipleClusterObjectStrategy,
}

/// Identifies the object a variable is resolved from
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterObjectReference {
    /// Name (or prefix) of the ComponentDefinition the object belongs to
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comp_def: String,

    /// Name of the referenced object
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_cluster_object_option: Option<MultipleClusterObjectOption>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct NamedVar {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<VarOption>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceVars {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<VarOption>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancer: Option<VarOption>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<NamedVar>,
}

/// Selects a Service and the values to expose from it
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ServiceVarSelector {
    #[serde(flatten)]
    pub cluster_object_reference: ClusterObjectReference,

    #[serde(flatten)]
    pub service_vars: ServiceVars,
}

/// Reference to a service provided outside the cluster object
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRef {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_descriptor: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterComponentService {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_type: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_service: Option<bool>,
}

/// Cluster-wide service exposed for one or more components
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterService {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub component_selector: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaimSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_modes: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<k8s_openapi::api::core::v1::VolumeResourceRequirements>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_mode: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ClusterComponentVolumeClaimTemplate {
    pub name: String,

    #[serde(default)]
    pub spec: PersistentVolumeClaimSpec,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum IssuerName {
    Kanta,
    UserProvided,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct TlsSecretRef {
    pub name: String,
    pub ca: String,
    pub cert: String,
    pub key: String,
}

/// Issuer of the TLS certificates for a component
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Issuer {
    pub name: IssuerName,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<TlsSecretRef>,
}

/// Backup schedule attached to a cluster
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBackup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Retention, e.g. "7d" or "12h"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub retention_period: String,

    pub method: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cron_expression: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_deadline_minutes: Option<i64>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo_name: String,

    #[serde(rename = "pitrEnabled", skip_serializing_if = "Option::is_none")]
    pub pitr_enabled: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum ClusterPhase {
    Creating,
    Running,
    Updating,
    Stopping,
    Stopped,
    Deleting,
    Failed,
    Abnormal,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum ComponentPhase {
    Creating,
    Running,
    Updating,
    Stopping,
    Stopped,
    Deleting,
    Failed,
    Abnormal,
}

/// Order in which members of a component are updated
///
/// Called `updateStrategy` in v1alpha1 and `updateConcurrency` in v1.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum UpdateStrategy {
    Serial,
    BestEffortParallel,
    Parallel,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum TargetPodSelector {
    Any,
    All,
    Role,
    Ordinal,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum PreConditionType {
    Immediately,
    RuntimeReady,
    ComponentReady,
    ClusterReady,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    #[serde(default)]
    pub max_retries: i32,

    /// Interval between retries, in seconds
    #[serde(default)]
    pub retry_interval: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ReplicaRole {
    pub name: String,

    #[serde(default)]
    pub serviceable: bool,

    #[serde(default)]
    pub writable: bool,

    #[serde(default)]
    pub votable: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentVolume {
    pub name: String,

    #[serde(default)]
    pub need_snapshot: bool,

    /// Usage percentage that triggers a volume alert
    #[serde(default)]
    pub high_watermark: i32,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum AvailabilityPhase {
    Available,
    Unavailable,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDefinitionStatus {
    #[serde(default)]
    pub observed_generation: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<AvailabilityPhase>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}
