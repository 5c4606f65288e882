use k8s_openapi::api::core::v1::{ResourceRequirements, Toleration};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crd::common::{
    ClusterBackup, ClusterComponentService, ClusterComponentVolumeClaimTemplate, ClusterPhase,
    ClusterService, ComponentPhase, Issuer, ReplicaRole, ServiceRef, UpdateStrategy,
};

/// Cluster v1alpha1 - deprecated, served for existing clients
///
/// Carries several fields the v1 schema dropped (cluster version, tenancy,
/// availability policy, legacy per-component knobs). Those are preserved
/// across a v1 round trip by the conversion engine.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    group = "apps.kanta.io",
    version = "v1alpha1",
    kind = "Cluster",
    namespaced,
    status = "ClusterStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Cluster-Definition", "type":"string", "jsonPath":".spec.clusterDefinitionRef"}"#,
    printcolumn = r#"{"name":"Termination-Policy", "type":"string", "jsonPath":".spec.terminationPolicy"}"#,
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Name of the ClusterDefinition this cluster is built from
    #[serde(
        rename = "clusterDefinitionRef",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub cluster_definition_ref: String,

    /// Name of the ClusterVersion (removed in v1)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_version_ref: String,

    pub termination_policy: TerminationPolicy,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_specs: Vec<ClusterComponentSpec>,

    /// Sharded components. Order is significant to clients of this version.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sharding_specs: Vec<ShardingSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ClusterService>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenancy: Option<Tenancy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_policy: Option<AvailabilityPolicy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(default)]
    pub resources: ClusterResources,

    #[serde(default)]
    pub storage: ClusterStorage,

    #[serde(default)]
    pub monitor: ClusterMonitor,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<ClusterNetwork>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<ClusterBackup>,
}

/// What happens to a cluster's resources when it is deleted
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum TerminationPolicy {
    /// Deletion is blocked
    DoNotTerminate,
    /// Workloads are deleted, PVCs are kept. Not supported by v1.
    Halt,
    /// Workloads and PVCs are deleted
    #[default]
    Delete,
    /// Everything is deleted, including backups
    WipeOut,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum Tenancy {
    SharedNode,
    DedicatedNode,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityPolicy {
    Zone,
    Node,
    None,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum PodAntiAffinity {
    #[default]
    Preferred,
    Required,
}

/// Simplified placement rules for the pods of a cluster or component
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Affinity {
    #[serde(default)]
    pub pod_anti_affinity: PodAntiAffinity,

    /// Topology domains the pods should be spread over
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topology_keys: Vec<String>,

    /// Node labels the pods must be scheduled on
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_labels: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenancy: Option<Tenancy>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ClusterResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Quantity>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<Quantity>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ClusterStorage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<Quantity>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMonitor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitoring_interval: Option<IntOrString>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetwork {
    #[serde(default)]
    pub host_network_accessible: bool,

    #[serde(default)]
    pub publicly_accessible: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ClassDefRef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    pub class: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum SwitchPolicyType {
    Noop,
    MaximumAvailability,
    MaximumDataProtection,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ClusterSwitchPolicy {
    #[serde(rename = "type")]
    pub type_: SwitchPolicyType,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    pub name: String,
    pub mount_point: String,
    pub secret_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapRef {
    pub name: String,
    pub mount_point: String,
    pub config_map_name: String,
}

/// User-supplied Secrets and ConfigMaps mounted into the component pods
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResourceRefs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_refs: Vec<SecretRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_map_refs: Vec<ConfigMapRef>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterComponentSpec {
    pub name: String,

    /// Component name inside the referenced ClusterDefinition (removed in v1)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub component_def_ref: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub component_def: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_def_ref: Option<ClassDefRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_refs: Vec<ServiceRef>,

    #[serde(default)]
    pub monitor: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled_logs: Vec<String>,

    #[serde(default)]
    pub replicas: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_claim_templates: Vec<ClusterComponentVolumeClaimTemplate>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ClusterComponentService>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_policy: Option<ClusterSwitchPolicy>,

    #[serde(default)]
    pub tls: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Issuer>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account_name: String,

    #[serde(rename = "noCreatePDB", default)]
    pub no_create_pdb: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_strategy: Option<UpdateStrategy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_resource_refs: Option<UserResourceRefs>,
}

/// A component replicated into `shards` identical shards
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ShardingSpec {
    pub name: String,

    pub template: ClusterComponentSpec,

    #[serde(default)]
    pub shards: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default)]
    pub observed_generation: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<ClusterPhase>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Status per component and per sharding, keyed by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, ClusterComponentStatus>,

    #[serde(default)]
    pub cluster_def_generation: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterComponentStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<ComponentPhase>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub message: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pods_ready: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pods_ready_time: Option<Time>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members_status: Vec<MemberStatus>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberStatus {
    pub pod_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<ReplicaRole>,
}
