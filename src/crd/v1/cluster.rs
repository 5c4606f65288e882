use k8s_openapi::api::core::v1::{
    Affinity, EnvVar, ResourceRequirements, Toleration, TopologySpreadConstraint,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crd::common::{
    ClusterBackup, ClusterComponentService, ClusterComponentVolumeClaimTemplate, ClusterPhase,
    ClusterService, ComponentPhase, Issuer, ServiceRef,
};

/// Cluster v1 - storage version
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "apps.kanta.io",
    version = "v1",
    kind = "Cluster",
    namespaced,
    status = "ClusterStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Cluster-Definition", "type":"string", "jsonPath":".spec.clusterDef"}"#,
    printcolumn = r#"{"name":"Termination-Policy", "type":"string", "jsonPath":".spec.terminationPolicy"}"#,
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Name of the ClusterDefinition this cluster is built from
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_def: String,

    /// Topology of the ClusterDefinition to use
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub topology: String,

    pub termination_policy: TerminationPolicy,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_specs: Vec<ClusterComponentSpec>,

    /// Sharded components keyed by sharding name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub shardings: BTreeMap<String, ClusterSharding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_class_name: Option<String>,

    /// Default scheduling policy for all components
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduling_policy: Option<SchedulingPolicy>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ClusterService>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<ClusterBackup>,
}

/// What happens to a cluster's resources when it is deleted
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum TerminationPolicy {
    DoNotTerminate,
    #[default]
    Delete,
    WipeOut,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingPolicy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scheduler_name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub node_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topology_spread_constraints: Vec<TopologySpreadConstraint>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum PodUpdatePolicy {
    StrictInPlace,
    PreferInPlace,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterComponentSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub component_def: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_version: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_refs: Vec<ServiceRef>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    #[serde(default)]
    pub replicas: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduling_policy: Option<SchedulingPolicy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_claim_templates: Vec<ClusterComponentVolumeClaimTemplate>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ClusterComponentService>,

    #[serde(default)]
    pub tls: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Issuer>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_pod_management_concurrency: Option<IntOrString>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_update_policy: Option<PodUpdatePolicy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_exporter: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSharding {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sharding_def: String,

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

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, ClusterComponentStatus>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub shardings: BTreeMap<String, ClusterComponentStatus>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ClusterComponentStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<ComponentPhase>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub message: BTreeMap<String, String>,
}
