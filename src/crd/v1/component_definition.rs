use k8s_openapi::api::core::v1::{self as corev1, PodSpec};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crd::common::{
    ClusterObjectReference, ComponentDefinitionStatus, ComponentVolume, PreConditionType,
    ReplicaRole, RetryPolicy, ServiceVarSelector, TargetPodSelector, UpdateStrategy, VarOption,
};

/// Member update order; same values as v1alpha1's `UpdateStrategy`
pub type UpdateConcurrency = UpdateStrategy;

/// ComponentDefinition v1 - storage version
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "apps.kanta.io",
    version = "v1",
    kind = "ComponentDefinition",
    status = "ComponentDefinitionStatus",
    derive = "PartialEq",
    shortname = "cmpd",
    printcolumn = r#"{"name":"Service", "type":"string", "jsonPath":".spec.serviceKind"}"#,
    printcolumn = r#"{"name":"Service-Version", "type":"string", "jsonPath":".spec.serviceVersion"}"#,
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDefinitionSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_kind: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_version: String,

    #[serde(default)]
    pub runtime: PodSpec,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vars: Vec<EnvVar>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<ComponentVolume>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<ReplicaRole>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_concurrency: Option<UpdateConcurrency>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_actions: Option<ComponentLifecycleActions>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_from: Option<VarSource>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VarSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_map_key_ref: Option<corev1::ConfigMapKeySelector>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<corev1::SecretKeySelector>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_var_ref: Option<ServiceVarSelector>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_var_ref: Option<ComponentVarSelector>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentVars {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_name: Option<VarOption>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<VarOption>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_names: Option<VarOption>,

    #[serde(rename = "podFQDNs", skip_serializing_if = "Option::is_none")]
    pub pod_fqdns: Option<VarOption>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ComponentVarSelector {
    #[serde(flatten)]
    pub cluster_object_reference: ClusterObjectReference,

    #[serde(flatten)]
    pub component_vars: ComponentVars,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecAction {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<corev1::EnvVar>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_pod_selector: Option<TargetPodSelector>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub matching_key: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecAction>,

    #[serde(default)]
    pub timeout_seconds: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_condition: Option<PreConditionType>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    #[serde(flatten)]
    pub action: Action,

    #[serde(default)]
    pub initial_delay_seconds: i32,

    #[serde(default)]
    pub period_seconds: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentLifecycleActions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_provision: Option<Action>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_terminate: Option<Action>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_probe: Option<Probe>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub switchover: Option<Action>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_join: Option<Action>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_leave: Option<Action>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub readonly: Option<Action>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub readwrite: Option<Action>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dump: Option<Action>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_load: Option<Action>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconfigure: Option<Action>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_provision: Option<Action>,
}
