use k8s_openapi::api::core::v1::{self as corev1, PodSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crd::common::{
    ClusterObjectReference, ComponentDefinitionStatus, ComponentVolume, PreConditionType,
    ReplicaRole, RetryPolicy, ServiceVarSelector, TargetPodSelector, UpdateStrategy, VarOption,
};

/// ComponentDefinition v1alpha1 - deprecated, served for existing clients
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    group = "apps.kanta.io",
    version = "v1alpha1",
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

    /// Pod template for the component's workload
    #[serde(default)]
    pub runtime: PodSpec,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vars: Vec<EnvVar>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<ComponentVolume>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<ReplicaRole>,

    /// Removed in v1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arbitrator: Option<RoleArbitrator>,

    /// Renamed to `updateConcurrency` in v1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_strategy: Option<UpdateStrategy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_actions: Option<ComponentLifecycleActions>,

    /// Removed in v1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor: Option<MonitorConfig>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum RoleArbitrator {
    External,
    Lorry,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExporterConfig {
    pub scrape_port: IntOrString,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scrape_path: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    #[serde(default)]
    pub builtin: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exporter_config: Option<ExporterConfig>,
}

/// A variable resolved when a component is created
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

    /// Renamed to `podNames` in v1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_names: Option<VarOption>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ComponentVarSelector {
    #[serde(flatten)]
    pub cluster_object_reference: ClusterObjectReference,

    #[serde(flatten)]
    pub component_vars: ComponentVars,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ExecAction {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// A user-defined lifecycle action
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecAction>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<corev1::EnvVar>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_pod_selector: Option<TargetPodSelector>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub matching_key: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container: String,

    #[serde(default)]
    pub timeout_seconds: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_condition: Option<PreConditionType>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum BuiltinActionHandler {
    MySQL,
    PostgreSQL,
    Redis,
    MongoDB,
    Etcd,
    Custom,
    Unknown,
}

/// Either a builtin handler or a custom action
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleActionHandler {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builtin_handler: Option<BuiltinActionHandler>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_handler: Option<Action>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleProbe {
    #[serde(flatten)]
    pub handler: LifecycleActionHandler,

    #[serde(default)]
    pub initial_delay_seconds: i32,

    #[serde(default)]
    pub timeout_seconds: i32,

    #[serde(default)]
    pub period_seconds: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ScriptSpecSelector {
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSwitchover {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with_candidate: Option<Action>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub without_candidate: Option<Action>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub script_spec_selectors: Vec<ScriptSpecSelector>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentLifecycleActions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_provision: Option<LifecycleActionHandler>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_terminate: Option<LifecycleActionHandler>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_probe: Option<RoleProbe>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub switchover: Option<ComponentSwitchover>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_join: Option<LifecycleActionHandler>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_leave: Option<LifecycleActionHandler>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub readonly: Option<LifecycleActionHandler>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub readwrite: Option<LifecycleActionHandler>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dump: Option<LifecycleActionHandler>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_load: Option<LifecycleActionHandler>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconfigure: Option<LifecycleActionHandler>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_provision: Option<LifecycleActionHandler>,
}
