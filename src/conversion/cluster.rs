//! Cluster v1alpha1 <-> v1
//!
//! # Rules
//! - `clusterDefinitionRef` is renamed to `clusterDef`
//! - `terminationPolicy: Halt` becomes `DoNotTerminate` (one way; the
//!   result is tagged `NeedsReview`)
//! - `shardingSpecs` (ordered list) becomes `shardings` (map keyed by name);
//!   the list position travels in the delta
//! - `affinity`, `tolerations`, `tenancy` and `availabilityPolicy` derive a
//!   `schedulingPolicy` on the cluster and on every component (one way)
//! - component statuses named after a sharding move to `status.shardings`
//! - everything else v1 cannot hold is carried by [`ClusterDelta`]
//! - v1-only settings (`topology`, `runtimeClassName`, `shardingDef` and the
//!   per-component extras) are dropped on the way back and tag the result
//!   `NeedsReview`

use k8s_openapi::api::core::v1::Toleration;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::scheduling::{build_scheduling_policy, component_scheduling_policy, effective_affinity};
use super::{ConversionError, Fidelity, KindConverter};
use crate::crd::{v1, v1alpha1};

pub struct ClusterConverter;

/// Cluster fields v1 cannot express
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterDelta {
    #[serde(skip_serializing_if = "is_default")]
    pub spec: ClusterSpecDelta,

    #[serde(skip_serializing_if = "is_default")]
    pub status: ClusterStatusDelta,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterSpecDelta {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_version_ref: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity: Option<v1alpha1::Affinity>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenancy: Option<v1alpha1::Tenancy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_policy: Option<v1alpha1::AvailabilityPolicy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(skip_serializing_if = "is_default")]
    pub resources: v1alpha1::ClusterResources,

    #[serde(skip_serializing_if = "is_default")]
    pub storage: v1alpha1::ClusterStorage,

    #[serde(skip_serializing_if = "is_default")]
    pub monitor: v1alpha1::ClusterMonitor,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<v1alpha1::ClusterNetwork>,

    /// Keyed by component name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, ComponentDelta>,

    /// Keyed by sharding name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub shardings: BTreeMap<String, ShardingDelta>,
}

/// Per-component fields removed in v1
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ComponentDelta {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub component_def_ref: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_def_ref: Option<v1alpha1::ClassDefRef>,

    #[serde(skip_serializing_if = "is_default")]
    pub monitor: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enabled_logs: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity: Option<v1alpha1::Affinity>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_policy: Option<v1alpha1::ClusterSwitchPolicy>,

    #[serde(rename = "noCreatePDB", skip_serializing_if = "is_default")]
    pub no_create_pdb: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_strategy: Option<v1alpha1::UpdateStrategy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_resource_refs: Option<v1alpha1::UserResourceRefs>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ShardingDelta {
    /// Position in the v1alpha1 `shardingSpecs` list
    pub index: usize,

    #[serde(skip_serializing_if = "is_default")]
    pub template: ComponentDelta,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterStatusDelta {
    #[serde(skip_serializing_if = "is_default")]
    pub cluster_def_generation: i64,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, ComponentStatusDelta>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ComponentStatusDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pods_ready: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pods_ready_time: Option<Time>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members_status: Vec<v1alpha1::MemberStatus>,
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

impl KindConverter for ClusterConverter {
    type Spoke = v1alpha1::Cluster;
    type Hub = v1::Cluster;
    type Delta = ClusterDelta;

    const KIND: &'static str = "Cluster";

    fn map_to_hub(spoke: &v1alpha1::Cluster) -> v1::Cluster {
        let spec = &spoke.spec;
        v1::Cluster {
            metadata: ObjectMeta::default(),
            spec: v1::ClusterSpec {
                cluster_def: String::new(),
                topology: String::new(),
                termination_policy: v1::TerminationPolicy::default(),
                component_specs: spec.component_specs.iter().map(component_to_hub).collect(),
                shardings: BTreeMap::new(),
                runtime_class_name: None,
                scheduling_policy: None,
                services: spec.services.clone(),
                backup: spec.backup.clone(),
            },
            status: spoke.status.as_ref().map(status_to_hub),
        }
    }

    fn map_from_hub(hub: &v1::Cluster) -> v1alpha1::Cluster {
        let spec = &hub.spec;
        v1alpha1::Cluster {
            metadata: ObjectMeta::default(),
            spec: v1alpha1::ClusterSpec {
                cluster_definition_ref: String::new(),
                cluster_version_ref: String::new(),
                termination_policy: termination_policy_from_hub(spec.termination_policy),
                component_specs: spec.component_specs.iter().map(component_from_hub).collect(),
                sharding_specs: Vec::new(),
                services: spec.services.clone(),
                affinity: None,
                tolerations: Vec::new(),
                tenancy: None,
                availability_policy: None,
                replicas: None,
                resources: v1alpha1::ClusterResources::default(),
                storage: v1alpha1::ClusterStorage::default(),
                monitor: v1alpha1::ClusterMonitor::default(),
                network: None,
                backup: spec.backup.clone(),
            },
            status: hub.status.as_ref().map(status_from_hub),
        }
    }

    fn remap_to_hub(
        spoke: &v1alpha1::Cluster,
        hub: &mut v1::Cluster,
    ) -> Result<Fidelity, ConversionError> {
        let spec = &spoke.spec;
        let cluster_name = spoke.metadata.name.as_deref().unwrap_or_default();

        ensure_unique_components(&spec.component_specs)?;

        hub.spec.cluster_def = spec.cluster_definition_ref.clone();

        let (termination_policy, fidelity) = termination_policy_to_hub(spec.termination_policy);
        hub.spec.termination_policy = termination_policy;

        let cluster_affinity =
            effective_affinity(spec.affinity.as_ref(), spec.tenancy, spec.availability_policy);
        hub.spec.scheduling_policy = build_scheduling_policy(
            cluster_name,
            None,
            cluster_affinity.as_ref(),
            &spec.tolerations,
        );

        for (spoke_comp, hub_comp) in spec.component_specs.iter().zip(&mut hub.spec.component_specs) {
            hub_comp.scheduling_policy = component_scheduling_policy(
                cluster_name,
                &spoke_comp.name,
                spoke_comp.affinity.as_ref(),
                &spoke_comp.tolerations,
                cluster_affinity.as_ref(),
                &spec.tolerations,
            );
        }

        for sharding in &spec.sharding_specs {
            if hub.spec.shardings.contains_key(&sharding.name) {
                return Err(ConversionError::DuplicateName {
                    field: "shardingSpecs",
                    name: sharding.name.clone(),
                });
            }
            let mut template = component_to_hub(&sharding.template);
            template.scheduling_policy = component_scheduling_policy(
                cluster_name,
                &sharding.name,
                sharding.template.affinity.as_ref(),
                &sharding.template.tolerations,
                cluster_affinity.as_ref(),
                &spec.tolerations,
            );
            hub.spec.shardings.insert(
                sharding.name.clone(),
                v1::ClusterSharding {
                    sharding_def: String::new(),
                    template,
                    shards: sharding.shards,
                },
            );
        }

        if let Some(status) = hub.status.as_mut() {
            for name in hub.spec.shardings.keys() {
                if let Some(component_status) = status.components.remove(name) {
                    status.shardings.insert(name.clone(), component_status);
                }
            }
        }

        Ok(fidelity)
    }

    fn remap_from_hub(
        hub: &v1::Cluster,
        spoke: &mut v1alpha1::Cluster,
        delta: Option<&ClusterDelta>,
    ) -> Fidelity {
        spoke.spec.cluster_definition_ref = hub.spec.cluster_def.clone();

        // Recorded positions first, then shardings only v1 knows about in
        // name order
        let positions = delta.map(|d| &d.spec.shardings);
        let mut shardings: Vec<(Option<usize>, &String, &v1::ClusterSharding)> = hub
            .spec
            .shardings
            .iter()
            .map(|(name, sharding)| {
                let index = positions.and_then(|p| p.get(name)).map(|d| d.index);
                (index, name, sharding)
            })
            .collect();
        shardings.sort_by_key(|(index, _, _)| (index.is_none(), *index));

        spoke.spec.sharding_specs = shardings
            .into_iter()
            .map(|(_, name, sharding)| v1alpha1::ShardingSpec {
                name: name.clone(),
                template: component_from_hub(&sharding.template),
                shards: sharding.shards,
            })
            .collect();

        if let (Some(hub_status), Some(spoke_status)) = (hub.status.as_ref(), spoke.status.as_mut())
        {
            for (name, sharding_status) in &hub_status.shardings {
                spoke_status
                    .components
                    .insert(name.clone(), component_status_from_hub(sharding_status));
            }
        }

        // Without a delta the derived scheduling policies cannot be turned
        // back into v1alpha1 placement settings
        if (delta.is_none() && has_scheduling_policy(hub)) || has_hub_only_settings(hub) {
            Fidelity::Lossy
        } else {
            Fidelity::Exact
        }
    }

    fn capture(spoke: &v1alpha1::Cluster) -> ClusterDelta {
        let spec = &spoke.spec;

        let components = spec
            .component_specs
            .iter()
            .map(|c| (c.name.clone(), capture_component(c)))
            .filter(|(_, d)| !is_default(d))
            .collect();

        let shardings = spec
            .sharding_specs
            .iter()
            .enumerate()
            .map(|(index, s)| {
                (
                    s.name.clone(),
                    ShardingDelta {
                        index,
                        template: capture_component(&s.template),
                    },
                )
            })
            .collect();

        let status = spoke
            .status
            .as_ref()
            .map(|status| ClusterStatusDelta {
                cluster_def_generation: status.cluster_def_generation,
                components: status
                    .components
                    .iter()
                    .map(|(name, c)| {
                        (
                            name.clone(),
                            ComponentStatusDelta {
                                pods_ready: c.pods_ready,
                                pods_ready_time: c.pods_ready_time.clone(),
                                members_status: c.members_status.clone(),
                            },
                        )
                    })
                    .filter(|(_, d)| !is_default(d))
                    .collect(),
            })
            .unwrap_or_default();

        ClusterDelta {
            spec: ClusterSpecDelta {
                cluster_version_ref: spec.cluster_version_ref.clone(),
                affinity: spec.affinity.clone(),
                tolerations: spec.tolerations.clone(),
                tenancy: spec.tenancy,
                availability_policy: spec.availability_policy,
                replicas: spec.replicas,
                resources: spec.resources.clone(),
                storage: spec.storage.clone(),
                monitor: spec.monitor.clone(),
                network: spec.network.clone(),
                components,
                shardings,
            },
            status,
        }
    }

    fn apply(spoke: &mut v1alpha1::Cluster, delta: ClusterDelta) {
        let ClusterDelta {
            spec: mut spec_delta,
            status: mut status_delta,
        } = delta;
        let spec = &mut spoke.spec;

        spec.cluster_version_ref = spec_delta.cluster_version_ref;
        spec.affinity = spec_delta.affinity;
        spec.tolerations = spec_delta.tolerations;
        spec.tenancy = spec_delta.tenancy;
        spec.availability_policy = spec_delta.availability_policy;
        spec.replicas = spec_delta.replicas;
        spec.resources = spec_delta.resources;
        spec.storage = spec_delta.storage;
        spec.monitor = spec_delta.monitor;
        spec.network = spec_delta.network;

        for component in &mut spec.component_specs {
            if let Some(d) = spec_delta.components.remove(&component.name) {
                apply_component(component, d);
            }
        }
        for sharding in &mut spec.sharding_specs {
            if let Some(d) = spec_delta.shardings.remove(&sharding.name) {
                apply_component(&mut sharding.template, d.template);
            }
        }

        if let Some(status) = spoke.status.as_mut() {
            status.cluster_def_generation = status_delta.cluster_def_generation;
            for (name, component_status) in &mut status.components {
                if let Some(d) = status_delta.components.remove(name) {
                    component_status.pods_ready = d.pods_ready;
                    component_status.pods_ready_time = d.pods_ready_time;
                    component_status.members_status = d.members_status;
                }
            }
        }
    }
}

fn termination_policy_to_hub(policy: v1alpha1::TerminationPolicy) -> (v1::TerminationPolicy, Fidelity) {
    match policy {
        v1alpha1::TerminationPolicy::DoNotTerminate => {
            (v1::TerminationPolicy::DoNotTerminate, Fidelity::Exact)
        }
        // v1 has no Halt; DoNotTerminate is the closest policy that still
        // keeps the data
        v1alpha1::TerminationPolicy::Halt => (v1::TerminationPolicy::DoNotTerminate, Fidelity::Lossy),
        v1alpha1::TerminationPolicy::Delete => (v1::TerminationPolicy::Delete, Fidelity::Exact),
        v1alpha1::TerminationPolicy::WipeOut => (v1::TerminationPolicy::WipeOut, Fidelity::Exact),
    }
}

fn termination_policy_from_hub(policy: v1::TerminationPolicy) -> v1alpha1::TerminationPolicy {
    match policy {
        v1::TerminationPolicy::DoNotTerminate => v1alpha1::TerminationPolicy::DoNotTerminate,
        v1::TerminationPolicy::Delete => v1alpha1::TerminationPolicy::Delete,
        v1::TerminationPolicy::WipeOut => v1alpha1::TerminationPolicy::WipeOut,
    }
}

fn component_to_hub(c: &v1alpha1::ClusterComponentSpec) -> v1::ClusterComponentSpec {
    v1::ClusterComponentSpec {
        name: c.name.clone(),
        component_def: c.component_def.clone(),
        service_version: String::new(),
        service_refs: c.service_refs.clone(),
        labels: BTreeMap::new(),
        annotations: BTreeMap::new(),
        env: Vec::new(),
        replicas: c.replicas,
        scheduling_policy: None,
        resources: c.resources.clone(),
        volume_claim_templates: c.volume_claim_templates.clone(),
        services: c.services.clone(),
        tls: c.tls,
        issuer: c.issuer.clone(),
        service_account_name: c.service_account_name.clone(),
        parallel_pod_management_concurrency: None,
        pod_update_policy: None,
        disable_exporter: None,
        stop: None,
    }
}

fn component_from_hub(c: &v1::ClusterComponentSpec) -> v1alpha1::ClusterComponentSpec {
    v1alpha1::ClusterComponentSpec {
        name: c.name.clone(),
        component_def_ref: String::new(),
        component_def: c.component_def.clone(),
        class_def_ref: None,
        service_refs: c.service_refs.clone(),
        monitor: false,
        enabled_logs: Vec::new(),
        replicas: c.replicas,
        affinity: None,
        tolerations: Vec::new(),
        resources: c.resources.clone(),
        volume_claim_templates: c.volume_claim_templates.clone(),
        services: c.services.clone(),
        switch_policy: None,
        tls: c.tls,
        issuer: c.issuer.clone(),
        service_account_name: c.service_account_name.clone(),
        no_create_pdb: false,
        update_strategy: None,
        user_resource_refs: None,
    }
}

fn status_to_hub(status: &v1alpha1::ClusterStatus) -> v1::ClusterStatus {
    v1::ClusterStatus {
        observed_generation: status.observed_generation,
        phase: status.phase,
        message: status.message.clone(),
        components: status
            .components
            .iter()
            .map(|(name, c)| {
                (
                    name.clone(),
                    v1::ClusterComponentStatus {
                        phase: c.phase,
                        message: c.message.clone(),
                    },
                )
            })
            .collect(),
        shardings: BTreeMap::new(),
        conditions: status.conditions.clone(),
    }
}

fn status_from_hub(status: &v1::ClusterStatus) -> v1alpha1::ClusterStatus {
    v1alpha1::ClusterStatus {
        observed_generation: status.observed_generation,
        phase: status.phase,
        message: status.message.clone(),
        components: status
            .components
            .iter()
            .map(|(name, c)| (name.clone(), component_status_from_hub(c)))
            .collect(),
        cluster_def_generation: 0,
        conditions: status.conditions.clone(),
    }
}

fn component_status_from_hub(c: &v1::ClusterComponentStatus) -> v1alpha1::ClusterComponentStatus {
    v1alpha1::ClusterComponentStatus {
        phase: c.phase,
        message: c.message.clone(),
        pods_ready: None,
        pods_ready_time: None,
        members_status: Vec::new(),
    }
}

fn capture_component(c: &v1alpha1::ClusterComponentSpec) -> ComponentDelta {
    ComponentDelta {
        component_def_ref: c.component_def_ref.clone(),
        class_def_ref: c.class_def_ref.clone(),
        monitor: c.monitor,
        enabled_logs: c.enabled_logs.clone(),
        affinity: c.affinity.clone(),
        tolerations: c.tolerations.clone(),
        switch_policy: c.switch_policy.clone(),
        no_create_pdb: c.no_create_pdb,
        update_strategy: c.update_strategy,
        user_resource_refs: c.user_resource_refs.clone(),
    }
}

fn apply_component(c: &mut v1alpha1::ClusterComponentSpec, d: ComponentDelta) {
    c.component_def_ref = d.component_def_ref;
    c.class_def_ref = d.class_def_ref;
    c.monitor = d.monitor;
    c.enabled_logs = d.enabled_logs;
    c.affinity = d.affinity;
    c.tolerations = d.tolerations;
    c.switch_policy = d.switch_policy;
    c.no_create_pdb = d.no_create_pdb;
    c.update_strategy = d.update_strategy;
    c.user_resource_refs = d.user_resource_refs;
}

/// Component deltas are keyed by name, so two components sharing a name
/// would overwrite each other's data
fn ensure_unique_components(
    components: &[v1alpha1::ClusterComponentSpec],
) -> Result<(), ConversionError> {
    let mut seen = BTreeSet::new();
    for component in components {
        if !seen.insert(component.name.as_str()) {
            return Err(ConversionError::DuplicateName {
                field: "componentSpecs",
                name: component.name.clone(),
            });
        }
    }
    Ok(())
}

fn has_scheduling_policy(hub: &v1::Cluster) -> bool {
    hub.spec.scheduling_policy.is_some()
        || hub
            .spec
            .component_specs
            .iter()
            .any(|c| c.scheduling_policy.is_some())
        || hub
            .spec
            .shardings
            .values()
            .any(|s| s.template.scheduling_policy.is_some())
}

/// Settings only v1 has; the delta never carries them
fn has_hub_only_settings(hub: &v1::Cluster) -> bool {
    let spec = &hub.spec;
    !spec.topology.is_empty()
        || spec.runtime_class_name.is_some()
        || spec.component_specs.iter().any(component_has_hub_only_settings)
        || spec.shardings.values().any(|sharding| {
            !sharding.sharding_def.is_empty() || component_has_hub_only_settings(&sharding.template)
        })
}

fn component_has_hub_only_settings(c: &v1::ClusterComponentSpec) -> bool {
    !c.service_version.is_empty()
        || !c.labels.is_empty()
        || !c.annotations.is_empty()
        || !c.env.is_empty()
        || c.parallel_pod_management_concurrency.is_some()
        || c.pod_update_policy.is_some()
        || c.disable_exporter.is_some()
        || c.stop.is_some()
}

#[cfg(test)]
#[path = "cluster_test.rs"]
mod tests;
