//! Derive a v1 scheduling policy from v1alpha1 placement settings
//!
//! v1alpha1 expresses placement as a simplified affinity plus the
//! cluster-level `tenancy` and `availabilityPolicy` shortcuts. v1 only has a
//! Kubernetes-native `schedulingPolicy`. The derivation runs on the way to
//! the hub only; the original placement settings travel in the delta.

use k8s_openapi::api::core::v1::{
    self as corev1, NodeAffinity, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm,
    PodAffinityTerm, Toleration, WeightedPodAffinityTerm,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use std::collections::BTreeMap;

use crate::crd::v1::SchedulingPolicy;
use crate::crd::v1alpha1::{Affinity, AvailabilityPolicy, PodAntiAffinity, Tenancy};

pub const ZONE_TOPOLOGY_KEY: &str = "topology.kubernetes.io/zone";
pub const HOSTNAME_TOPOLOGY_KEY: &str = "kubernetes.io/hostname";

/// Label carrying the owning cluster name on every pod
pub const INSTANCE_LABEL: &str = "app.kubernetes.io/instance";

/// Label carrying the component name on every pod
pub const COMPONENT_NAME_LABEL: &str = "apps.kanta.io/component-name";

/// Present on every pod managed by the operator, whatever its cluster
pub const WORKLOAD_TYPE_LABEL: &str = "apps.kanta.io/workload-type";

/// Weight given to preferred anti-affinity terms
const PREFERRED_WEIGHT: i32 = 100;

/// Cluster-level affinity after applying the `tenancy` and
/// `availabilityPolicy` shortcuts
///
/// An explicit affinity always wins. Otherwise the shortcuts produce a
/// preferred anti-affinity over the matching topology key.
pub fn effective_affinity(
    affinity: Option<&Affinity>,
    tenancy: Option<Tenancy>,
    availability_policy: Option<AvailabilityPolicy>,
) -> Option<Affinity> {
    if let Some(affinity) = affinity {
        return Some(affinity.clone());
    }
    if tenancy.is_none() && availability_policy.is_none() {
        return None;
    }

    let topology_keys = match availability_policy {
        Some(AvailabilityPolicy::Zone) => vec![ZONE_TOPOLOGY_KEY.to_string()],
        Some(AvailabilityPolicy::Node) => vec![HOSTNAME_TOPOLOGY_KEY.to_string()],
        Some(AvailabilityPolicy::None) | None => Vec::new(),
    };

    Some(Affinity {
        pod_anti_affinity: PodAntiAffinity::Preferred,
        topology_keys,
        node_labels: BTreeMap::new(),
        tenancy,
    })
}

/// Build the hub scheduling policy for a cluster or one of its components
///
/// `component` is `None` for the cluster-wide default policy. Returns `None`
/// when there is nothing to schedule on.
pub fn build_scheduling_policy(
    cluster_name: &str,
    component: Option<&str>,
    affinity: Option<&Affinity>,
    tolerations: &[Toleration],
) -> Option<SchedulingPolicy> {
    if affinity.is_none() && tolerations.is_empty() {
        return None;
    }

    Some(SchedulingPolicy {
        affinity: affinity.and_then(|a| build_pod_affinity(cluster_name, component, a)),
        tolerations: tolerations.to_vec(),
        ..Default::default()
    })
}

/// Scheduling policy for one component, falling back to the cluster-level
/// placement for whatever the component leaves unset
pub fn component_scheduling_policy(
    cluster_name: &str,
    component: &str,
    affinity: Option<&Affinity>,
    tolerations: &[Toleration],
    cluster_affinity: Option<&Affinity>,
    cluster_tolerations: &[Toleration],
) -> Option<SchedulingPolicy> {
    let affinity = affinity.or(cluster_affinity);
    let tolerations = if tolerations.is_empty() {
        cluster_tolerations
    } else {
        tolerations
    };
    build_scheduling_policy(cluster_name, Some(component), affinity, tolerations)
}

fn build_pod_affinity(
    cluster_name: &str,
    component: Option<&str>,
    affinity: &Affinity,
) -> Option<corev1::Affinity> {
    let node_affinity = build_node_affinity(&affinity.node_labels);
    let pod_anti_affinity = build_pod_anti_affinity(cluster_name, component, affinity);

    if node_affinity.is_none() && pod_anti_affinity.is_none() {
        return None;
    }
    Some(corev1::Affinity {
        node_affinity,
        pod_affinity: None,
        pod_anti_affinity,
    })
}

fn build_node_affinity(node_labels: &BTreeMap<String, String>) -> Option<NodeAffinity> {
    if node_labels.is_empty() {
        return None;
    }

    // BTreeMap iteration yields the expressions sorted by key
    let match_expressions = node_labels
        .iter()
        .map(|(key, value)| NodeSelectorRequirement {
            key: key.clone(),
            operator: "In".to_string(),
            values: Some(vec![value.clone()]),
        })
        .collect();

    Some(NodeAffinity {
        required_during_scheduling_ignored_during_execution: Some(NodeSelector {
            node_selector_terms: vec![NodeSelectorTerm {
                match_expressions: Some(match_expressions),
                match_fields: None,
            }],
        }),
        preferred_during_scheduling_ignored_during_execution: None,
    })
}

fn build_pod_anti_affinity(
    cluster_name: &str,
    component: Option<&str>,
    affinity: &Affinity,
) -> Option<corev1::PodAntiAffinity> {
    let selector = instance_selector(cluster_name, component);

    let spread_terms: Vec<PodAffinityTerm> = affinity
        .topology_keys
        .iter()
        .map(|key| PodAffinityTerm {
            label_selector: Some(selector.clone()),
            topology_key: key.clone(),
            ..Default::default()
        })
        .collect();

    let mut required = Vec::new();
    let mut preferred = Vec::new();
    match affinity.pod_anti_affinity {
        PodAntiAffinity::Required => required.extend(spread_terms),
        PodAntiAffinity::Preferred => {
            preferred.extend(spread_terms.into_iter().map(|term| WeightedPodAffinityTerm {
                pod_affinity_term: term,
                weight: PREFERRED_WEIGHT,
            }))
        }
    }

    if affinity.tenancy == Some(Tenancy::DedicatedNode) {
        // Keep every other managed workload off the node
        required.push(PodAffinityTerm {
            label_selector: Some(LabelSelector {
                match_expressions: Some(vec![LabelSelectorRequirement {
                    key: WORKLOAD_TYPE_LABEL.to_string(),
                    operator: "Exists".to_string(),
                    values: None,
                }]),
                match_labels: None,
            }),
            topology_key: HOSTNAME_TOPOLOGY_KEY.to_string(),
            ..Default::default()
        });
    }

    if required.is_empty() && preferred.is_empty() {
        return None;
    }
    Some(corev1::PodAntiAffinity {
        required_during_scheduling_ignored_during_execution: (!required.is_empty())
            .then_some(required),
        preferred_during_scheduling_ignored_during_execution: (!preferred.is_empty())
            .then_some(preferred),
    })
}

fn instance_selector(cluster_name: &str, component: Option<&str>) -> LabelSelector {
    let mut labels = BTreeMap::from([(INSTANCE_LABEL.to_string(), cluster_name.to_string())]);
    if let Some(component) = component {
        labels.insert(COMPONENT_NAME_LABEL.to_string(), component.to_string());
    }
    LabelSelector {
        match_expressions: None,
        match_labels: Some(labels),
    }
}

#[cfg(test)]
#[path = "scheduling_test.rs"]
mod tests;
