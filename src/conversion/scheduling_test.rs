//! Tests for scheduling policy derivation

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

fn toleration(key: &str) -> Toleration {
    Toleration {
        key: Some(key.to_string()),
        operator: Some("Exists".to_string()),
        effect: Some("NoSchedule".to_string()),
        ..Default::default()
    }
}

/// Test: an explicit affinity wins over the tenancy and availability shortcuts
#[test]
fn test_effective_affinity_prefers_explicit() {
    let explicit = Affinity {
        pod_anti_affinity: PodAntiAffinity::Required,
        topology_keys: vec!["rack".to_string()],
        ..Default::default()
    };

    let result = effective_affinity(
        Some(&explicit),
        Some(Tenancy::DedicatedNode),
        Some(AvailabilityPolicy::Zone),
    );

    assert_eq!(result, Some(explicit));
}

/// Test: availabilityPolicy maps to the matching topology key
#[test]
fn test_effective_affinity_from_availability_policy() {
    let zone = effective_affinity(None, None, Some(AvailabilityPolicy::Zone)).unwrap();
    assert_eq!(zone.topology_keys, vec![ZONE_TOPOLOGY_KEY.to_string()]);
    assert_eq!(zone.pod_anti_affinity, PodAntiAffinity::Preferred);

    let node = effective_affinity(None, None, Some(AvailabilityPolicy::Node)).unwrap();
    assert_eq!(node.topology_keys, vec![HOSTNAME_TOPOLOGY_KEY.to_string()]);

    let none = effective_affinity(None, None, Some(AvailabilityPolicy::None)).unwrap();
    assert!(none.topology_keys.is_empty());
}

/// Test: tenancy alone still yields an affinity carrying the tenancy
#[test]
fn test_effective_affinity_from_tenancy() {
    let affinity = effective_affinity(None, Some(Tenancy::SharedNode), None).unwrap();

    assert_eq!(affinity.tenancy, Some(Tenancy::SharedNode));
    assert!(affinity.topology_keys.is_empty());
}

/// Test: nothing set means no affinity
#[test]
fn test_effective_affinity_empty() {
    assert_eq!(effective_affinity(None, None, None), None);
}

/// Test: no affinity and no tolerations produce no policy
#[test]
fn test_no_policy_without_inputs() {
    assert!(build_scheduling_policy("mycluster", None, None, &[]).is_none());
}

/// Test: tolerations alone produce a policy without affinity
#[test]
fn test_tolerations_only() {
    let policy =
        build_scheduling_policy("mycluster", None, None, &[toleration("dedicated")]).unwrap();

    assert!(policy.affinity.is_none());
    assert_eq!(policy.tolerations.len(), 1);
    assert_eq!(policy.tolerations[0].key.as_deref(), Some("dedicated"));
}

/// Test: node labels become sorted In expressions of a required node affinity
#[test]
fn test_node_labels_sorted() {
    let affinity = Affinity {
        node_labels: BTreeMap::from([
            ("zeta".to_string(), "z".to_string()),
            ("alpha".to_string(), "a".to_string()),
            ("mid".to_string(), "m".to_string()),
        ]),
        ..Default::default()
    };

    let policy = build_scheduling_policy("mycluster", None, Some(&affinity), &[]).unwrap();

    let required = policy
        .affinity
        .unwrap()
        .node_affinity
        .unwrap()
        .required_during_scheduling_ignored_during_execution
        .unwrap();
    assert_eq!(required.node_selector_terms.len(), 1);
    let exprs = required.node_selector_terms[0]
        .match_expressions
        .clone()
        .unwrap();
    let keys: Vec<&str> = exprs.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    assert!(exprs.iter().all(|e| e.operator == "In"));
    assert_eq!(exprs[0].values, Some(vec!["a".to_string()]));
}

/// Test: preferred anti-affinity gets one weighted term per topology key
#[test]
fn test_preferred_anti_affinity() {
    let affinity = Affinity {
        pod_anti_affinity: PodAntiAffinity::Preferred,
        topology_keys: vec![ZONE_TOPOLOGY_KEY.to_string(), HOSTNAME_TOPOLOGY_KEY.to_string()],
        ..Default::default()
    };

    let policy =
        build_scheduling_policy("mycluster", Some("mysql"), Some(&affinity), &[]).unwrap();

    let anti = policy.affinity.unwrap().pod_anti_affinity.unwrap();
    assert!(anti.required_during_scheduling_ignored_during_execution.is_none());
    let preferred = anti
        .preferred_during_scheduling_ignored_during_execution
        .unwrap();
    assert_eq!(preferred.len(), 2);
    assert!(preferred.iter().all(|t| t.weight == 100));
    assert_eq!(preferred[0].pod_affinity_term.topology_key, ZONE_TOPOLOGY_KEY);

    let labels = preferred[0]
        .pod_affinity_term
        .label_selector
        .clone()
        .unwrap()
        .match_labels
        .unwrap();
    assert_eq!(labels.get(INSTANCE_LABEL).unwrap(), "mycluster");
    assert_eq!(labels.get(COMPONENT_NAME_LABEL).unwrap(), "mysql");
}

/// Test: required anti-affinity uses required terms; cluster-level terms omit the component label
#[test]
fn test_required_anti_affinity_cluster_level() {
    let affinity = Affinity {
        pod_anti_affinity: PodAntiAffinity::Required,
        topology_keys: vec![HOSTNAME_TOPOLOGY_KEY.to_string()],
        ..Default::default()
    };

    let policy = build_scheduling_policy("mycluster", None, Some(&affinity), &[]).unwrap();

    let anti = policy.affinity.unwrap().pod_anti_affinity.unwrap();
    assert!(anti.preferred_during_scheduling_ignored_during_execution.is_none());
    let required = anti.required_during_scheduling_ignored_during_execution.unwrap();
    assert_eq!(required.len(), 1);
    let labels = required[0].label_selector.clone().unwrap().match_labels.unwrap();
    assert!(!labels.contains_key(COMPONENT_NAME_LABEL));
}

/// Test: dedicated tenancy keeps other managed workloads off the node
#[test]
fn test_dedicated_node_tenancy() {
    let affinity = Affinity {
        tenancy: Some(Tenancy::DedicatedNode),
        ..Default::default()
    };

    let policy = build_scheduling_policy("mycluster", None, Some(&affinity), &[]).unwrap();

    let required = policy
        .affinity
        .unwrap()
        .pod_anti_affinity
        .unwrap()
        .required_during_scheduling_ignored_during_execution
        .unwrap();
    assert_eq!(required.len(), 1);
    assert_eq!(required[0].topology_key, HOSTNAME_TOPOLOGY_KEY);
    let expr = &required[0]
        .label_selector
        .as_ref()
        .unwrap()
        .match_expressions
        .as_ref()
        .unwrap()[0];
    assert_eq!(expr.key, WORKLOAD_TYPE_LABEL);
    assert_eq!(expr.operator, "Exists");
}

/// Test: an affinity that yields no terms leaves the policy affinity empty
#[test]
fn test_empty_affinity_yields_no_k8s_affinity() {
    let policy =
        build_scheduling_policy("mycluster", None, Some(&Affinity::default()), &[]).unwrap();

    assert!(policy.affinity.is_none());
    assert!(policy.tolerations.is_empty());
}

/// Test: component settings override cluster settings, unset ones fall back
#[test]
fn test_component_policy_fallback() {
    let cluster_affinity = Affinity {
        topology_keys: vec![ZONE_TOPOLOGY_KEY.to_string()],
        ..Default::default()
    };
    let component_affinity = Affinity {
        topology_keys: vec![HOSTNAME_TOPOLOGY_KEY.to_string()],
        ..Default::default()
    };
    let cluster_tolerations = vec![toleration("cluster")];

    let own = component_scheduling_policy(
        "mycluster",
        "redis",
        Some(&component_affinity),
        &[toleration("component")],
        Some(&cluster_affinity),
        &cluster_tolerations,
    )
    .unwrap();
    let preferred = own
        .affinity
        .unwrap()
        .pod_anti_affinity
        .unwrap()
        .preferred_during_scheduling_ignored_during_execution
        .unwrap();
    assert_eq!(preferred[0].pod_affinity_term.topology_key, HOSTNAME_TOPOLOGY_KEY);
    assert_eq!(own.tolerations[0].key.as_deref(), Some("component"));

    let inherited = component_scheduling_policy(
        "mycluster",
        "redis",
        None,
        &[],
        Some(&cluster_affinity),
        &cluster_tolerations,
    )
    .unwrap();
    let preferred = inherited
        .affinity
        .unwrap()
        .pod_anti_affinity
        .unwrap()
        .preferred_during_scheduling_ignored_during_execution
        .unwrap();
    assert_eq!(preferred[0].pod_affinity_term.topology_key, ZONE_TOPOLOGY_KEY);
    assert_eq!(inherited.tolerations[0].key.as_deref(), Some("cluster"));
}
