//! Tests for the conversion engine wiring

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::crd::{v1, v1alpha1};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

fn spoke_cluster(name: &str) -> v1alpha1::Cluster {
    serde_yaml::from_str(&format!(
        r#"
apiVersion: apps.kanta.io/v1alpha1
kind: Cluster
metadata:
  name: {name}
  namespace: default
spec:
  clusterDefinitionRef: redis
  clusterVersionRef: redis-7.0.6
  terminationPolicy: Delete
  componentSpecs:
    - name: redis
      componentDefRef: redis
      replicas: 2
"#
    ))
    .unwrap()
}

fn empty_hub_cluster() -> v1::Cluster {
    v1::Cluster::new("placeholder", Default::default())
}

/// Test: convert_to writes the hub object into a matching destination
#[test]
fn test_convert_to_writes_destination() {
    let engine = ConversionEngine::<ClusterConverter>::new();
    let spoke = spoke_cluster("alpha");
    let mut dst = empty_hub_cluster();

    engine.convert_to(&spoke, &mut dst).unwrap();

    assert_eq!(dst.metadata.name.as_deref(), Some("alpha"));
    assert_eq!(dst.spec.cluster_def, "redis");
}

/// Test: a destination of the wrong type is a wiring error
#[test]
fn test_convert_to_wrong_destination() {
    let engine = ConversionEngine::<ClusterConverter>::new();
    let spoke = spoke_cluster("alpha");
    let mut dst = v1alpha1::Cluster::new("other", spoke.spec.clone());

    let err = engine.convert_to(&spoke, &mut dst).unwrap_err();

    assert!(matches!(
        err,
        ConversionError::InvalidDestination { kind: "Cluster" }
    ));
    assert_eq!(dst.metadata.name.as_deref(), Some("other"));
}

/// Test: a failed conversion leaves the destination untouched
#[test]
fn test_convert_to_failure_leaves_destination() {
    let engine = ConversionEngine::<ClusterConverter>::new();
    let mut spoke = spoke_cluster("alpha");
    let component = spoke.spec.component_specs[0].clone();
    spoke.spec.component_specs.push(component);
    let mut dst = empty_hub_cluster();

    assert!(engine.convert_to(&spoke, &mut dst).is_err());
    assert_eq!(dst, empty_hub_cluster());
}

/// Test: convert_from restores the spoke from a hub handle
#[test]
fn test_convert_from_round_trip() {
    let engine = ConversionEngine::<ClusterConverter>::new();
    let original = spoke_cluster("alpha");
    let mut hub = engine.to_hub(&original).unwrap();
    let mut dst = spoke_cluster("placeholder");

    engine.convert_from(&mut dst, &mut hub).unwrap();

    provenance::clear(&mut dst.metadata);
    assert_eq!(dst, original);
    // The hub handle no longer carries the delta
    assert!(!hub
        .metadata
        .annotations
        .unwrap()
        .contains_key(DELTA_ANNOTATION));
}

/// Test: a source of the wrong type is a wiring error
#[test]
fn test_convert_from_wrong_source() {
    let engine = ConversionEngine::<ClusterConverter>::new();
    let mut dst = spoke_cluster("keep");
    let mut src = v1::ComponentDefinition::new("mysql", Default::default());

    let err = engine.convert_from(&mut dst, &mut src).unwrap_err();

    assert!(matches!(err, ConversionError::InvalidSource { kind: "Cluster" }));
    assert_eq!(dst.metadata.name.as_deref(), Some("keep"));
}

/// Test: a failed convert_from leaves the destination untouched
#[test]
fn test_convert_from_failure_leaves_destination() {
    let engine = ConversionEngine::<ClusterConverter>::new();
    let mut hub = engine.to_hub(&spoke_cluster("alpha")).unwrap();
    hub.metadata
        .annotations
        .as_mut()
        .unwrap()
        .insert(DELTA_ANNOTATION.to_string(), "{{{".to_string());
    let mut dst = spoke_cluster("keep");

    assert!(engine.convert_from(&mut dst, &mut hub).is_err());
    assert_eq!(dst, spoke_cluster("keep"));
}

/// Test: the engine works with any side channel implementation
#[test]
fn test_custom_side_channel() {
    let channel = AnnotationSideChannel::new("test.kanta.io/delta");
    let engine = ConversionEngine::<ClusterConverter, _>::with_channel(channel);
    let original = spoke_cluster("alpha");

    let mut hub = engine.to_hub(&original).unwrap();
    let annotations = hub.metadata.annotations.clone().unwrap();
    assert!(annotations.contains_key("test.kanta.io/delta"));
    assert!(!annotations.contains_key(DELTA_ANNOTATION));

    let mut restored = engine.from_hub(&mut hub).unwrap();
    provenance::clear(&mut restored.metadata);
    assert_eq!(restored, original);
}

/// Test: the two kinds do not read each other's deltas
#[test]
fn test_engines_are_per_kind() {
    let definitions = ConversionEngine::<ComponentDefinitionConverter>::new();
    let mut hub = v1::ComponentDefinition::new("mysql", Default::default());
    hub.metadata = ObjectMeta {
        name: Some("mysql".to_string()),
        annotations: Some(
            [(
                DELTA_ANNOTATION.to_string(),
                r#"{"spec":{"clusterVersionRef":"x"}}"#.to_string(),
            )]
            .into(),
        ),
        ..Default::default()
    };

    // Unknown fields are ignored; the ComponentDefinition delta is simply empty
    let spoke = definitions.from_hub(&mut hub).unwrap();
    assert!(spoke.spec.monitor.is_none());
}
