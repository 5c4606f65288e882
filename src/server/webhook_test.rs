//! Tests for the CRD conversion webhook

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::conversion::{provenance, DELTA_ANNOTATION};
use crate::server::metrics::create_metrics;
use serde_json::json;

fn request(uid: &str, desired: &str, objects: Vec<Value>) -> ConversionRequest {
    ConversionRequest {
        uid: uid.to_string(),
        desired_api_version: desired.to_string(),
        objects,
    }
}

fn spoke_cluster(name: &str) -> Value {
    json!({
        "apiVersion": "apps.kanta.io/v1alpha1",
        "kind": "Cluster",
        "metadata": {
            "name": name,
            "namespace": "default",
            "labels": {"team": "data"},
        },
        "spec": {
            "clusterDefinitionRef": "postgresql",
            "clusterVersionRef": "postgresql-14.8.0",
            "terminationPolicy": "Halt",
            "componentSpecs": [{
                "name": "postgresql",
                "componentDefRef": "postgresql",
                "replicas": 2,
            }],
        },
    })
}

/// Test: a v1alpha1 Cluster is converted to v1
#[test]
fn test_convert_cluster_to_hub() {
    let response = convert_review(
        request("uid-1", "apps.kanta.io/v1", vec![spoke_cluster("pg")]),
        None,
    );

    assert_eq!(response.result.status, "Success");
    assert_eq!(response.uid, "uid-1");
    assert_eq!(response.converted_objects.len(), 1);

    let converted = &response.converted_objects[0];
    assert_eq!(converted["apiVersion"], "apps.kanta.io/v1");
    assert_eq!(converted["kind"], "Cluster");
    assert_eq!(converted["spec"]["clusterDef"], "postgresql");
    assert_eq!(converted["spec"]["terminationPolicy"], "DoNotTerminate");
    assert_eq!(converted["metadata"]["labels"]["team"], "data");

    let annotations = converted["metadata"]["annotations"].as_object().unwrap();
    assert!(annotations.contains_key(DELTA_ANNOTATION));
    assert_eq!(
        annotations[provenance::CONVERTED_FROM_ANNOTATION],
        "v1alpha1"
    );
    assert_eq!(annotations[provenance::PROVENANCE_ANNOTATION], "NeedsReview");
}

/// Test: a converted Cluster comes back to v1alpha1 with its legacy fields
#[test]
fn test_cluster_round_trip_through_webhook() {
    let to_hub = convert_review(
        request("uid-2", "apps.kanta.io/v1", vec![spoke_cluster("pg")]),
        None,
    );
    let hub = to_hub.converted_objects[0].clone();

    let back = convert_review(request("uid-3", "apps.kanta.io/v1alpha1", vec![hub]), None);

    assert_eq!(back.result.status, "Success");
    let converted = &back.converted_objects[0];
    assert_eq!(converted["apiVersion"], "apps.kanta.io/v1alpha1");
    assert_eq!(converted["spec"]["clusterDefinitionRef"], "postgresql");
    assert_eq!(converted["spec"]["clusterVersionRef"], "postgresql-14.8.0");
    // Halt does not survive the hub
    assert_eq!(converted["spec"]["terminationPolicy"], "DoNotTerminate");
    let annotations = converted["metadata"]["annotations"].as_object().unwrap();
    assert!(!annotations.contains_key(DELTA_ANNOTATION));
    assert_eq!(annotations[provenance::CONVERTED_FROM_ANNOTATION], "v1");
}

/// Test: ComponentDefinition objects go through their own converter
#[test]
fn test_convert_component_definition() {
    let definition = json!({
        "apiVersion": "apps.kanta.io/v1alpha1",
        "kind": "ComponentDefinition",
        "metadata": {"name": "mysql-8.0"},
        "spec": {
            "serviceKind": "mysql",
            "runtime": {"containers": [{"name": "mysql", "image": "mysql:8.0"}]},
            "roleArbitrator": "Lorry",
            "updateStrategy": "Parallel",
        },
    });

    let response = convert_review(request("uid-4", "apps.kanta.io/v1", vec![definition]), None);

    assert_eq!(response.result.status, "Success");
    let converted = &response.converted_objects[0];
    assert_eq!(converted["kind"], "ComponentDefinition");
    assert_eq!(converted["spec"]["updateConcurrency"], "Parallel");
    assert!(converted["spec"].get("roleArbitrator").is_none());
    assert!(converted["metadata"]["annotations"][DELTA_ANNOTATION]
        .as_str()
        .unwrap()
        .contains("Lorry"));
}

/// Test: all objects of a batch are converted in order
#[test]
fn test_convert_multiple_objects() {
    let response = convert_review(
        request(
            "batch-uid",
            "apps.kanta.io/v1",
            vec![spoke_cluster("pg-1"), spoke_cluster("pg-2")],
        ),
        None,
    );

    assert_eq!(response.result.status, "Success");
    assert_eq!(response.converted_objects.len(), 2);
    assert_eq!(response.converted_objects[0]["metadata"]["name"], "pg-1");
    assert_eq!(response.converted_objects[1]["metadata"]["name"], "pg-2");
}

/// Test: objects already at the desired version are returned as-is
#[test]
fn test_convert_same_version_is_noop() {
    let object = spoke_cluster("pg");

    let response = convert_review(
        request("noop-uid", "apps.kanta.io/v1alpha1", vec![object.clone()]),
        None,
    );

    assert_eq!(response.result.status, "Success");
    assert_eq!(response.converted_objects[0], object);
}

/// Test: an unknown target version fails the review
#[test]
fn test_convert_unknown_version_fails() {
    let response = convert_review(
        request("error-uid", "apps.kanta.io/v2", vec![spoke_cluster("pg")]),
        None,
    );

    assert_eq!(response.result.status, "Failed");
    assert!(response.result.message.unwrap().contains("v2"));
    assert!(response.converted_objects.is_empty());
}

/// Test: a target version outside our group fails the review
#[test]
fn test_convert_foreign_desired_group_fails() {
    let response = convert_review(
        request("error-uid", "apps/v1", vec![spoke_cluster("pg")]),
        None,
    );

    assert_eq!(response.result.status, "Failed");
}

/// Test: one bad object fails the whole batch
#[test]
fn test_one_failure_fails_batch() {
    let mut broken = spoke_cluster("broken");
    broken["spec"]["componentSpecs"] = json!([
        {"name": "postgresql", "componentDefRef": "postgresql"},
        {"name": "postgresql", "componentDefRef": "postgresql"},
    ]);

    let response = convert_review(
        request(
            "dup-uid",
            "apps.kanta.io/v1",
            vec![spoke_cluster("ok"), broken],
        ),
        None,
    );

    assert_eq!(response.result.status, "Failed");
    assert!(response.converted_objects.is_empty());
    let message = response.result.message.unwrap();
    assert!(message.contains("name: broken"), "{}", message);
    assert!(message.contains("postgresql"), "{}", message);
}

/// Test: unsupported kinds are rejected with the object name
#[test]
fn test_unsupported_kind_fails() {
    let object = json!({
        "apiVersion": "apps.kanta.io/v1alpha1",
        "kind": "OpsRequest",
        "metadata": {"name": "restart", "namespace": "default"},
        "spec": {},
    });

    let err = convert_object(&object, "v1", None).unwrap_err();

    assert!(matches!(err, WebhookError::UnsupportedKind { ref kind, .. } if kind == "OpsRequest"));
    assert!(err.to_string().contains("namespace: default, name: restart"));
}

/// Test: objects without an apiVersion are rejected
#[test]
fn test_missing_api_version_fails() {
    let object = json!({"kind": "Cluster", "metadata": {"name": "pg"}});

    let err = convert_object(&object, "v1", None).unwrap_err();

    assert!(matches!(err, WebhookError::MissingApiVersion(_)));
}

/// Test: objects from another group are rejected
#[test]
fn test_foreign_group_fails() {
    let object = json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {"name": "web"},
    });

    let err = convert_object(&object, "v1alpha1", None).unwrap_err();

    assert!(matches!(err, WebhookError::UnsupportedGroup { ref group, .. } if group == "apps"));
}

/// Test: malformed objects surface a decode error
#[test]
fn test_malformed_object_fails() {
    let object = json!({
        "apiVersion": "apps.kanta.io/v1alpha1",
        "kind": "Cluster",
        "metadata": {"name": "pg"},
        "spec": {"clusterDefinitionRef": "postgresql", "terminationPolicy": "Forever"},
    });

    let err = convert_object(&object, "v1", None).unwrap_err();

    assert!(matches!(err, WebhookError::Decode { kind: "Cluster", .. }));
}

/// Test: split_api_version only accepts group/version
#[test]
fn test_split_api_version() {
    assert_eq!(
        split_api_version("apps.kanta.io/v1"),
        Some(("apps.kanta.io", "v1"))
    );
    assert_eq!(split_api_version("v1"), None);
    assert_eq!(split_api_version("/v1"), None);
    assert_eq!(split_api_version("a/b/c"), None);
}

/// Test: conversions are recorded in the metrics registry
#[test]
fn test_conversions_recorded() {
    let metrics = create_metrics().unwrap();

    let response = convert_review(
        request("metrics-uid", "apps.kanta.io/v1", vec![spoke_cluster("pg")]),
        Some(&metrics),
    );

    assert_eq!(response.result.status, "Success");
    let body = metrics.encode().unwrap();
    assert!(body.contains(
        r#"kanta_conversions_total{direction="to_hub",kind="Cluster",result="success"} 1"#
    ));
}

/// Test: a ConversionReview body as the API server sends it decodes and converts
#[test]
fn test_review_wire_format_decodes() {
    let body = json!({
        "apiVersion": "apiextensions.k8s.io/v1",
        "kind": "ConversionReview",
        "request": {
            "uid": "wire-uid",
            "desiredAPIVersion": "apps.kanta.io/v1",
            "objects": [spoke_cluster("pg")],
        },
    });

    let review: ConversionReview = serde_json::from_value(body).unwrap();
    assert_eq!(review.kind, "ConversionReview");
    assert_eq!(review.request.desired_api_version, "apps.kanta.io/v1");

    let response = convert_review(review.request, None);

    assert_eq!(response.uid, "wire-uid");
    assert_eq!(response.result.status, "Success");
    assert_eq!(response.converted_objects[0]["apiVersion"], "apps.kanta.io/v1");
}

/// Test: the camelCase spelling of desiredAPIVersion is not accepted
#[test]
fn test_review_rejects_camel_case_desired_version() {
    let body = json!({
        "apiVersion": "apiextensions.k8s.io/v1",
        "kind": "ConversionReview",
        "request": {
            "uid": "wire-uid",
            "desiredApiVersion": "apps.kanta.io/v1",
            "objects": [],
        },
    });

    assert!(serde_json::from_value::<ConversionReview>(body).is_err());
}
