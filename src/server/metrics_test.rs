//! Tests for the webhook metrics registry

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

/// Test: a fresh registry encodes without error
#[test]
fn test_create_metrics() {
    let metrics = create_metrics().unwrap();

    assert!(metrics.encode().is_ok());
}

/// Test: conversions are counted per kind, direction and result
#[test]
fn test_record_conversion() {
    let metrics = create_metrics().unwrap();

    metrics.record_conversion("Cluster", DIRECTION_TO_HUB, true, 0.001);
    metrics.record_conversion("Cluster", DIRECTION_TO_HUB, true, 0.002);
    metrics.record_conversion("ComponentDefinition", DIRECTION_FROM_HUB, false, 0.001);

    let body = metrics.encode().unwrap();
    assert!(body.contains(
        r#"kanta_conversions_total{direction="to_hub",kind="Cluster",result="success"} 2"#
    ));
    assert!(body.contains(
        r#"kanta_conversions_total{direction="from_hub",kind="ComponentDefinition",result="failure"} 1"#
    ));
    assert!(body.contains("kanta_conversion_duration_seconds_bucket"));
}

/// Test: reviews are counted by result
#[test]
fn test_record_review() {
    let metrics = create_metrics().unwrap();

    metrics.record_review(true);
    metrics.record_review(false);
    metrics.record_review(false);

    let body = metrics.encode().unwrap();
    assert!(body.contains(r#"kanta_conversion_reviews_total{result="success"} 1"#));
    assert!(body.contains(r#"kanta_conversion_reviews_total{result="failure"} 2"#));
}
