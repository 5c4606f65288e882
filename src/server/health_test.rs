//! Tests for health, metrics, and webhook endpoints

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use serde_json::json;
use std::time::Duration;

/// Wait for server to be ready with retry logic
///
/// Retries connection up to max_retries times with exponential backoff.
/// More reliable than fixed sleep for test environments.
async fn wait_for_server(port: u16, max_retries: u32) -> reqwest::Client {
    let client = reqwest::Client::new();
    let mut delay = Duration::from_millis(10);

    for attempt in 1..=max_retries {
        match client
            .get(format!("http://127.0.0.1:{}/healthz", port))
            .timeout(Duration::from_millis(100))
            .send()
            .await
        {
            Ok(_) => return client,
            Err(_) if attempt < max_retries => {
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_millis(200));
            }
            Err(e) => panic!("Server not ready after {} attempts: {}", max_retries, e),
        }
    }
    client
}

/// Start a plain HTTP server on `port` and return its controls
async fn start_server(
    port: u16,
    readiness: ReadinessState,
) -> (
    reqwest::Client,
    ShutdownController,
    SharedMetrics,
    tokio::task::JoinHandle<Result<(), std::io::Error>>,
) {
    let metrics = create_metrics().unwrap();
    let (controller, signal) = shutdown_channel(readiness.clone());

    let server_metrics = metrics.clone();
    let server_handle = tokio::spawn(async move {
        run_health_server(port, readiness, server_metrics, signal).await
    });

    let client = wait_for_server(port, 10).await;
    (client, controller, metrics, server_handle)
}

/// Test: /healthz returns 200
#[tokio::test]
async fn test_healthz_returns_200() {
    let port = 18080;
    let (client, _controller, _metrics, server_handle) =
        start_server(port, ReadinessState::new()).await;

    let response = client
        .get(format!("http://127.0.0.1:{}/healthz", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to connect to health server");

    assert_eq!(response.status(), 200, "Liveness probe should return 200");

    server_handle.abort();
}

/// Test: /readyz returns 503 when not ready
#[tokio::test]
async fn test_readyz_returns_503_when_not_ready() {
    let readiness = ReadinessState::new();
    assert!(!readiness.is_ready(), "Should start as not ready");

    let port = 18081;
    let (client, _controller, _metrics, server_handle) = start_server(port, readiness).await;

    let response = client
        .get(format!("http://127.0.0.1:{}/readyz", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to connect to health server");

    assert_eq!(
        response.status(),
        503,
        "Readiness probe should return 503 when not ready"
    );

    server_handle.abort();
}

/// Test: /readyz returns 200 when ready
#[tokio::test]
async fn test_readyz_returns_200_when_ready() {
    let readiness = ReadinessState::new();
    readiness.set_ready();

    let port = 18082;
    let (client, _controller, _metrics, server_handle) = start_server(port, readiness).await;

    let response = client
        .get(format!("http://127.0.0.1:{}/readyz", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to connect to health server");

    assert_eq!(
        response.status(),
        200,
        "Readiness probe should return 200 when ready"
    );

    server_handle.abort();
}

/// Test: /convert answers a ConversionReview and /metrics reports it
#[tokio::test]
async fn test_convert_endpoint_records_metrics() {
    let port = 18083;
    let (client, _controller, metrics, server_handle) =
        start_server(port, ReadinessState::new()).await;

    let review = json!({
        "apiVersion": "apiextensions.k8s.io/v1",
        "kind": "ConversionReview",
        "request": {
            "uid": "http-uid",
            "desiredAPIVersion": "apps.kanta.io/v1",
            "objects": [{
                "apiVersion": "apps.kanta.io/v1alpha1",
                "kind": "Cluster",
                "metadata": {"name": "pg", "namespace": "default"},
                "spec": {
                    "clusterDefinitionRef": "postgresql",
                    "terminationPolicy": "Delete",
                },
            }],
        },
    });

    let response = client
        .post(format!("http://127.0.0.1:{}/convert", port))
        .json(&review)
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to reach /convert");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "ConversionReview");
    assert_eq!(body["response"]["uid"], "http-uid");
    assert_eq!(body["response"]["result"]["status"], "Success");
    assert_eq!(
        body["response"]["convertedObjects"][0]["spec"]["clusterDef"],
        "postgresql"
    );

    let scraped = client
        .get(format!("http://127.0.0.1:{}/metrics", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to reach /metrics")
        .text()
        .await
        .unwrap();
    assert!(scraped.contains(r#"kanta_conversion_reviews_total{result="success"} 1"#));
    assert_eq!(scraped, metrics.encode().unwrap());

    server_handle.abort();
}

/// Test: shutdown turns /readyz to 503 and then stops the server
#[tokio::test]
async fn test_server_stops_on_shutdown() {
    let port = 18084;
    let readiness = ReadinessState::new();
    readiness.set_ready();
    let (_client, controller, _metrics, server_handle) =
        start_server(port, readiness.clone()).await;

    controller.begin(ShutdownReason::Terminate);
    assert!(!readiness.is_ready());

    let result = tokio::time::timeout(Duration::from_secs(5), server_handle)
        .await
        .expect("Server did not stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

/// Test ReadinessState basic functionality
#[test]
fn test_readiness_state_transitions() {
    let state = ReadinessState::new();

    // Initially not ready
    assert!(!state.is_ready());

    // After set_ready, should be ready
    state.set_ready();
    assert!(state.is_ready());

    // Clone should share state
    let cloned = state.clone();
    assert!(cloned.is_ready());

    state.set_not_ready();
    assert!(!cloned.is_ready());
}
