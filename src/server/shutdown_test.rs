//! Tests for the webhook shutdown sequence

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::shutdown::*;
use super::ReadinessState;
use std::time::Duration;

fn ready() -> ReadinessState {
    let readiness = ReadinessState::new();
    readiness.set_ready();
    readiness
}

/// Test: a fresh channel has no reason and leaves readiness alone
#[test]
fn test_channel_starts_idle() {
    let readiness = ready();
    let (_controller, signal) = shutdown_channel(readiness.clone());

    assert_eq!(signal.reason(), None);
    assert!(readiness.is_ready());
}

/// Test: beginning shutdown drops readiness and records the reason
#[test]
fn test_begin_drops_readiness() {
    let readiness = ready();
    let (controller, signal) = shutdown_channel(readiness.clone());

    assert!(controller.begin(ShutdownReason::Terminate));

    assert!(!readiness.is_ready());
    assert_eq!(signal.reason(), Some(ShutdownReason::Terminate));
}

/// Test: the listener sees the webhook as not ready once it is released
#[tokio::test]
async fn test_readiness_dropped_before_listener_released() {
    let readiness = ready();
    let (controller, mut signal) = shutdown_channel(readiness.clone());

    let observed = readiness.clone();
    let listener = tokio::spawn(async move {
        let reason = signal.wait().await;
        (reason, observed.is_ready())
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    controller.begin(ShutdownReason::Interrupt);

    let (reason, still_ready) = tokio::time::timeout(Duration::from_secs(1), listener)
        .await
        .expect("Listener was not released")
        .unwrap();
    assert_eq!(reason, Some(ShutdownReason::Interrupt));
    assert!(!still_ready);
}

/// Test: a second begin keeps the first reason
#[test]
fn test_first_reason_wins() {
    let (controller, signal) = shutdown_channel(ready());

    assert!(controller.begin(ShutdownReason::Terminate));
    assert!(!controller.begin(ShutdownReason::ServerExited));

    assert_eq!(signal.reason(), Some(ShutdownReason::Terminate));
}

/// Test: a signal cloned after shutdown began resolves at once
#[tokio::test]
async fn test_late_listener_resolves_immediately() {
    let (controller, signal) = shutdown_channel(ready());
    controller.begin(ShutdownReason::Terminate);

    let mut late = signal.clone();
    let reason = tokio::time::timeout(Duration::from_millis(100), late.wait())
        .await
        .expect("Late listener blocked");

    assert_eq!(reason, Some(ShutdownReason::Terminate));
}

/// Test: every clone of the signal is released by one begin
#[tokio::test]
async fn test_all_listeners_released() {
    let (controller, signal) = shutdown_channel(ready());

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let mut listener = signal.clone();
            tokio::spawn(async move { listener.wait().await })
        })
        .collect();

    controller.begin(ShutdownReason::Terminate);

    for handle in handles {
        let reason = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("Listener was not released")
            .unwrap();
        assert_eq!(reason, Some(ShutdownReason::Terminate));
    }
}

/// Test: dropping the controller releases listeners without a reason
#[tokio::test]
async fn test_dropped_controller_releases_without_reason() {
    let readiness = ready();
    let (controller, mut signal) = shutdown_channel(readiness.clone());

    drop(controller);

    let reason = tokio::time::timeout(Duration::from_millis(100), signal.wait())
        .await
        .expect("Listener blocked after controller dropped");
    assert_eq!(reason, None);
    assert!(readiness.is_ready());
}

/// Test: reasons log under their signal names
#[test]
fn test_reason_display() {
    assert_eq!(ShutdownReason::Terminate.to_string(), "SIGTERM");
    assert_eq!(ShutdownReason::Interrupt.to_string(), "SIGINT");
    assert_eq!(ShutdownReason::ServerExited.to_string(), "server exited");
}

/// Test: install failures name the signal
#[test]
fn test_shutdown_error_names_signal() {
    let err = ShutdownError {
        signal: "SIGTERM",
        source: std::io::Error::other("no handlers left"),
    };

    assert_eq!(err.to_string(), "Cannot listen for SIGTERM: no handlers left");
}
