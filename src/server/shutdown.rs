//! Graceful shutdown for the conversion webhook
//!
//! Stopping is two steps behind one call: readiness drops first so the
//! API server routes new ConversionReviews to other replicas, then the
//! listener is told to stop and drain the reviews already in flight.

use std::fmt;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

use super::health::ReadinessState;

/// Signal handlers could not be installed
#[derive(Debug, Error)]
#[error("Cannot listen for {signal}: {source}")]
pub struct ShutdownError {
    pub signal: &'static str,
    #[source]
    pub source: std::io::Error,
}

/// Why the webhook is stopping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGTERM, sent by the kubelet on pod deletion
    Terminate,
    /// SIGINT or Ctrl+C
    Interrupt,
    /// The server task returned on its own
    ServerExited,
}

impl ShutdownReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ShutdownReason::Terminate => "SIGTERM",
            ShutdownReason::Interrupt => "SIGINT",
            ShutdownReason::ServerExited => "server exited",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listener side of the shutdown channel
#[derive(Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<Option<ShutdownReason>>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has begun
    ///
    /// Returns `None` when the controller was dropped without a reason.
    pub async fn wait(&mut self) -> Option<ShutdownReason> {
        match self.receiver.wait_for(Option::is_some).await {
            Ok(reason) => *reason,
            Err(_) => None,
        }
    }

    /// The reason shutdown began, if it has
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.receiver.borrow()
    }
}

/// Owner side of the shutdown channel
pub struct ShutdownController {
    sender: watch::Sender<Option<ShutdownReason>>,
    readiness: ReadinessState,
}

impl ShutdownController {
    /// Drop readiness, then release every [`ShutdownSignal`]
    ///
    /// Only the first reason is kept. Returns false when shutdown had
    /// already begun.
    pub fn begin(&self, reason: ShutdownReason) -> bool {
        self.readiness.set_not_ready();

        let first = self.sender.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        if first {
            info!(reason = %reason, "Webhook not ready, draining conversions");
        }
        first
    }
}

/// Create the shutdown channel for a webhook with the given readiness
pub fn shutdown_channel(readiness: ReadinessState) -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(None);
    (
        ShutdownController { sender, readiness },
        ShutdownSignal { receiver },
    )
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
pub async fn wait_for_signal() -> Result<ShutdownReason, ShutdownError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).map_err(|source| ShutdownError {
        signal: "SIGTERM",
        source,
    })?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(|source| ShutdownError {
        signal: "SIGINT",
        source,
    })?;

    let reason = tokio::select! {
        _ = sigterm.recv() => ShutdownReason::Terminate,
        _ = sigint.recv() => ShutdownReason::Interrupt,
    };
    info!(signal = %reason, "Received shutdown signal");
    Ok(reason)
}

/// Wait for Ctrl+C
#[cfg(not(unix))]
pub async fn wait_for_signal() -> Result<ShutdownReason, ShutdownError> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|source| ShutdownError {
            signal: "Ctrl+C",
            source,
        })?;
    info!("Received Ctrl+C");
    Ok(ShutdownReason::Interrupt)
}
