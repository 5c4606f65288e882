//! HTTP server for the conversion webhook
//!
//! - `/convert` - Kubernetes ConversionReview webhook
//! - `/healthz` - Liveness probe (process is running)
//! - `/readyz` - Readiness probe (webhook is ready to serve)
//! - `/metrics` - Prometheus metrics
//!
//! Also provides TLS bootstrapping, configuration, and graceful shutdown
//! handling for SIGTERM/SIGINT.

pub mod config;
mod health;
pub mod metrics;
pub mod shutdown;
pub mod tls;
pub mod webhook;

pub use config::{ConfigError, WebhookConfig};
pub use health::{run_health_server, run_health_server_tls, ReadinessState, ServerState};
pub use metrics::{create_metrics, ConversionMetrics, SharedMetrics};
pub use shutdown::{
    shutdown_channel, wait_for_signal, ShutdownController, ShutdownError, ShutdownReason,
    ShutdownSignal,
};
pub use tls::{build_rustls_config, initialize_tls, CertificateBundle, TlsError};
pub use webhook::{convert_review, ConversionReview, WebhookError};

#[cfg(test)]
#[path = "health_test.rs"]
mod health_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;

#[cfg(test)]
#[path = "tls_test.rs"]
mod tls_tests;
