//! Webhook configuration from environment variables
//!
//! | Variable                | Default             |
//! |-------------------------|---------------------|
//! | `KANTA_WEBHOOK_TLS`     | `false`             |
//! | `KANTA_SERVICE_NAME`    | `kanta-webhook`     |
//! | `KANTA_NAMESPACE`       | `kanta-system`      |
//! | `KANTA_TLS_SECRET_NAME` | `kanta-webhook-tls` |
//! | `KANTA_HEALTH_PORT`     | `8080`              |
//! | `KANTA_WEBHOOK_PORT`    | `8443`              |

use thiserror::Error;

use super::tls::DEFAULT_TLS_SECRET_NAME;

pub const DEFAULT_SERVICE_NAME: &str = "kanta-webhook";
pub const DEFAULT_NAMESPACE: &str = "kanta-system";

/// Default port for health endpoints (HTTP)
pub const DEFAULT_HEALTH_PORT: u16 = 8080;

/// Default port for webhook endpoints (HTTPS)
pub const DEFAULT_WEBHOOK_PORT: u16 = 8443;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a port number, got '{value}'")]
    InvalidPort { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookConfig {
    /// Serve HTTPS with a managed certificate; HTTP only when false
    pub tls_enabled: bool,
    pub service_name: String,
    pub namespace: String,
    pub tls_secret_name: String,
    pub health_port: u16,
    pub webhook_port: u16,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            tls_enabled: false,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            tls_secret_name: DEFAULT_TLS_SECRET_NAME.to_string(),
            health_port: DEFAULT_HEALTH_PORT,
            webhook_port: DEFAULT_WEBHOOK_PORT,
        }
    }
}

impl WebhookConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let port = |var: &'static str, default: u16| match lookup(var) {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort { var, value }),
            None => Ok(default),
        };

        Ok(Self {
            tls_enabled: lookup("KANTA_WEBHOOK_TLS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.tls_enabled),
            service_name: lookup("KANTA_SERVICE_NAME").unwrap_or(defaults.service_name),
            namespace: lookup("KANTA_NAMESPACE").unwrap_or(defaults.namespace),
            tls_secret_name: lookup("KANTA_TLS_SECRET_NAME").unwrap_or(defaults.tls_secret_name),
            health_port: port("KANTA_HEALTH_PORT", defaults.health_port)?,
            webhook_port: port("KANTA_WEBHOOK_PORT", defaults.webhook_port)?,
        })
    }

    /// Port the server listens on in the configured mode
    pub fn listen_port(&self) -> u16 {
        if self.tls_enabled {
            self.webhook_port
        } else {
            self.health_port
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
