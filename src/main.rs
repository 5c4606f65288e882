use kanta::server::{
    build_rustls_config, create_metrics, initialize_tls, run_health_server, run_health_server_tls,
    shutdown_channel, wait_for_signal, ReadinessState, ShutdownReason, WebhookConfig,
};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info};

/// Create the server TLS config, or `None` when running plain HTTP
async fn setup_tls(config: &WebhookConfig) -> anyhow::Result<Option<Arc<rustls::ServerConfig>>> {
    if !config.tls_enabled {
        info!("Webhook TLS disabled - running HTTP only");
        return Ok(None);
    }

    let client = Client::try_default().await.map_err(|e| {
        error!(error = %e, "Failed to create Kubernetes client");
        e
    })?;
    info!("Connected to Kubernetes cluster");

    info!(
        service = %config.service_name,
        namespace = %config.namespace,
        secret = %config.tls_secret_name,
        "Initializing webhook TLS certificates"
    );
    let bundle = initialize_tls(
        &client,
        &config.service_name,
        &config.namespace,
        &config.tls_secret_name,
    )
    .await
    .map_err(|e| {
        error!(error = ?e, "Failed to initialize TLS certificates");
        anyhow::anyhow!("TLS init error: {}", e)
    })?;

    let tls_config = build_rustls_config(&bundle).map_err(|e| {
        error!(error = ?e, "Failed to build TLS config");
        anyhow::anyhow!("TLS config error: {}", e)
    })?;
    info!("Webhook TLS initialized successfully");

    Ok(Some(tls_config))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting KANTA conversion webhook");

    let config = WebhookConfig::from_env()?;
    let readiness = ReadinessState::new();
    let (shutdown_controller, shutdown_signal) = shutdown_channel(readiness.clone());

    let metrics = create_metrics()?;
    info!("Prometheus metrics registry initialized");

    let tls_config = setup_tls(&config).await?;
    let mode = if tls_config.is_some() { "HTTPS" } else { "HTTP" };
    let port = config.listen_port();

    let server_readiness = readiness.clone();
    let server_metrics = metrics.clone();
    let mut server_handle = tokio::spawn(async move {
        match tls_config {
            Some(tls) => {
                run_health_server_tls(port, server_readiness, server_metrics, tls, shutdown_signal)
                    .await
            }
            None => run_health_server(port, server_readiness, server_metrics, shutdown_signal).await,
        }
    });
    info!(port = port, mode = mode, "Server task spawned");

    readiness.set_ready();
    info!("Webhook ready, serving conversions");

    let reason = tokio::select! {
        result = &mut server_handle => {
            shutdown_controller.begin(ShutdownReason::ServerExited);
            return match result {
                Ok(Ok(())) => Err(anyhow::anyhow!("Server stopped unexpectedly")),
                Ok(Err(e)) => Err(anyhow::anyhow!("Server failed: {}", e)),
                Err(e) => Err(anyhow::anyhow!("Server task panicked: {}", e)),
            };
        }
        signal = wait_for_signal() => signal.map_err(|e| {
            error!(error = %e, "Failed to install signal handlers");
            e
        })?,
    };

    info!(reason = %reason, "Initiating graceful shutdown");
    shutdown_controller.begin(reason);

    match server_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Server failed during shutdown"),
        Err(e) => error!(error = %e, "Server task panicked"),
    }

    info!("KANTA conversion webhook shut down gracefully");
    Ok(())
}
