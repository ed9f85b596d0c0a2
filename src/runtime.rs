use std::sync::Arc;

use tokio::net::TcpListener;

use it_worked_image::ImageClient;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::routes::app;

/// Binds `config.bind_addr` and serves the page until SIGINT/SIGTERM.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    serve_on(listener, config).await
}

/// Serves the page on an already bound listener.
///
/// The page fetches its container document from `config.origin`, or from this very listener
/// when no origin is configured.
pub async fn serve_on(listener: TcpListener, config: ServerConfig) -> Result<()> {
    let local_addr = listener.local_addr()?;
    let origin = config.origin_for(local_addr);
    let client = ImageClient::new(&origin)?;

    tracing::info!(
        addr = %local_addr,
        origin = %origin,
        data_dir = %config.data_dir.display(),
        platform = config.platform.name(),
        "it-worked listening"
    );
    if let Some(pod) = config.platform.as_kubernetes() {
        tracing::info!(
            pod = pod.pod_name.as_deref().unwrap_or("-"),
            namespace = pod.namespace.as_deref().unwrap_or("-"),
            node = pod.node_name.as_deref().unwrap_or("-"),
            "running inside kubernetes"
        );
    }

    let router = app(&config, Arc::new(client));

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("it-worked stopped");
    Ok(())
}

/// Loads [`ServerConfig`] from the environment and starts serving.
pub async fn run() -> Result<()> {
    let config = ServerConfig::from_env()?;
    serve(config).await
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler; waiting for ctrl-c only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
