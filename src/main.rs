use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;

use carbozen_server::analysis::MealAnalyzer;
use carbozen_server::api::OpenAiClient;
use carbozen_server::core::logging::init_logging;
use carbozen_server::core::{Config, HealthChecker, ServiceMetrics};
use carbozen_server::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env().context("failed to load configuration")?;

    // Initialize logging
    init_logging(&config.monitoring.log_level);

    tracing::info!("🚀 CarboZen server starting...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Ensemble: {} + {}x {} judged by {}",
        config.ensemble.primary_model,
        config.ensemble.support_calls,
        config.ensemble.support_model,
        config.ensemble.judge_model
    );

    let metrics = ServiceMetrics::new()?;
    let health = HealthChecker::new();
    let client = Arc::new(OpenAiClient::new(config.openai.clone())?);
    let analyzer = Arc::new(MealAnalyzer::new(
        client,
        config.ensemble.clone(),
        metrics.clone(),
        health.clone(),
    ));

    let state = AppState {
        analyzer,
        metrics,
        health,
    };
    let routes = server::routes(state, &config.server);

    let addr = SocketAddr::from((config.server.bind_address, config.server.port));
    let (bound, serving) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, shutdown_signal())
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("✅ Server listening on {}", bound);
    serving.await;
    tracing::info!("👋 Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
