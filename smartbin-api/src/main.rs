use anyhow::Context;
use smartbin_api::{app, ApiConfig, AppState};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "smartbin_api=debug,smartbin=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ApiConfig::from_env().context("Invalid configuration")?;
    let addr = config.socket_addr()?;

    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set, classify and ask requests will fail");
    }
    if !config.static_dir.is_dir() {
        warn!(dir = %config.static_dir.display(), "static directory not found, frontend will not be served");
    }

    let state = AppState::from_config(config)?;
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("SmartBin API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("SmartBin API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_filter_parses() {
        let filter = tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).unwrap();
        let rendered = filter.to_string();
        for directive in ["smartbin_api=debug", "smartbin=info", "tower_http=debug"] {
            assert!(rendered.contains(directive), "missing {directive}");
        }
    }
}
