pub mod api;
pub mod artifact;
pub mod config;
pub mod core_state;
pub mod facts;
pub mod model;
pub mod pipeline;

#[cfg(test)]
mod fixtures;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::core_state::{CoreState, StartupError};

/// Install the fmt subscriber. `RUST_LOG` wins over the built-in filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Load the model, serve until Ctrl-C, then drain and return.
pub async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    // Every artifact is loaded and cross-checked before the port opens
    let core = Arc::new(CoreState::load(&config)?);

    let server = api::start_api_server(core, config.bind_addr, config.max_upload_bytes)
        .await
        .map_err(|source| StartupError::Server {
            addr: config.bind_addr.to_string(),
            source,
        })?;
    tracing::info!(addr = %server.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    server.stop().await;
    Ok(())
}
