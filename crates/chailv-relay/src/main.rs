use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chailv_core::config::{self, Config};
use chailv_relay::{router, GeminiGenerator, RelayState};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "chailv-relay")]
#[command(about = "Relay travel-policy questions to the generation API")]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "CHAILV_BIND")]
    bind: Option<String>,
    /// Model identifier passed to the generation API
    #[arg(long, env = "CHAILV_MODEL")]
    model: Option<String>,
    /// Config file (defaults to the per-user config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default config");
            Config::new()
        }),
    };

    let bind = cli.bind.unwrap_or_else(|| config.bind_addr().to_string());
    let model = cli.model.unwrap_or_else(|| config.model().to_string());

    let api_key = config::api_key_from_env();
    if api_key.is_none() {
        tracing::warn!("{} is not set; every chat request will fail", config::API_KEY_ENV);
    }

    let state = RelayState {
        api_key,
        model: model.clone(),
        generator: Arc::new(GeminiGenerator::new(config.gemini_base_url())),
    };

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(addr = %listener.local_addr()?, %model, "relay listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
