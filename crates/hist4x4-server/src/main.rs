//! Web server for the hist4x4 next-draw predictor
//!
//! Loads configuration from an optional YAML file plus the environment, builds
//! the adaptive Responses API predictor and serves the page and `/predict`
//! until Ctrl+C or SIGTERM.

use anyhow::Result;
use clap::Parser;
use hist4x4_core::{AdaptivePredictor, AppConfig, ConfigLoader, Predictor};
use hist4x4_web::{shutdown_signal, Hist4x4Server, ServerConfig};
use log::LevelFilter;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Hist4x4 Server - Serve the next-draw predictor")]
struct Cli {
    #[clap(long, short, help = "YAML configuration file; environment variables override its values")]
    config: Option<String>,

    #[clap(long, help = "Address to listen on (defaults to server.bind_addr from the configuration)")]
    bind_addr: Option<String>,

    #[clap(long, short, default_value = "info")]
    log_level: String,

    #[clap(long = "cors-origin", help = "Allowed CORS origin; may be repeated")]
    cors_origins: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    let config = load_config(cli.config.as_deref()).await?;
    let bind_addr = cli
        .bind_addr
        .unwrap_or_else(|| config.server.bind_addr.clone());

    run_server(config, bind_addr, cli.cors_origins).await
}

async fn load_config(path: Option<&str>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => {
            log::info!("Loading configuration from file: {}", path);
            ConfigLoader::from_file(path).await?
        }
        None => {
            log::info!("No configuration file given, using environment only");
            ConfigLoader::from_env()?
        }
    };

    if config.openai.api_key.is_none() {
        log::warn!("OPENAI_API_KEY is not set; /predict will fail until it is provided");
    }
    log::info!(
        "Configuration loaded: model {}, endpoint {}",
        config.openai.model,
        config.openai.api_base
    );
    Ok(config)
}

async fn run_server(config: AppConfig, bind_addr: String, cors_origins: Vec<String>) -> Result<()> {
    let predictor: Arc<dyn Predictor> = Arc::new(AdaptivePredictor::new(&config.openai)?);

    let mut server_config = ServerConfig::default()
        .with_bind_addr_str(&bind_addr)?
        .with_logging(true);
    if !cors_origins.is_empty() {
        server_config = server_config.with_cors(true).with_cors_origins(cors_origins)?;
    }

    log::info!("Starting hist4x4 server on {}...", bind_addr);
    let server = Hist4x4Server::new(predictor, &config, server_config);

    if let Err(e) = server.serve_with_shutdown(shutdown_signal()).await {
        log::error!("Server failed: {}", e);
        return Err(e.into());
    }

    log::info!("hist4x4 server shut down gracefully.");
    Ok(())
}
