use anyhow::Result;
use dotenvy::dotenv;
use movie_explorer::config::Config;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn report_config(config: &Config) {
    match (&config.server_api_key, &config.public_api_key) {
        (Some(_), _) => info!("Using server-only catalog credential"),
        (None, Some(_)) => warn!("Using the public catalog credential; prefer TMDB_API_KEY"),
        (None, None) => warn!("TMDB_API_KEY is not set; the proxy will serve sample data"),
    }
    if let Some(dir) = &config.sample_dir {
        info!("Sample data directory: {}", dir.display());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = dotenv();
    init_tracing();
    match loaded {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }
    let config = Config::from_env()?;
    report_config(&config);
    movie_explorer::proxy::run_server(config).await
}
