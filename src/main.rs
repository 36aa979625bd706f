mod config;
mod level;
mod metrics;
mod report;
mod upstream;
mod web;

use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::report::Reporter;
use crate::web::server::WebServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "condx=info".into()),
        )
        .init();

    info!("📡 condx v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "condx.toml".to_string());

    let config = Config::load(&config_path)?;
    info!("Config loaded from {}", config_path);

    let config = Arc::new(config);
    let reporter = Arc::new(Reporter::new(config.clone())?);

    // With the web adapter disabled, answer once on stdout and exit
    if !config.web.enabled {
        let report = reporter.summarize("all").await?;
        println!("{}", report);
        return Ok(());
    }

    let web = WebServer::new(reporter, config);
    web.run().await
}
