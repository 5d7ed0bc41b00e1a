use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use plenario::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let cfg = Config::from_env();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "plenario",
        "plenario starting: RUST_LOG='{}', http_port={}, access_ttl={}s, refresh_ttl={}s, origins={:?}",
        rust_log,
        cfg.http_port,
        cfg.access_ttl.as_secs(),
        cfg.refresh_ttl.as_secs(),
        cfg.origins
    );

    plenario::server::run_with_config(cfg).await
}
