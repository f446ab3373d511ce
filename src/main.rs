//! Announcement poller: binary entrypoint.
//! Loads config, boots tracing and metrics, then serves the Axum router.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use announcement_poller::config::AppConfig;
use announcement_poller::telemetry::Metrics;

/// `LOG_FORMAT=json` switches to JSON lines; anything else is compact text.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("announcement_poller=info,ingest=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load().context("loading configuration")?;

    let mut router = announcement_poller::app(&cfg);
    if std::env::var("METRICS_ENABLED").ok().as_deref() != Some("0") {
        let metrics = Metrics::init(&cfg.upstream)?;
        router = router.merge(metrics.router());
    }

    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("binding {}", cfg.bind))?;
    tracing::info!(
        bind = %cfg.bind,
        upstream = %cfg.upstream.data_url,
        retries = cfg.upstream.retries,
        "announcement poller listening"
    );

    axum::serve(listener, router)
        .await
        .context("http server terminated")?;
    Ok(())
}
