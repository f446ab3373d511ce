use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::UpstreamConfig;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and expose the retry policy as static gauges.
    pub fn init(cfg: &UpstreamConfig) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        gauge!("announcements_retry_limit").set(cfg.retries as f64);
        gauge!("announcements_retry_delay_ms").set(cfg.retry_delay.as_millis() as f64);

        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus text format, ready to merge into the app router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(scrape))
            .with_state(self.handle.clone())
    }
}

async fn scrape(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
