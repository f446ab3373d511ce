// tests/metrics_poll.rs
#![cfg(feature = "strict-metrics")]
use std::sync::Arc;
use std::time::Duration;

use axum::body::{self, Body};
use http::{Request, StatusCode};
use tower::ServiceExt as _;

use announcement_poller::config::UpstreamConfig;
use announcement_poller::ingest::scripted::ScriptedUpstream;
use announcement_poller::ingest::types::UpstreamResponse;
use announcement_poller::telemetry::Metrics;
use announcement_poller::AnnouncementPipeline;

#[tokio::test]
async fn metrics_exposed_after_poll() {
    let cfg = UpstreamConfig {
        retries: 2,
        retry_delay: Duration::ZERO,
        ..UpstreamConfig::default()
    };
    let metrics = Metrics::init(&cfg).expect("recorder");

    let up = ScriptedUpstream::new(&cfg)
        .data(Ok(UpstreamResponse::status(403)))
        .data(Ok(UpstreamResponse::ok(r#"[{"seq_id":"1"}]"#)));
    let pipeline = AnnouncementPipeline::new(Arc::new(up), cfg);
    assert!(pipeline.poll_once().await.is_success());

    // Scrape metrics text and check series presence by substring
    let out = metrics.handle.render();
    assert!(out.contains("announcements_polls_total"));
    assert!(out.contains("announcements_fetch_attempts_total"));
    assert!(out.contains("announcements_fetch_failures_total"));
    assert!(out.contains("announcements_new_total"));
    assert!(out.contains("announcements_retry_limit"));

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("announcements_polls_total"));
}
