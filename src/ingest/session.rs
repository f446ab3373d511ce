// src/ingest/session.rs
//! Anti-bot cookie bootstrap against the provider's landing page.

use metrics::counter;

use crate::config::UpstreamConfig;
use crate::ingest::types::{CookieJar, HeaderSet, HttpSession, UpstreamRequest};

/// Header set for the landing-page request.
pub fn bootstrap_headers(cfg: &UpstreamConfig) -> HeaderSet {
    vec![
        ("User-Agent", cfg.bootstrap_user_agent.clone()),
        ("Accept-Language", cfg.accept_language.clone()),
    ]
}

/// Header set for the data request.
pub fn data_headers(cfg: &UpstreamConfig) -> HeaderSet {
    vec![
        ("User-Agent", cfg.user_agent.clone()),
        ("Referer", cfg.referer.clone()),
        ("Accept-Language", cfg.accept_language.clone()),
    ]
}

/// One GET to the landing page; whatever cookies come back form the jar.
/// No retry: a failure yields an empty jar and the fetcher's own retries absorb it.
pub async fn bootstrap_cookies(session: &dyn HttpSession, cfg: &UpstreamConfig) -> CookieJar {
    let headers = bootstrap_headers(cfg);
    let empty = CookieJar::new();
    let req = UpstreamRequest {
        url: &cfg.landing_url,
        headers: &headers,
        cookies: &empty,
        timeout: cfg.bootstrap_timeout,
    };

    match session.get(&req).await {
        Ok(resp) => {
            tracing::debug!(
                status = resp.status,
                cookies = resp.cookies.len(),
                "landing page bootstrap"
            );
            resp.cookies
        }
        Err(e) => {
            tracing::warn!(error = %e, url = %cfg.landing_url, "cookie bootstrap failed");
            counter!("announcements_bootstrap_failures_total").increment(1);
            CookieJar::new()
        }
    }
}
