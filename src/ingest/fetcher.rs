// src/ingest/fetcher.rs
//! Data request with bounded retries.
//!
//! Per attempt:
//! - 200 returns the body at once.
//! - 401 re-bootstraps cookies and re-issues inside the same attempt, no delay
//!   (once per attempt).
//! - 403, timeouts, other statuses and transport errors fail the attempt and
//!   sleep `retry_delay` before the next one.
//!
//! Exhaustion is a value (`FetchOutcome::Exhausted`), never an error.

use metrics::counter;

use crate::config::UpstreamConfig;
use crate::ingest::session::{bootstrap_cookies, data_headers};
use crate::ingest::types::{AttemptFailure, CookieJar, HttpSession, UpstreamRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Body(String),
    Exhausted { attempts: u32, last: AttemptFailure },
}

impl FetchOutcome {
    /// Collapse to the plain contract: body text, or `""` when nothing came back.
    pub fn into_body(self) -> String {
        match self {
            Self::Body(b) => b,
            Self::Exhausted { .. } => String::new(),
        }
    }
}

pub struct Fetcher<'a> {
    session: &'a dyn HttpSession,
    cfg: &'a UpstreamConfig,
}

impl<'a> Fetcher<'a> {
    pub fn new(session: &'a dyn HttpSession, cfg: &'a UpstreamConfig) -> Self {
        Self { session, cfg }
    }

    /// GET `url`. `cookies` is replaced in place whenever a 401 forces a re-bootstrap.
    pub async fn fetch(&self, cookies: &mut CookieJar, url: &str) -> FetchOutcome {
        let headers = data_headers(self.cfg);
        let retries = self.cfg.retries.max(1);
        let mut last = AttemptFailure::Timeout;

        for attempt in 1..=retries {
            let mut reauthed = false;
            let failure = loop {
                counter!("announcements_fetch_attempts_total").increment(1);
                let req = UpstreamRequest {
                    url,
                    headers: &headers,
                    cookies: &*cookies,
                    timeout: self.cfg.request_timeout,
                };
                match self.session.get(&req).await {
                    Ok(resp) if resp.status == 200 => return FetchOutcome::Body(resp.body),
                    Ok(resp) if resp.status == 401 && !reauthed => {
                        tracing::info!(attempt, "upstream auth expired, refreshing cookies");
                        *cookies = bootstrap_cookies(self.session, self.cfg).await;
                        reauthed = true;
                    }
                    Ok(resp) => break AttemptFailure::from_status(resp.status),
                    Err(e) => break AttemptFailure::from(e),
                }
            };

            counter!("announcements_fetch_failures_total", "reason" => failure.label())
                .increment(1);

            if attempt < retries {
                tracing::warn!(
                    attempt,
                    retries,
                    reason = %failure,
                    delay_secs = self.cfg.retry_delay.as_secs_f64(),
                    "fetch attempt failed, retrying"
                );
                tokio::time::sleep(self.cfg.retry_delay).await;
            } else {
                tracing::warn!(attempt, retries, reason = %failure, "fetch attempts exhausted");
            }
            last = failure;
        }

        FetchOutcome::Exhausted {
            attempts: retries,
            last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::scripted::ScriptedUpstream;
    use crate::ingest::types::{TransportError, UpstreamResponse};
    use std::time::Duration;

    fn cfg() -> UpstreamConfig {
        UpstreamConfig {
            retry_delay: Duration::from_secs(5),
            ..UpstreamConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_short_circuits() {
        let cfg = cfg();
        let up = ScriptedUpstream::new(&cfg).data(Ok(UpstreamResponse::ok("[]")));
        let mut jar = CookieJar::new();
        let out = Fetcher::new(&up, &cfg).fetch(&mut jar, &cfg.data_url).await;
        assert_eq!(out, FetchOutcome::Body("[]".into()));
        assert_eq!(up.data_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_then_ok_recovers_after_one_delay() {
        let cfg = cfg();
        let up = ScriptedUpstream::new(&cfg)
            .data(Ok(UpstreamResponse::status(403)))
            .data(Ok(UpstreamResponse::ok("[1]")));
        let mut jar = CookieJar::new();
        let out = Fetcher::new(&up, &cfg).fetch(&mut jar, &cfg.data_url).await;
        assert_eq!(out.into_body(), "[1]");

        let calls = up.data_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].at - calls[0].at, cfg.retry_delay);
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_status_counts_as_failed_attempt() {
        let cfg = UpstreamConfig {
            retries: 2,
            ..cfg()
        };
        let up = ScriptedUpstream::new(&cfg)
            .data_default(Ok(UpstreamResponse::status(503)));
        let mut jar = CookieJar::new();
        let out = Fetcher::new(&up, &cfg).fetch(&mut jar, &cfg.data_url).await;
        assert_eq!(
            out,
            FetchOutcome::Exhausted {
                attempts: 2,
                last: AttemptFailure::Status(503)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn connection_errors_are_retried() {
        let cfg = cfg();
        let up = ScriptedUpstream::new(&cfg)
            .data(Err(TransportError::Connect("reset".into())))
            .data(Ok(UpstreamResponse::ok("[]")));
        let mut jar = CookieJar::new();
        let out = Fetcher::new(&up, &cfg).fetch(&mut jar, &cfg.data_url).await;
        assert_eq!(out, FetchOutcome::Body("[]".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_401_reauths_once_per_attempt() {
        let cfg = UpstreamConfig {
            retries: 2,
            ..cfg()
        };
        let up = ScriptedUpstream::new(&cfg).data_default(Ok(UpstreamResponse::status(401)));
        let mut jar = CookieJar::new();
        let out = Fetcher::new(&up, &cfg).fetch(&mut jar, &cfg.data_url).await;
        assert_eq!(
            out,
            FetchOutcome::Exhausted {
                attempts: 2,
                last: AttemptFailure::AuthExpired
            }
        );
        // two requests and one re-bootstrap per attempt
        assert_eq!(up.data_calls().len(), 4);
        assert_eq!(up.landing_calls(), 2);
    }
}
