// src/ingest/mod.rs
pub mod dedup;
pub mod fetcher;
pub mod http;
pub mod parser;
pub mod scripted;
pub mod session;
pub mod types;

use std::sync::Arc;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;

use crate::config::UpstreamConfig;
use crate::ingest::dedup::SeenStore;
use crate::ingest::fetcher::{FetchOutcome, Fetcher};
use crate::ingest::types::{PollOutcome, SessionFactory};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("announcements_polls_total", "Polls run, labelled by outcome.");
        describe_counter!(
            "announcements_fetch_attempts_total",
            "Upstream data requests issued (re-auth retries included)."
        );
        describe_counter!(
            "announcements_fetch_failures_total",
            "Failed fetch attempts, labelled by reason."
        );
        describe_counter!(
            "announcements_bootstrap_failures_total",
            "Landing-page cookie bootstraps that failed."
        );
        describe_counter!("announcements_new_total", "Announcements reported as new.");
        describe_gauge!("announcements_seen_ids", "Ids in the seen set after the last poll.");
        describe_gauge!(
            "announcements_last_poll_ts",
            "Unix ts when the last poll finished."
        );
        describe_histogram!("announcements_poll_ms", "End-to-end poll time in milliseconds.");
    });
}

/// Bootstrap -> fetch -> parse -> dedupe, with the seen set owned here.
pub struct AnnouncementPipeline {
    sessions: Arc<dyn SessionFactory>,
    cfg: UpstreamConfig,
    seen: SeenStore,
}

impl AnnouncementPipeline {
    pub fn new(sessions: Arc<dyn SessionFactory>, cfg: UpstreamConfig) -> Self {
        Self {
            sessions,
            cfg,
            seen: SeenStore::new(),
        }
    }

    pub fn seen(&self) -> &SeenStore {
        &self.seen
    }

    /// Run one poll. The session (client + cookies) lives only for this call.
    /// Failed polls leave the seen set untouched.
    pub async fn poll_once(&self) -> PollOutcome {
        ensure_metrics_described();
        let t0 = std::time::Instant::now();

        let outcome = self.run().await;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("announcements_poll_ms").record(ms);
        counter!("announcements_polls_total", "outcome" => outcome.label()).increment(1);
        gauge!("announcements_seen_ids").set(self.seen.len() as f64);
        gauge!("announcements_last_poll_ts").set(chrono::Utc::now().timestamp() as f64);

        match &outcome {
            PollOutcome::Delivered {
                entries,
                observed,
                fallback,
            } => tracing::info!(
                target: "ingest",
                provider = self.sessions.name(),
                observed,
                reported = entries.len(),
                fallback,
                elapsed_ms = ms,
                "poll delivered"
            ),
            other => tracing::warn!(
                target: "ingest",
                provider = self.sessions.name(),
                outcome = other.label(),
                detail = ?other,
                elapsed_ms = ms,
                "poll produced no data"
            ),
        }
        outcome
    }

    async fn run(&self) -> PollOutcome {
        let session = match self.sessions.open() {
            Ok(s) => s,
            Err(e) => {
                return PollOutcome::SessionFailed {
                    reason: format!("{e:#}"),
                }
            }
        };

        let mut cookies = session::bootstrap_cookies(session.as_ref(), &self.cfg).await;
        let body = match Fetcher::new(session.as_ref(), &self.cfg)
            .fetch(&mut cookies, &self.cfg.data_url)
            .await
        {
            FetchOutcome::Body(b) => b,
            FetchOutcome::Exhausted { attempts, last } => {
                return PollOutcome::Blocked { attempts, last }
            }
        };

        let records = match parser::parse_records(&body) {
            Ok(r) => r,
            Err(e) => {
                return PollOutcome::Malformed {
                    reason: e.to_string(),
                }
            }
        };
        if records.is_empty() {
            // An empty array still counts as this poll's view of the world.
            self.seen.apply(records);
            return PollOutcome::EmptyPayload;
        }

        let observed = records.len();
        let dedup = self.seen.apply(records);
        counter!("announcements_new_total").increment(dedup.new_count as u64);
        PollOutcome::Delivered {
            entries: dedup.entries,
            observed,
            fallback: dedup.fallback,
        }
    }
}
