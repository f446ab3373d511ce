// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod announcement;
pub mod api;
pub mod clock;
pub mod config;
pub mod ingest;
pub mod telemetry;

use std::sync::Arc;

pub use crate::api::{create_router, AppState};
pub use crate::ingest::types::PollOutcome;
pub use crate::ingest::AnnouncementPipeline;

use crate::clock::LocalClock;
use crate::config::AppConfig;
use crate::ingest::http::ReqwestSessionFactory;
use crate::ingest::types::SessionFactory;

/// Build the app state around any session factory (tests inject a scripted one).
pub fn build_state(cfg: &AppConfig, sessions: Arc<dyn SessionFactory>) -> AppState {
    let pipeline = AnnouncementPipeline::new(sessions, cfg.upstream.clone());
    AppState::new(Arc::new(pipeline), LocalClock::new(cfg.timezone))
}

/// Router wired to the real upstream over reqwest.
pub fn app(cfg: &AppConfig) -> axum::Router {
    create_router(build_state(cfg, Arc::new(ReqwestSessionFactory)))
}
