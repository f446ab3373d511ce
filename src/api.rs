use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::announcement::{project, Announcement};
use crate::clock::LocalClock;
use crate::ingest::types::PollOutcome;
use crate::ingest::AnnouncementPipeline;

/// Diagnostics header carrying the internal poll outcome tag.
pub const POLL_OUTCOME_HEADER: &str = "x-poll-outcome";

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<AnnouncementPipeline>,
    clock: LocalClock,
}

impl AppState {
    pub fn new(pipeline: Arc<AnnouncementPipeline>, clock: LocalClock) -> Self {
        Self { pipeline, clock }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/get_announcements", get(get_announcements))
        .route("/debug/seen", get(debug_seen))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, serde::Serialize)]
struct AnnouncementsResp {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    timestamp: String,
    announcements: Vec<Announcement>,
}

fn failure_message(outcome: &PollOutcome) -> String {
    match outcome {
        PollOutcome::EmptyPayload => "No data received from upstream API".to_string(),
        PollOutcome::Blocked { attempts, last } => {
            format!("No data received from upstream API ({attempts} attempts, last: {last})")
        }
        PollOutcome::Malformed { reason } => {
            format!("Upstream API returned an unusable payload: {reason}")
        }
        PollOutcome::SessionFailed { reason } => {
            format!("Could not open upstream session: {reason}")
        }
        PollOutcome::Delivered { .. } => String::new(),
    }
}

/// Delivered polls answer 200 with the projected delta (possibly empty);
/// every failure answers 500 with an empty list.
async fn get_announcements(State(state): State<AppState>) -> Response {
    let outcome = state.pipeline.poll_once().await;
    let label = outcome.label();
    let timestamp = state.clock.now_string();

    let (code, body) = match outcome {
        PollOutcome::Delivered { entries, .. } => (
            StatusCode::OK,
            AnnouncementsResp {
                status: "success",
                message: None,
                timestamp,
                announcements: project(&entries),
            },
        ),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            AnnouncementsResp {
                status: "error",
                message: Some(failure_message(&other)),
                timestamp,
                announcements: Vec::new(),
            },
        ),
    };

    let mut resp = (code, Json(body)).into_response();
    resp.headers_mut()
        .insert(POLL_OUTCOME_HEADER, HeaderValue::from_static(label));
    resp
}

#[derive(serde::Serialize)]
struct SeenInfo {
    count: usize,
}

async fn debug_seen(State(state): State<AppState>) -> Json<SeenInfo> {
    Json(SeenInfo {
        count: state.pipeline.seen().len(),
    })
}
