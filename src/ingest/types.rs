// src/ingest/types.rs
use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{Map, Value};

/// Raw provider record, kept verbatim (provider key order preserved by serde_json's map).
pub type RawRecord = Map<String, Value>;

/// Cookie name -> value, as set by the landing page.
pub type CookieJar = BTreeMap<String, String>;

/// Ordered header pairs sent with a request.
pub type HeaderSet = Vec<(&'static str, String)>;

/// Extract the dedup identity of a record.
///
/// Strings are used as-is, numbers by their JSON text. `null`, missing, or any
/// other shape makes the record unidentifiable.
pub fn seq_id(record: &RawRecord) -> Option<String> {
    match record.get("seq_id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Render a jar as a `Cookie` header value (`a=1; b=2`).
pub fn cookie_header(jar: &CookieJar) -> String {
    jar.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Inverse of [`cookie_header`]: `a=1; b=2` into a jar. Pairs without `=` are dropped.
pub fn parse_cookie_header(raw: &str) -> CookieJar {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// One outbound GET.
#[derive(Debug, Clone)]
pub struct UpstreamRequest<'a> {
    pub url: &'a str,
    pub headers: &'a [(&'static str, String)],
    pub cookies: &'a CookieJar,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub cookies: CookieJar,
    pub body: String,
}

impl UpstreamResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            cookies: CookieJar::new(),
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Other(String),
}

/// Per-poll HTTP session. Implementations own their client; cookies travel explicitly.
#[async_trait::async_trait]
pub trait HttpSession: Send + Sync {
    async fn get(&self, req: &UpstreamRequest<'_>) -> Result<UpstreamResponse, TransportError>;
}

/// Opens a fresh session for every poll.
pub trait SessionFactory: Send + Sync {
    fn open(&self) -> anyhow::Result<Box<dyn HttpSession>>;
    fn name(&self) -> &'static str;
}

/// Why a single fetch attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    Blocked,
    AuthExpired,
    Status(u16),
    Timeout,
    Transport(String),
}

impl AttemptFailure {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::AuthExpired,
            403 => Self::Blocked,
            s => Self::Status(s),
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::AuthExpired => "auth_expired",
            Self::Status(_) => "status",
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
        }
    }
}

impl From<TransportError> for AttemptFailure {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Timeout => Self::Timeout,
            other => Self::Transport(other.to_string()),
        }
    }
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blocked => write!(f, "blocked (403)"),
            Self::AuthExpired => write!(f, "auth expired (401)"),
            Self::Status(s) => write!(f, "unexpected status {s}"),
            Self::Timeout => write!(f, "timeout"),
            Self::Transport(e) => write!(f, "{e}"),
        }
    }
}

/// Tagged result of one poll; collapsed to the uniform JSON contract only in the API layer.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Upstream answered with records. `entries` is the dedup delta (may be empty).
    Delivered {
        entries: Vec<RawRecord>,
        observed: usize,
        fallback: bool,
    },
    /// Payload decoded to an empty array.
    EmptyPayload,
    /// Every attempt failed.
    Blocked { attempts: u32, last: AttemptFailure },
    /// Body was not a JSON array.
    Malformed { reason: String },
    /// Could not even build a session.
    SessionFailed { reason: String },
}

impl PollOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Delivered { .. } => "delivered",
            Self::EmptyPayload => "empty",
            Self::Blocked { .. } => "blocked",
            Self::Malformed { .. } => "malformed",
            Self::SessionFailed { .. } => "session",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}
