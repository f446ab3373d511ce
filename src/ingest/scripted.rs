// src/ingest/scripted.rs
//! In-process upstream for tests and local demos: queued responses per endpoint,
//! every request recorded.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::config::UpstreamConfig;
use crate::ingest::types::{
    CookieJar, HttpSession, SessionFactory, TransportError, UpstreamRequest, UpstreamResponse,
};

type Reply = Result<UpstreamResponse, TransportError>;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub cookies: CookieJar,
    pub timeout: Duration,
    pub at: tokio::time::Instant,
}

impl RecordedCall {
    pub fn has_header(&self, name: &str, value: &str) -> bool {
        self.headers
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case(name) && v == value)
    }
}

struct State {
    landing: VecDeque<Reply>,
    data: VecDeque<Reply>,
    landing_default: Reply,
    data_default: Reply,
    calls: Vec<RecordedCall>,
    opens: usize,
    fail_open: bool,
}

/// Requests to the configured landing URL are answered from the landing queue,
/// everything else from the data queue. Empty queues fall back to a default:
/// a 200 setting `nsit=bootstrap` for the landing page, a timeout for data.
#[derive(Clone)]
pub struct ScriptedUpstream {
    landing_url: String,
    state: Arc<Mutex<State>>,
}

impl ScriptedUpstream {
    pub fn new(cfg: &UpstreamConfig) -> Self {
        Self {
            landing_url: cfg.landing_url.clone(),
            state: Arc::new(Mutex::new(State {
                landing: VecDeque::new(),
                data: VecDeque::new(),
                landing_default: Ok(UpstreamResponse::ok("").with_cookie("nsit", "bootstrap")),
                data_default: Err(TransportError::Timeout),
                calls: Vec::new(),
                opens: 0,
                fail_open: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn landing(self, reply: Reply) -> Self {
        self.lock().landing.push_back(reply);
        self
    }

    pub fn data(self, reply: Reply) -> Self {
        self.lock().data.push_back(reply);
        self
    }

    pub fn data_default(self, reply: Reply) -> Self {
        self.lock().data_default = reply;
        self
    }

    /// Make `SessionFactory::open` fail.
    pub fn fail_open(self) -> Self {
        self.lock().fail_open = true;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn data_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.url != self.landing_url)
            .collect()
    }

    pub fn landing_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.url == self.landing_url)
            .count()
    }

    pub fn opens(&self) -> usize {
        self.lock().opens
    }
}

#[async_trait::async_trait]
impl HttpSession for ScriptedUpstream {
    async fn get(&self, req: &UpstreamRequest<'_>) -> Result<UpstreamResponse, TransportError> {
        let mut st = self.lock();
        st.calls.push(RecordedCall {
            url: req.url.to_string(),
            headers: req
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            cookies: req.cookies.clone(),
            timeout: req.timeout,
            at: tokio::time::Instant::now(),
        });
        if req.url == self.landing_url {
            st.landing
                .pop_front()
                .unwrap_or_else(|| st.landing_default.clone())
        } else {
            st.data.pop_front().unwrap_or_else(|| st.data_default.clone())
        }
    }
}

impl SessionFactory for ScriptedUpstream {
    fn open(&self) -> Result<Box<dyn HttpSession>> {
        let mut st = self.lock();
        if st.fail_open {
            return Err(anyhow!("scripted session refused to open"));
        }
        st.opens += 1;
        Ok(Box::new(self.clone()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
