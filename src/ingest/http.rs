// src/ingest/http.rs
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::COOKIE;
use reqwest::Url;

use crate::ingest::types::{
    cookie_header, parse_cookie_header, CookieJar, HttpSession, SessionFactory, TransportError,
    UpstreamRequest, UpstreamResponse,
};

/// Builds one `reqwest::Client` per poll so no connection or cookie state leaks across polls.
#[derive(Debug, Clone, Default)]
pub struct ReqwestSessionFactory;

impl SessionFactory for ReqwestSessionFactory {
    fn open(&self) -> Result<Box<dyn HttpSession>> {
        let store = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&store))
            .build()
            .context("building upstream http client")?;
        Ok(Box::new(ReqwestSession { client, store }))
    }

    fn name(&self) -> &'static str {
        "nse-http"
    }
}

/// A client plus the cookie store it shares for the life of one poll.
/// Cookies set on redirect hops or on failed data responses land in `store`.
pub struct ReqwestSession {
    client: reqwest::Client,
    store: Arc<Jar>,
}

impl ReqwestSession {
    fn stored_for(&self, url: &Url) -> CookieJar {
        self.store
            .cookies(url)
            .and_then(|v| v.to_str().ok().map(parse_cookie_header))
            .unwrap_or_default()
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

#[async_trait]
impl HttpSession for ReqwestSession {
    async fn get(&self, req: &UpstreamRequest<'_>) -> Result<UpstreamResponse, TransportError> {
        let url = Url::parse(req.url).map_err(|e| TransportError::Other(e.to_string()))?;

        // the session store is fresher than the caller's jar on name clashes
        let mut outgoing = req.cookies.clone();
        outgoing.extend(self.stored_for(&url));

        let mut builder = self.client.get(url).timeout(req.timeout);
        for (name, value) in req.headers {
            builder = builder.header(*name, value.as_str());
        }
        if !outgoing.is_empty() {
            builder = builder.header(COOKIE, cookie_header(&outgoing));
        }

        let resp = builder.send().await.map_err(|e| {
            tracing::debug!(error = ?e, url = req.url, "upstream http error");
            TransportError::from(e)
        })?;

        let status = resp.status().as_u16();
        let mut cookies: CookieJar = resp
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        cookies.extend(self.stored_for(resp.url()));
        let body = resp.text().await?;

        Ok(UpstreamResponse {
            status,
            cookies,
            body,
        })
    }
}
