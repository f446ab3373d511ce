// src/config/mod.rs
//! Runtime configuration: built-in defaults, an optional TOML file, then env overrides.

pub mod file;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;

use self::file::FileConfig;

pub const ENV_CONFIG_PATH: &str = "ANNOUNCEMENTS_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/announcements.toml";

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_LANDING_URL: &str =
    "https://www.nseindia.com/companies-listing/corporate-filings-announcements";
pub const DEFAULT_DATA_URL: &str =
    "https://www.nseindia.com/api/corporate-announcements?index=equities";
pub const DEFAULT_REFERER: &str = "https://www.nseindia.com/";
pub const DEFAULT_BOOTSTRAP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/80.0.3987.149 Safari/537.36";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0 Safari/537.36";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Kolkata;

#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamConfig {
    pub landing_url: String,
    pub data_url: String,
    pub referer: String,
    pub bootstrap_user_agent: String,
    pub user_agent: String,
    pub accept_language: String,
    pub bootstrap_timeout: Duration,
    /// Per data request, always >= 1 s.
    pub request_timeout: Duration,
    /// Attempts per poll, always >= 1.
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            landing_url: DEFAULT_LANDING_URL.to_string(),
            data_url: DEFAULT_DATA_URL.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            bootstrap_user_agent: DEFAULT_BOOTSTRAP_USER_AGENT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            bootstrap_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(20),
            retries: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub upstream: UpstreamConfig,
    pub timezone: Tz,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            upstream: UpstreamConfig::default(),
            timezone: DEFAULT_TIMEZONE,
        }
    }
}

impl AppConfig {
    /// Load using env var + fallbacks:
    /// 1) $ANNOUNCEMENTS_CONFIG_PATH (must exist)
    /// 2) config/announcements.toml
    /// 3) built-in defaults
    ///
    /// Env overrides are applied last.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(path) = resolve_config_path()? {
            let fc = FileConfig::load_from(&path)?;
            cfg.merge_file(fc)?;
        }
        cfg.apply_env_with(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    pub fn merge_file(&mut self, fc: FileConfig) -> Result<()> {
        if let Some(bind) = fc.server.bind {
            self.bind = bind
                .parse()
                .with_context(|| format!("invalid [server].bind '{bind}'"))?;
        }

        let up = fc.upstream;
        let u = &mut self.upstream;
        if let Some(v) = up.landing_url {
            u.landing_url = v;
        }
        if let Some(v) = up.data_url {
            u.data_url = v;
        }
        if let Some(v) = up.referer {
            u.referer = v;
        }
        if let Some(v) = up.bootstrap_user_agent {
            u.bootstrap_user_agent = v;
        }
        if let Some(v) = up.user_agent {
            u.user_agent = v;
        }
        if let Some(v) = up.accept_language {
            u.accept_language = v;
        }
        if let Some(v) = up.bootstrap_timeout_secs {
            u.bootstrap_timeout = Duration::from_secs(v);
        }
        if let Some(v) = up.request_timeout_secs {
            u.request_timeout = timeout_secs(v);
        }
        if let Some(v) = up.retries {
            u.retries = v.max(1);
        }
        if let Some(v) = up.retry_delay_secs {
            u.retry_delay = Duration::from_secs(v);
        }

        if let Some(tz) = fc.clock.timezone {
            self.timezone = parse_timezone(&tz)?;
        }
        Ok(())
    }

    /// Apply env overrides through `lookup` (tests pass a closure instead of touching the process env).
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("BIND_ADDR") {
            match addr.trim().parse() {
                Ok(a) => self.bind = a,
                Err(_) => tracing::warn!(value = %addr, "ignoring unparseable BIND_ADDR"),
            }
        } else {
            if let Some(host) = lookup("HOST") {
                match host.trim().parse() {
                    Ok(ip) => self.bind.set_ip(ip),
                    Err(_) => tracing::warn!(value = %host, "ignoring unparseable HOST"),
                }
            }
            if let Some(port) = parse_env::<u16>(&lookup, "PORT") {
                self.bind.set_port(port);
            }
        }

        if let Some(n) = parse_env::<u32>(&lookup, "UPSTREAM_RETRIES") {
            self.upstream.retries = n.max(1);
        }
        if let Some(s) = parse_env::<u64>(&lookup, "UPSTREAM_RETRY_DELAY_SECS") {
            self.upstream.retry_delay = Duration::from_secs(s);
        }
        if let Some(s) = parse_env::<u64>(&lookup, "UPSTREAM_TIMEOUT_SECS") {
            self.upstream.request_timeout = timeout_secs(s);
        }
        if let Some(tz) = lookup("ANNOUNCEMENTS_TZ") {
            self.timezone = parse_timezone(&tz)?;
        }
        Ok(())
    }
}

/// Request timeouts are at least 1 s.
fn timeout_secs(secs: u64) -> Duration {
    if secs == 0 {
        tracing::warn!("request timeout of 0 s raised to 1 s");
    }
    Duration::from_secs(secs.max(1))
}

fn parse_env<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable env override");
            None
        }
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow!("unknown timezone '{name}': {e}"))
}

fn resolve_config_path() -> Result<Option<PathBuf>> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
    Ok(fallback.exists().then_some(fallback))
}
