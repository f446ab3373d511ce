//! Provider-local civil time for response timestamps.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    tz: Tz,
}

impl LocalClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn format(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.tz).format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn now_string(&self) -> String {
        self.format(Utc::now())
    }
}

impl Default for LocalClock {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_TIMEZONE)
    }
}
