//! Public projection of provider records.

use serde::Serialize;
use serde_json::Value;

use crate::ingest::types::RawRecord;

pub const MISSING_TEXT: &str = "N/A";
pub const MISSING_LINK: &str = "#";

/// Shape served by `/get_announcements`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Announcement {
    pub company: String,
    pub title: String,
    pub short_description: String,
    pub timestamp: String,
    pub link: String,
}

fn field(record: &RawRecord, key: &str, default: &str) -> String {
    match record.get(key) {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

impl From<&RawRecord> for Announcement {
    fn from(r: &RawRecord) -> Self {
        Self {
            company: field(r, "symbol", MISSING_TEXT),
            title: field(r, "desc", MISSING_TEXT),
            short_description: field(r, "attchmntText", MISSING_TEXT),
            timestamp: field(r, "sort_date", MISSING_TEXT),
            link: field(r, "attchmntFile", MISSING_LINK),
        }
    }
}

pub fn project(records: &[RawRecord]) -> Vec<Announcement> {
    records.iter().map(Announcement::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_provider_keys() {
        let r = json!({
            "symbol": "INFY",
            "desc": "Board Meeting",
            "attchmntText": "Outcome of board meeting",
            "sort_date": "2024-03-01 18:02:11",
            "attchmntFile": "https://example.invalid/a.pdf",
            "seq_id": "101"
        });
        let a = Announcement::from(r.as_object().unwrap());
        assert_eq!(a.company, "INFY");
        assert_eq!(a.title, "Board Meeting");
        assert_eq!(a.short_description, "Outcome of board meeting");
        assert_eq!(a.timestamp, "2024-03-01 18:02:11");
        assert_eq!(a.link, "https://example.invalid/a.pdf");
    }

    #[test]
    fn missing_and_null_fields_get_placeholders() {
        let r = json!({"symbol": null, "seq_id": 5});
        let a = Announcement::from(r.as_object().unwrap());
        assert_eq!(a.company, "N/A");
        assert_eq!(a.title, "N/A");
        assert_eq!(a.short_description, "N/A");
        assert_eq!(a.timestamp, "N/A");
        assert_eq!(a.link, "#");
    }
}
