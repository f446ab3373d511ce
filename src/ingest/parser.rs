// src/ingest/parser.rs
use serde_json::Value;

use crate::ingest::types::RawRecord;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("payload is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("payload is a JSON {0}, expected an array")]
    NotAnArray(&'static str),
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode the provider payload. Non-object array elements are skipped.
pub fn parse_records(text: &str) -> Result<Vec<RawRecord>, ParseError> {
    let value: Value = serde_json::from_str(text)?;
    let items = match value {
        Value::Array(items) => items,
        other => return Err(ParseError::NotAnArray(kind_of(&other))),
    };

    let total = items.len();
    let records: Vec<RawRecord> = items
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(m) => Some(m),
            _ => None,
        })
        .collect();
    if records.len() < total {
        tracing::debug!(skipped = total - records.len(), "non-object records skipped");
    }
    Ok(records)
}

/// Plain contract: any decode problem is "no records".
pub fn parse_or_empty(text: &str) -> Vec<RawRecord> {
    parse_records(text).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_json_yields_empty() {
        assert!(parse_or_empty("{not valid json").is_empty());
        assert!(matches!(
            parse_records("{not valid json"),
            Err(ParseError::Decode(_))
        ));
    }

    #[test]
    fn wrong_shape_yields_empty() {
        assert!(parse_or_empty(r#"{"data": []}"#).is_empty());
        assert!(matches!(
            parse_records(r#"{"data": []}"#),
            Err(ParseError::NotAnArray("object"))
        ));
        assert!(parse_or_empty("").is_empty());
    }

    #[test]
    fn keeps_provider_order_and_skips_scalars() {
        let out = parse_records(r#"[{"seq_id":"2"}, 7, {"seq_id":"1"}, null]"#).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["seq_id"], "2");
        assert_eq!(out[1]["seq_id"], "1");
    }
}
