//! Timestamp normalization.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value as Json;

/// Parse a stored timestamp into UTC.
///
/// Accepts RFC 3339 strings, naive `YYYY-MM-DD HH:MM:SS[.f]` strings (read
/// as UTC), epoch milliseconds, and extended-JSON `{"$date": ...}` wrappers
/// around any of those or around `{"$numberLong": "<ms>"}`.
pub fn parse_timestamp(value: &Json) -> Option<DateTime<Utc>> {
    match value {
        Json::String(s) => parse_str(s),
        Json::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Json::Object(map) => {
            if let Some(inner) = map.get("$date") {
                parse_timestamp(inner)
            } else if let Some(Json::String(ms)) = map.get("$numberLong") {
                ms.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn parse_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|ndt| ndt.and_utc())
}
