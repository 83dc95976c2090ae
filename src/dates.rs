use chrono::{DateTime, NaiveDate, NaiveDateTime};

pub const MISSING: &str = "--";

/// Parses the date shapes the record tables hold: plain `YYYY-MM-DD`, naive
/// ISO timestamps, and RFC 3339 timestamps. Anything else reads as `None`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.naive_local());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(value) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(value);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub fn format_display(value: Option<NaiveDateTime>) -> String {
    match value {
        Some(value) => value.format("%d/%m/%Y").to_string(),
        None => MISSING.to_string(),
    }
}
