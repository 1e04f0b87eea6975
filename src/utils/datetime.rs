// src/utils/datetime.rs

//! Portal datetime normalization.
//!
//! The portal renders timestamps as `YYYY/MM/DD HH:MM(WeekdayKanji)`,
//! wall-clock in JST. The weekday annotation is decoration and is stripped
//! before parsing.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use regex::Regex;

use crate::error::{Result, UnipaError};

/// Wall-clock format used by the portal, without the weekday annotation.
const PORTAL_FORMAT: &str = "%Y/%m/%d %H:%M";

static PAREN_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.+?\)").unwrap());

/// The portal's fixed UTC+9 offset.
pub fn portal_offset() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("UTC+9 is a valid offset")
}

/// Parse a portal datetime text into a timezone-aware timestamp.
///
/// Empty input yields `Ok(None)`; malformed non-empty input is an error,
/// since it means the markup shifted under us.
pub fn process_datetime(text: &str) -> Result<Option<DateTime<FixedOffset>>> {
    if text.trim().is_empty() {
        return Ok(None);
    }

    let stripped = PAREN_ANNOTATION.replace_all(text, "");
    let normalized = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    let naive = NaiveDateTime::parse_from_str(&normalized, PORTAL_FORMAT)
        .map_err(|e| UnipaError::structure(format!("unparseable portal datetime {text:?}: {e}")))?;

    naive
        .and_local_timezone(portal_offset())
        .single()
        .ok_or_else(|| UnipaError::structure(format!("ambiguous portal datetime {text:?}")))
        .map(Some)
}

/// Format a timestamp back into the portal's text form.
pub fn format_datetime(datetime: &DateTime<FixedOffset>) -> String {
    datetime
        .with_timezone(&portal_offset())
        .format(PORTAL_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_process_datetime_with_weekday() {
        let parsed = process_datetime("2024/04/01(月) 09:00").unwrap().unwrap();
        let expected = portal_offset()
            .with_ymd_and_hms(2024, 4, 1, 9, 0, 0)
            .unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_process_datetime_without_weekday() {
        let parsed = process_datetime("2024/09/30 18:00").unwrap().unwrap();
        let expected = portal_offset()
            .with_ymd_and_hms(2024, 9, 30, 18, 0, 0)
            .unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_process_datetime_empty_is_none() {
        assert!(process_datetime("").unwrap().is_none());
        assert!(process_datetime("   ").unwrap().is_none());
    }

    #[test]
    fn test_process_datetime_malformed_is_error() {
        assert!(process_datetime("tomorrow").is_err());
    }

    #[test]
    fn test_round_trip() {
        let original = portal_offset()
            .with_ymd_and_hms(2031, 12, 31, 23, 59, 0)
            .unwrap();
        let reparsed = process_datetime(&format_datetime(&original))
            .unwrap()
            .unwrap();
        assert_eq!(reparsed, original);
    }
}
