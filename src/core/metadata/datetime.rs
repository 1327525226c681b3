//! Parsing of raw EXIF date strings.
//!
//! Cameras and editing tools disagree on how to write a timestamp. The
//! encodings seen in real libraries are listed in [`RULES`] and tried in
//! order; the first pattern that matches decides the chrono format used.
//! A string that matches no rule is a hard error.

use crate::error::MetadataError;
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

/// Known encodings as (pattern, chrono format), in evaluation order
const RULES: &[(&str, &str)] = &[
    (r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$", "%Y-%m-%d %H:%M:%S"),
    (r"^\d{4}:\d{2}:\d{2} \d{2}:\d{2}:\d{2}$", "%Y:%m:%d %H:%M:%S"),
    (r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{1,6}$", "%Y-%m-%d %H:%M:%S%.f"),
    (r"^\d{4}:\d{2}:\d{2} \d{2}:\d{2}:\d{2}\.\d{1,6}$", "%Y:%m:%d %H:%M:%S%.f"),
];

/// Values that mean "no timestamp recorded"
const SENTINELS: &[&str] = &[
    // Empty, or the blank "    :  :     :  :  " placeholder
    r"^[ :]*$",
    r"^0000[:-]00[:-]00 00:00:00$",
];

/// Format used for the index `datestamp` column
const STORED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

struct CompiledRules {
    sentinels: Vec<Regex>,
    rules: Vec<(Regex, &'static str)>,
}

fn compiled() -> &'static CompiledRules {
    static RULES_CELL: OnceLock<CompiledRules> = OnceLock::new();
    RULES_CELL.get_or_init(|| CompiledRules {
        sentinels: SENTINELS
            .iter()
            .map(|p| Regex::new(p).expect("sentinel pattern is valid"))
            .collect(),
        rules: RULES
            .iter()
            .map(|(p, fmt)| (Regex::new(p).expect("capture time pattern is valid"), *fmt))
            .collect(),
    })
}

/// Parse a raw EXIF date string
///
/// Trailing NULs and surrounding whitespace are ignored. Sentinel values
/// return `Ok(None)`; anything outside the known encodings returns
/// [`MetadataError::UnrecognizedFormat`].
pub fn parse_capture_time(raw: &str) -> Result<Option<NaiveDateTime>, MetadataError> {
    let value = raw.trim_end_matches('\0').trim();
    let rules = compiled();

    if rules.sentinels.iter().any(|re| re.is_match(value)) {
        return Ok(None);
    }

    let unrecognized = || MetadataError::UnrecognizedFormat {
        value: raw.to_string(),
    };

    let format = rules
        .rules
        .iter()
        .find(|(re, _)| re.is_match(value))
        .map(|(_, format)| *format)
        .ok_or_else(unrecognized)?;

    // Right shape, impossible date (e.g. month 13)
    NaiveDateTime::parse_from_str(value, format)
        .map(Some)
        .map_err(|_| unrecognized())
}

/// Render a capture time for the index
pub fn format_capture_time(time: &NaiveDateTime) -> String {
    time.format(STORED_FORMAT).to_string()
}

/// Read a capture time back from the index
pub fn parse_stored_capture_time(stored: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(stored, STORED_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn expected() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, 12)
            .unwrap()
            .and_hms_opt(9, 14, 20)
            .unwrap()
    }

    fn seconds(time: NaiveDateTime) -> NaiveDateTime {
        time.with_nanosecond(0).unwrap()
    }

    #[test]
    fn hyphen_and_colon_dates_agree() {
        assert_eq!(parse_capture_time("2021-06-12 09:14:20").unwrap(), Some(expected()));
        assert_eq!(parse_capture_time("2021:06:12 09:14:20").unwrap(), Some(expected()));
    }

    #[test]
    fn fractional_seconds_agree_at_second_precision() {
        let colon = parse_capture_time("2021:06:12 09:14:20.345").unwrap().unwrap();
        let hyphen = parse_capture_time("2021-06-12 09:14:20.345678").unwrap().unwrap();

        assert_eq!(seconds(colon), expected());
        assert_eq!(seconds(hyphen), expected());
        assert_eq!(colon.nanosecond(), 345_000_000);
    }

    #[test]
    fn sentinels_are_none() {
        assert_eq!(parse_capture_time("").unwrap(), None);
        assert_eq!(parse_capture_time("0000:00:00 00:00:00").unwrap(), None);
        assert_eq!(parse_capture_time("    :  :     :  :  ").unwrap(), None);
        assert_eq!(parse_capture_time("\0").unwrap(), None);
    }

    #[test]
    fn trailing_nul_is_ignored() {
        assert_eq!(
            parse_capture_time("2021:06:12 09:14:20\0").unwrap(),
            Some(expected())
        );
    }

    #[test]
    fn unknown_separator_is_an_error() {
        let err = parse_capture_time("2021x06x12 09:14:20").unwrap_err();
        assert!(matches!(err, MetadataError::UnrecognizedFormat { ref value } if value == "2021x06x12 09:14:20"));
    }

    #[test]
    fn too_many_fraction_digits_is_an_error() {
        assert!(parse_capture_time("2021:06:12 09:14:20.1234567").is_err());
    }

    #[test]
    fn impossible_date_is_an_error() {
        assert!(parse_capture_time("2021:13:12 09:14:20").is_err());
    }

    #[test]
    fn stored_format_round_trips() {
        let plain = expected();
        assert_eq!(format_capture_time(&plain), "2021-06-12 09:14:20");
        assert_eq!(parse_stored_capture_time("2021-06-12 09:14:20"), Some(plain));

        let fractional = parse_capture_time("2018:11:25 07:09:07.547").unwrap().unwrap();
        let stored = format_capture_time(&fractional);
        assert_eq!(stored, "2018-11-25 07:09:07.547");
        assert_eq!(parse_stored_capture_time(&stored), Some(fractional));
    }
}
