//! ISO-8601 UTC timestamp discipline.
//!
//! Every timestamp this crate produces ends in a literal `Z`, never
//! `+00:00` or `+00:00Z`. Windowing logic throughout the crate (dedup
//! refresh, correlation merge, ETA proximity) relies on these strings
//! sorting lexicographically the same as they sort chronologically, so
//! `format_z`/`parse_z` are the only sanctioned boundary between
//! `DateTime<Utc>` and its wire representation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

/// Formats a UTC timestamp as `YYYY-MM-DDTHH:MM:SSZ` (no fractional seconds).
pub fn format_z(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Formats with microsecond precision, still `Z`-terminated.
pub fn format_z_micros(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Parses a strict `...Z` ISO-8601 UTC timestamp. Returns `None` on any
/// other shape rather than erroring — callers treat an unparseable
/// timestamp as "unknown", not as a hard failure.
pub fn parse_z(s: &str) -> Option<DateTime<Utc>> {
    let trimmed = s.strip_suffix('Z')?;
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Best-effort ETA parsing, mirroring the original's tolerance for
/// heterogeneous upstream date formats: date-only values are anchored to
/// the end of that day (23:59:59), naive datetimes are assumed UTC, and
/// anything unparseable yields `None` rather than propagating an error.
pub fn parse_eta_date_safely(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(dt) = parse_z(raw) {
        return Some(dt);
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            let naive = date.and_hms_opt(23, 59, 59)?;
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    None
}

/// `true` when `eta` falls within `[-7d, +48h]` of `now` — the window the
/// impact scorer treats as "near-term enough to matter".
pub fn is_eta_within_window(eta: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let lower = now - chrono::Duration::days(7);
    let upper = now + chrono::Duration::hours(48);
    eta >= lower && eta <= upper
}

/// Strategy for truncating timestamps embedded in replayable artifacts, so
/// two runs of the same inputs produce byte-identical `RunRecord` files.
#[derive(Debug, Clone)]
pub enum CanonicalizeTime {
    /// Pin every timestamp in the artifact to a fixed value.
    Fixed(DateTime<Utc>),
    /// Truncate sub-second precision to `n` digits (0 drops fractional
    /// seconds entirely).
    Precision(u32),
}

impl CanonicalizeTime {
    pub fn apply(&self, dt: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            CanonicalizeTime::Fixed(fixed) => *fixed,
            CanonicalizeTime::Precision(digits) => {
                let nanos = dt.timestamp_subsec_nanos();
                let divisor = 10u32.pow(9 - (*digits).min(9));
                let truncated_nanos = (nanos / divisor) * divisor;
                dt.date_naive()
                    .and_hms_nano_opt(dt.time().hour(), dt.time().minute(), dt.time().second(), truncated_nanos)
                    .map(|naive| Utc.from_utc_datetime(&naive))
                    .unwrap_or(dt)
            }
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// spec.md §8: invalid ETA strings never raise; they return `None`.
        #[test]
        fn eta_parsing_never_panics_on_arbitrary_input(raw in ".{0,32}") {
            let _ = parse_eta_date_safely(&raw);
        }

        /// Every string `format_z` produces ends in `Z` and round-trips
        /// through `parse_z` to the same instant (sub-second truncated
        /// away, since `format_z` only emits whole seconds).
        #[test]
        fn format_z_roundtrips_through_parse_z(secs in 0i64..4_102_444_800i64) {
            let dt = Utc.timestamp_opt(secs, 0).single().unwrap();
            let formatted = format_z(dt);
            prop_assert!(formatted.ends_with('Z'));
            prop_assert!(!formatted.ends_with("+00:00Z"));
            prop_assert_eq!(parse_z(&formatted), Some(dt));
        }
    }
}
