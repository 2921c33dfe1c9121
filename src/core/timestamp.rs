// LogScout - core/timestamp.rs
//
// Timestamp normaliser. Converts the timestamp conventions found in
// syslog-family logs into `DateTime<Utc>`.
//
// Formats are tried in a fixed order:
//   1. ISO-8601 / RFC 3339 (offset applied manually, no locale parsing)
//   2. Bare Unix epoch (seconds, milliseconds or microseconds by magnitude)
//   3. BSD syslog `Mon D HH:MM:SS` with year inference
//   4. A short list of generic layouts (slash dates, Apache, RFC 2822, ctime)
//   5. "now", so a timestamp that cannot be read never drops a line
//
// Year-less and offset-less stamps are interpreted as UTC.

use crate::util::constants;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Coarse classification of a timestamp string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampFormat {
    Iso8601,
    Unix,
    Syslog,
    Unknown,
}

fn iso_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{4})-(\d{2})-(\d{2})[Tt ](\d{2}):(\d{2})(?::(\d{2}))?(?:[.,](\d+))?\s*(Z|z|[+-]\d{2}(?::?\d{2})?)?$",
        )
        .expect("timestamp: invalid ISO regex")
    })
}

fn epoch_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{9,17})(?:\.(\d{1,9}))?$").expect("timestamp: invalid epoch regex")
    })
}

fn bsd_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^([A-Za-z]{3})\s+(\d{1,2})\s+(\d{1,2}):(\d{2}):(\d{2})(?:[.,](\d{1,9}))?(?:\s+(\d{4}))?$",
        )
        .expect("timestamp: invalid BSD regex")
    })
}

/// Parse `text` relative to the real clock. Never fails.
pub fn parse_timestamp(text: &str) -> DateTime<Utc> {
    parse_timestamp_at(text, Utc::now())
}

/// Parse `text` relative to `now`, falling back to `now` if nothing matches.
pub fn parse_timestamp_at(text: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    match try_parse_at(text, now) {
        Some(ts) => ts,
        None => {
            tracing::trace!(text, "Unrecognised timestamp, substituting current time");
            now
        }
    }
}

/// Parse `text` relative to `now` without the final "now" fallback.
pub fn try_parse_at(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    parse_iso8601(text)
        .or_else(|| parse_epoch(text))
        .or_else(|| parse_bsd(text, now))
        .or_else(|| parse_generic(text))
}

/// Classify the shape of a timestamp string.
pub fn detect_timestamp_format(text: &str) -> TimestampFormat {
    let text = text.trim();
    if iso_re().is_match(text) {
        TimestampFormat::Iso8601
    } else if epoch_re().is_match(text) {
        TimestampFormat::Unix
    } else if bsd_re().is_match(text) {
        TimestampFormat::Syslog
    } else {
        TimestampFormat::Unknown
    }
}

/// Render `ts` as a year-less BSD syslog timestamp (`Jan  5 14:03:09`).
pub fn format_syslog(ts: &DateTime<Utc>) -> String {
    ts.format("%b %e %H:%M:%S").to_string()
}

// =============================================================================
// Individual formats
// =============================================================================

fn parse_iso8601(text: &str) -> Option<DateTime<Utc>> {
    let caps = iso_re().captures(text)?;
    let num = |i: usize| -> Option<u32> { caps.get(i).and_then(|m| m.as_str().parse().ok()) };

    let date = NaiveDate::from_ymd_opt(num(1)? as i32, num(2)?, num(3)?)?;
    let nanos = caps
        .get(7)
        .map(|m| fraction_to_nanos(m.as_str()))
        .unwrap_or(0);
    let time = NaiveTime::from_hms_nano_opt(num(4)?, num(5)?, num(6).unwrap_or(0), nanos)?;
    let naive = NaiveDateTime::new(date, time);

    let offset_secs = match caps.get(8).map(|m| m.as_str()) {
        None | Some("Z") | Some("z") => 0,
        Some(off) => parse_offset_seconds(off)?,
    };

    Some(Utc.from_utc_datetime(&naive) - Duration::seconds(offset_secs))
}

/// `+05:30`, `-0800`, `+02` -> signed seconds east of UTC.
fn parse_offset_seconds(off: &str) -> Option<i64> {
    let sign = if off.starts_with('-') { -1 } else { 1 };
    let digits: String = off[1..].chars().filter(|c| c.is_ascii_digit()).collect();
    let hours: i64 = digits.get(0..2)?.parse().ok()?;
    let minutes: i64 = match digits.get(2..4) {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

/// Left-aligned decimal fraction to nanoseconds; extra digits are truncated.
fn fraction_to_nanos(frac: &str) -> u32 {
    let mut digits: String = frac.chars().take(9).collect();
    while digits.len() < 9 {
        digits.push('0');
    }
    digits.parse().unwrap_or(0)
}

fn parse_epoch(text: &str) -> Option<DateTime<Utc>> {
    let caps = epoch_re().captures(text)?;
    let whole: i64 = caps[1].parse().ok()?;

    if whole >= constants::EPOCH_MICROS_THRESHOLD {
        let secs = whole / 1_000_000;
        let nanos = (whole % 1_000_000) as u32 * 1_000;
        Utc.timestamp_opt(secs, nanos).single()
    } else if whole >= constants::EPOCH_MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(whole).single()
    } else {
        let nanos = caps
            .get(2)
            .map(|m| fraction_to_nanos(m.as_str()))
            .unwrap_or(0);
        Utc.timestamp_opt(whole, nanos).single()
    }
}

fn month_number(abbr: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = abbr.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == lower)
        .map(|i| i as u32 + 1)
}

fn parse_bsd(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = bsd_re().captures(text)?;
    let month = month_number(&caps[1])?;
    let day: u32 = caps[2].parse().ok()?;
    let nanos = caps
        .get(6)
        .map(|m| fraction_to_nanos(m.as_str()))
        .unwrap_or(0);
    let time = NaiveTime::from_hms_nano_opt(
        caps[3].parse().ok()?,
        caps[4].parse().ok()?,
        caps[5].parse().ok()?,
        nanos,
    )?;

    if let Some(year) = caps.get(7).and_then(|m| m.as_str().parse::<i32>().ok()) {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        return Some(Utc.from_utc_datetime(&NaiveDateTime::new(date, time)));
    }

    Some(infer_year(month, day, time, now)?)
}

/// Place a year-less date in the current year, or the previous one if that
/// would put it more than ~6 months in the future (rotation across New Year).
/// Feb 29 walks back to the nearest leap year.
fn infer_year(month: u32, day: u32, time: NaiveTime, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let horizon = now + Duration::days(constants::YEAR_ROLLOVER_FUTURE_DAYS);
    let mut first_valid = None;

    for back in 0..=4 {
        let Some(date) = NaiveDate::from_ymd_opt(now.year() - back, month, day) else {
            continue;
        };
        let candidate = Utc.from_utc_datetime(&NaiveDateTime::new(date, time));
        if candidate <= horizon {
            return Some(candidate);
        }
        first_valid.get_or_insert(candidate);
    }
    first_valid
}

fn parse_generic(text: &str) -> Option<DateTime<Utc>> {
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S%.f",
        "%Y%m%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%a %b %e %H:%M:%S %Y",
        "%b %d %Y %H:%M:%S",
    ];

    if let Ok(dt) = DateTime::parse_from_str(text, "%d/%b/%Y:%H:%M:%S %z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|ndt| ndt.and_utc())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_iso_with_offset_applied_manually() {
        let ts = parse_timestamp_at("2024-03-10T08:15:00+02:00", at(2024, 3, 10));
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 10, 6, 15, 0).unwrap());

        let ts = parse_timestamp_at("2024-03-10T08:15:00-0530", at(2024, 3, 10));
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 10, 13, 45, 0).unwrap());
    }

    #[test]
    fn test_iso_fractional_and_zulu() {
        let ts = parse_timestamp_at("2024-01-15T10:30:45.123456Z", at(2024, 1, 15));
        assert_eq!(ts.timestamp_subsec_micros(), 123_456);
        assert_eq!(ts.timestamp(), 1_705_314_645);
    }

    #[test]
    fn test_epoch_seconds_millis_micros() {
        let now = at(2024, 1, 1);
        let s = parse_timestamp_at("1705314645", now);
        let ms = parse_timestamp_at("1705314645000", now);
        let us = parse_timestamp_at("1705314645000000", now);
        assert_eq!(s, ms);
        assert_eq!(ms, us);
        assert_eq!(s.timestamp(), 1_705_314_645);
    }

    #[test]
    fn test_year_inference_uses_current_year() {
        let ts = parse_timestamp_at("Jan 1 00:00:00", at(2025, 7, 15));
        assert_eq!(ts.year(), 2025);
    }

    #[test]
    fn test_year_inference_rolls_back_across_new_year() {
        // On Jan 1st, a late-December line belongs to the previous year.
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 5, 0).unwrap();
        let ts = parse_timestamp_at("Dec 31 23:59:59", now);
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_leap_day_walks_back_to_leap_year() {
        let ts = parse_timestamp_at("Feb 29 10:00:00", at(2025, 3, 15));
        assert_eq!(ts.year(), 2024);
    }

    #[test]
    fn test_explicit_year_in_bsd_stamp() {
        let ts = parse_timestamp_at("Jan 15 10:30:45 2021", at(2025, 1, 1));
        assert_eq!(ts, Utc.with_ymd_and_hms(2021, 1, 15, 10, 30, 45).unwrap());
    }

    #[test]
    fn test_syslog_round_trip_within_window() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        for days_back in [0i64, 1, 30, 100, 170] {
            let original = now - Duration::days(days_back) - Duration::seconds(37);
            let text = format_syslog(&original);
            let parsed = parse_timestamp_at(&text, now);
            assert_eq!(parsed.timestamp(), original.timestamp(), "text: {text}");
        }
    }

    #[test]
    fn test_generic_fallbacks() {
        let now = at(2024, 1, 1);
        let apache = parse_timestamp_at("15/Jan/2024:14:30:22 +0000", now);
        assert_eq!(apache, Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 22).unwrap());

        let slash = parse_timestamp_at("2024/01/15 14:30:22", now);
        assert_eq!(slash, apache);
    }

    #[test]
    fn test_garbage_falls_back_to_now() {
        let now = at(2024, 5, 5);
        assert_eq!(parse_timestamp_at("not a time", now), now);
        assert_eq!(parse_timestamp_at("", now), now);
        assert!(try_parse_at("not a time", now).is_none());
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            detect_timestamp_format("2024-01-15T10:30:45Z"),
            TimestampFormat::Iso8601
        );
        assert_eq!(detect_timestamp_format("1705314645"), TimestampFormat::Unix);
        assert_eq!(
            detect_timestamp_format("Jan  5 10:30:45"),
            TimestampFormat::Syslog
        );
        assert_eq!(detect_timestamp_format("yesterday"), TimestampFormat::Unknown);
    }

    #[test]
    fn test_format_syslog_pads_day_with_space() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 5, 3, 4, 5).unwrap();
        assert_eq!(format_syslog(&ts), "Jan  5 03:04:05");
    }
}
