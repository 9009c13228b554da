//! Creation-Date Normalizer.
//!
//! Accepts a native `chrono::DateTime<FixedOffset>`, or one of two textual
//! forms (ExifTool's `YYYY:MM:DD[ T]HH:MM:SS+-HH[:]MM`, or the ISO-ish
//! `YYYY-MM-DDTHH:MM:SS+-HH[:]MM`), each with or without a colon in the
//! timezone. Output is always `YYYY-MM-DDTHH:MM:SS+-HHMM`.

use chrono::{DateTime, FixedOffset};

use crate::error::{Error, Result};

const OUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Format an already-parsed timestamp the way the rewriter wants it.
pub fn format_datetime(dt: &DateTime<FixedOffset>) -> String {
    dt.format(OUT_FORMAT).to_string()
}

/// Normalize a textual creation-date into `YYYY-MM-DDTHH:MM:SS+-HHMM`.
pub fn normalize_str(input: &str) -> Result<String> {
    let canonical = to_canonical(input)
        .ok_or_else(|| Error::UnsupportedDateFormat(input.to_string()))?;
    let dt = DateTime::parse_from_str(&canonical, OUT_FORMAT)
        .map_err(|_| Error::UnsupportedDateFormat(input.to_string()))?;
    Ok(format_datetime(&dt))
}

/// Rewrite either accepted textual form into
/// `YYYY-MM-DDTHH:MM:SS+-HHMM` (still as a string - numeric validity is
/// left to the subsequent `chrono` parse), or `None` if the shape doesn't
/// match either accepted form at all.
fn to_canonical(input: &str) -> Option<String> {
    let b = input.trim().as_bytes();
    if b.len() < 19 {
        return None;
    }
    let is_digit = |c: u8| c.is_ascii_digit();
    let digits = |s: &[u8]| s.iter().all(|&c| is_digit(c));

    let year = &b[0..4];
    let date_sep1 = b[4];
    let month = &b[5..7];
    let date_sep2 = b[7];
    let day = &b[8..10];
    let dt_sep = b[10];
    let hour = &b[11..13];
    let time_sep1 = b[13];
    let minute = &b[14..16];
    let time_sep2 = b[16];
    let second = &b[17..19];

    if !digits(year) || !digits(month) || !digits(day) || !digits(hour) || !digits(minute) || !digits(second) {
        return None;
    }
    let date_ok = (date_sep1 == b':' && date_sep2 == b':') || (date_sep1 == b'-' && date_sep2 == b'-');
    if !date_ok {
        return None;
    }
    if dt_sep != b' ' && dt_sep != b'T' {
        return None;
    }
    if time_sep1 != b':' || time_sep2 != b':' {
        return None;
    }

    let tz = &b[19..];
    let tz = parse_tz(tz)?;

    Some(format!(
        "{}-{}-{}T{}:{}:{}{}",
        std::str::from_utf8(year).ok()?,
        std::str::from_utf8(month).ok()?,
        std::str::from_utf8(day).ok()?,
        std::str::from_utf8(hour).ok()?,
        std::str::from_utf8(minute).ok()?,
        std::str::from_utf8(second).ok()?,
        tz,
    ))
}

/// Accepts `+HHMM` or `+HH:MM` (also `-`), returns the `+HHMM` form.
fn parse_tz(tz: &[u8]) -> Option<String> {
    if tz.is_empty() || (tz[0] != b'+' && tz[0] != b'-') {
        return None;
    }
    let sign = tz[0] as char;
    let rest = &tz[1..];
    let (hh, mm) = match rest.len() {
        4 => (&rest[0..2], &rest[2..4]),
        5 if rest[2] == b':' => (&rest[0..2], &rest[3..5]),
        _ => return None,
    };
    if !hh.iter().all(|c| c.is_ascii_digit()) || !mm.iter().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!(
        "{sign}{}{}",
        std::str::from_utf8(hh).ok()?,
        std::str::from_utf8(mm).ok()?
    ))
}
