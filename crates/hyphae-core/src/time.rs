//! UTC timestamps for persisted documents, without a calendar dependency.

use std::time::{SystemTime, UNIX_EPOCH};

const SECS_PER_DAY: u64 = 86_400;
const DAYS_PER_MONTH: [u64; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// `YYYY-MM-DDTHH:MM:SSZ` for the current instant.
pub fn iso8601_now() -> String {
    iso8601(unix_now())
}

/// Compact `YYYYMMDDTHHMMSSZ` form, safe inside file names.
pub fn compact_now() -> String {
    let (date, (h, m, s)) = split(unix_now());
    format!("{:04}{:02}{:02}T{h:02}{m:02}{s:02}Z", date.0, date.1, date.2)
}

pub fn iso8601(secs: u64) -> String {
    let ((y, mo, d), (h, mi, s)) = split(secs);
    format!("{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:{s:02}Z")
}

fn split(secs: u64) -> ((u64, u64, u64), (u64, u64, u64)) {
    let clock = secs % SECS_PER_DAY;
    let date = date_from_days(secs / SECS_PER_DAY);
    (date, (clock / 3600, clock % 3600 / 60, clock % 60))
}

fn is_leap(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Days since 1970-01-01 to (year, month, day).
fn date_from_days(mut days: u64) -> (u64, u64, u64) {
    let mut year = 1970;
    loop {
        let len = if is_leap(year) { 366 } else { 365 };
        if days < len {
            break;
        }
        days -= len;
        year += 1;
    }
    let mut month = 1;
    for (i, &base) in DAYS_PER_MONTH.iter().enumerate() {
        let len = if i == 1 && is_leap(year) { base + 1 } else { base };
        if days < len {
            break;
        }
        days -= len;
        month += 1;
    }
    (year, month, days + 1)
}
