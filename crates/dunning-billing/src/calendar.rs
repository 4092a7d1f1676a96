//! Calendar helpers. "Today" is always the current UTC date.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use dunning_core::error::{DunningError, DunningResult};
use regex::Regex;

const LOCAL_DATE_PATTERN: &str =
    r"^(\d{2})/(\d{2})/(\d{4})(?:\s+(\d{2}):(\d{2})(?::(\d{2}))?)?$";

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Midnight UTC of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Month and year to report on. Missing or out-of-range values fall
/// back to the month/year of `today`.
pub fn resolve_month(month: Option<u32>, year: Option<i32>, today: NaiveDate) -> (u32, i32) {
    let month = month
        .filter(|m| (1..=12).contains(m))
        .unwrap_or(today.month());
    let year = year
        .filter(|y| (2000..=2100).contains(y))
        .unwrap_or(today.year());
    (month, year)
}

/// `[first day of month, first day of next month)`.
pub fn month_bounds(month: u32, year: i32) -> DunningResult<(NaiveDate, NaiveDate)> {
    let invalid = || DunningError::validation(format!("invalid month {month}/{year}"));
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    Ok((start, end))
}

pub fn next_day(date: NaiveDate) -> NaiveDate {
    date + Duration::days(1)
}

/// Parse a client-supplied timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD`, and
/// `dd/MM/yyyy[ HH:mm[:ss]]`. Offset-less values are read as UTC.
/// Empty strings and the literal `null` mean "no timestamp".
pub fn parse_flexible_datetime(raw: &str) -> DunningResult<Option<DateTime<Utc>>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" {
        return Ok(None);
    }

    let pattern = Regex::new(LOCAL_DATE_PATTERN)
        .map_err(|e| DunningError::Internal(format!("date pattern: {e}")))?;
    if let Some(caps) = pattern.captures(raw) {
        let field = |i: usize, default: u32| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or(default)
        };
        let year = caps
            .get(3)
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .unwrap_or_default();
        return NaiveDate::from_ymd_opt(year, field(2, 0), field(1, 0))
            .and_then(|d| d.and_hms_opt(field(4, 0), field(5, 0), field(6, 0)))
            .map(|dt| Some(dt.and_utc()))
            .ok_or_else(|| {
                DunningError::validation(format!("invalid date {raw:?}, expected dd/MM/yyyy HH:mm:ss"))
            });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Some(dt.and_utc()));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(start_of_day(date)));
    }

    Err(DunningError::validation(format!(
        "invalid date {raw:?}, expected ISO 8601 or dd/MM/yyyy HH:mm:ss"
    )))
}
