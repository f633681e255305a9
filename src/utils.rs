use crate::error::{ComparisonError, Result};
use chrono::{Datelike, Days, NaiveDate};

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the calendar month preceding `date`'s month.
pub fn first_day_of_prev_month(date: NaiveDate) -> Result<NaiveDate> {
    let (year, month) = if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        ComparisonError::DateError(format!("No month precedes {}", date))
    })
}

pub fn sub_days(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_sub_days(Days::new(days)).ok_or_else(|| {
        ComparisonError::DateError(format!("Cannot subtract {} days from {}", days, date))
    })
}

/// Number of calendar days in the inclusive range `start..=end`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Parses the date formats found in GA4 exports: `YYYY-MM-DD` and the
/// compact `YYYYMMDD` returned by the reporting API.
pub fn parse_report_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.split([' ', 'T']).next().unwrap_or(trimmed);

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%Y%m%d"))
        .map_err(|_| {
            ComparisonError::DateError(format!(
                "Invalid date '{}'. Expected YYYY-MM-DD or YYYYMMDD",
                raw
            ))
        })
}

/// Short day label used on comparison charts, e.g. `31/01`.
pub fn day_label(date: NaiveDate) -> String {
    date.format("%d/%m").to_string()
}
