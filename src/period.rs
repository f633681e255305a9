//! Current and prior reporting windows.

use crate::error::{ComparisonError, Result};
use crate::schema::PeriodType;
use crate::utils::{days_inclusive, first_day_of_month, first_day_of_prev_month, sub_days};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive date range, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(ComparisonError::DateError(format!(
                "Window end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn len_days(&self) -> i64 {
        days_inclusive(self.start, self.end)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

impl fmt::Display for PeriodWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%d/%m/%Y"),
            self.end.format("%d/%m/%Y")
        )
    }
}

/// The active reporting window and the window it is compared against.
///
/// `prior.end` is always the day before `current.start`. For trailing-day
/// periods both windows have the same length; for the current month the prior
/// window starts on the first of the previous month and is usually longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodPair {
    pub period_type: PeriodType,
    pub current: PeriodWindow,
    pub prior: PeriodWindow,
}

impl PeriodPair {
    pub fn has_equal_lengths(&self) -> bool {
        self.current.len_days() == self.prior.len_days()
    }

    /// True when both windows cover exactly the same calendar dates.
    pub fn shares_dates(&self) -> bool {
        self.current == self.prior
    }
}

pub fn compute_period(period_type: PeriodType, reference_date: NaiveDate) -> Result<PeriodPair> {
    let (current, prior) = match period_type {
        PeriodType::CurrentMonth => {
            let current_start = first_day_of_month(reference_date);
            let prior_start = first_day_of_prev_month(reference_date)?;
            let prior_end = sub_days(current_start, 1)?;
            (
                PeriodWindow::new(current_start, reference_date)?,
                PeriodWindow::new(prior_start, prior_end)?,
            )
        }
        PeriodType::LastDays(days) => {
            if !PeriodType::SUPPORTED_TRAILING_DAYS.contains(&days) {
                return Err(ComparisonError::InvalidPeriodType(period_type.to_string()));
            }
            let span = u64::from(days - 1);
            let current_start = sub_days(reference_date, span)?;
            let prior_end = sub_days(current_start, 1)?;
            let prior_start = sub_days(prior_end, span)?;
            (
                PeriodWindow::new(current_start, reference_date)?,
                PeriodWindow::new(prior_start, prior_end)?,
            )
        }
    };

    Ok(PeriodPair {
        period_type,
        current,
        prior,
    })
}

/// Parses a period selector and computes its windows in one step.
pub fn compute_period_from_str(period_type: &str, reference_date: NaiveDate) -> Result<PeriodPair> {
    compute_period(period_type.parse()?, reference_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_last_seven_days() {
        let pair = compute_period_from_str("last 7 days", date(2024, 1, 31)).unwrap();
        assert_eq!(pair.current.start, date(2024, 1, 25));
        assert_eq!(pair.current.end, date(2024, 1, 31));
        assert_eq!(pair.prior.start, date(2024, 1, 18));
        assert_eq!(pair.prior.end, date(2024, 1, 24));
    }

    #[test]
    fn test_trailing_windows_are_contiguous_and_equal() {
        let references = [
            date(2024, 1, 1),
            date(2024, 2, 29),
            date(2023, 3, 1),
            date(2024, 12, 31),
        ];
        for reference in references {
            for days in PeriodType::SUPPORTED_TRAILING_DAYS {
                let pair = compute_period(PeriodType::LastDays(days), reference).unwrap();
                assert!(pair.has_equal_lengths());
                assert_eq!(pair.current.len_days(), i64::from(days));
                assert_eq!(pair.prior.end.succ_opt().unwrap(), pair.current.start);
                assert_eq!(pair.current.end, reference);
            }
        }
    }

    #[test]
    fn test_current_month_windows() {
        let pair = compute_period(PeriodType::CurrentMonth, date(2024, 3, 10)).unwrap();
        assert_eq!(pair.current.start, date(2024, 3, 1));
        assert_eq!(pair.current.end, date(2024, 3, 10));
        assert_eq!(pair.prior.start, date(2024, 2, 1));
        assert_eq!(pair.prior.end, date(2024, 2, 29));
        assert!(!pair.has_equal_lengths());
    }

    #[test]
    fn test_current_month_on_first_day_and_january() {
        let pair = compute_period(PeriodType::CurrentMonth, date(2024, 1, 1)).unwrap();
        assert_eq!(pair.current.start, date(2024, 1, 1));
        assert_eq!(pair.current.len_days(), 1);
        assert_eq!(pair.prior.start, date(2023, 12, 1));
        assert_eq!(pair.prior.end, date(2023, 12, 31));
        assert_eq!(pair.prior.len_days(), 31);
    }

    #[test]
    fn test_unsupported_trailing_days() {
        let result = compute_period(PeriodType::LastDays(10), date(2024, 1, 31));
        assert!(matches!(result, Err(ComparisonError::InvalidPeriodType(_))));

        let result = compute_period_from_str("this quarter", date(2024, 1, 31));
        assert!(matches!(result, Err(ComparisonError::InvalidPeriodType(_))));
    }

    #[test]
    fn test_window_helpers() {
        let window = PeriodWindow::new(date(2024, 1, 30), date(2024, 2, 2)).unwrap();
        assert!(window.contains(date(2024, 1, 31)));
        assert!(!window.contains(date(2024, 2, 3)));
        assert_eq!(window.dates().count(), 4);
        assert_eq!(window.to_string(), "30/01/2024 to 02/02/2024");
        assert!(PeriodWindow::new(date(2024, 2, 2), date(2024, 1, 30)).is_err());
    }
}
