use crate::error::{ComparisonError, Result};
use crate::period::PeriodPair;
use crate::schema::{Metric, MetricRecord};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// How prior-period rows are matched to current-period rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStrategy {
    /// Match rows carrying the same calendar date. Only meaningful when both
    /// windows cover the same dates.
    CalendarDate,
    /// Match the Nth day of the current window with the Nth day of the prior
    /// window, regardless of their calendar dates.
    #[default]
    DayOffset,
}

impl JoinStrategy {
    /// Calendar-date join when the two windows cover identical dates, offset
    /// join otherwise.
    pub fn for_pair(pair: &PeriodPair) -> Self {
        if pair.shares_dates() {
            JoinStrategy::CalendarDate
        } else {
            JoinStrategy::DayOffset
        }
    }
}

/// A current-period day joined with its prior-period counterpart.
///
/// Prior fields are `None` when no prior row was matched, which is distinct
/// from a prior value of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRow {
    pub account: String,
    pub property: String,
    /// 0-based position of `date` within the current window's rows.
    pub day_index: usize,
    pub date: NaiveDate,
    pub sessions: u64,
    pub transactions: u64,
    pub revenue: f64,
    pub conversion_rate: f64,
    pub prior_date: Option<NaiveDate>,
    pub sessions_prior: Option<u64>,
    pub transactions_prior: Option<u64>,
    pub revenue_prior: Option<f64>,
    pub conversion_rate_prior: Option<f64>,
}

impl ReconciledRow {
    fn join(day_index: usize, current: &MetricRecord, prior: Option<&MetricRecord>) -> Self {
        Self {
            account: current.account.clone(),
            property: current.property.clone(),
            day_index,
            date: current.date,
            sessions: current.sessions,
            transactions: current.transactions,
            revenue: current.revenue,
            conversion_rate: current.conversion_rate,
            prior_date: prior.map(|p| p.date),
            sessions_prior: prior.map(|p| p.sessions),
            transactions_prior: prior.map(|p| p.transactions),
            revenue_prior: prior.map(|p| p.revenue),
            conversion_rate_prior: prior.map(|p| p.conversion_rate),
        }
    }

    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Sessions => self.sessions as f64,
            Metric::Transactions => self.transactions as f64,
            Metric::Revenue => self.revenue,
            Metric::ConversionRate => self.conversion_rate,
        }
    }

    pub fn prior_value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Sessions => self.sessions_prior.map(|v| v as f64),
            Metric::Transactions => self.transactions_prior.map(|v| v as f64),
            Metric::Revenue => self.revenue_prior,
            Metric::ConversionRate => self.conversion_rate_prior,
        }
    }

    pub fn has_prior(&self) -> bool {
        self.prior_date.is_some()
    }
}

/// Reconciled rows per account, each account's rows ordered by date.
pub type ReconciledSeries = BTreeMap<String, Vec<ReconciledRow>>;

/// Splits `records` into current and prior windows per account and joins the
/// prior rows onto the current rows using `strategy`.
///
/// Every current-window record produces exactly one row. Accounts without any
/// current-window record are left out.
pub fn reconcile(
    records: &[MetricRecord],
    pair: &PeriodPair,
    strategy: JoinStrategy,
) -> ReconciledSeries {
    let mut current: BTreeMap<&str, Vec<&MetricRecord>> = BTreeMap::new();
    let mut prior: BTreeMap<&str, Vec<&MetricRecord>> = BTreeMap::new();

    // A record may fall in both windows when they overlap.
    for record in records {
        if pair.current.contains(record.date) {
            current.entry(record.account.as_str()).or_default().push(record);
        }
        if pair.prior.contains(record.date) {
            prior.entry(record.account.as_str()).or_default().push(record);
        }
    }

    for account in prior.keys().filter(|a| !current.contains_key(*a)) {
        debug!(
            "Account '{}' has no rows between {} and {}, skipping",
            account, pair.current.start, pair.current.end
        );
    }

    let mut series = ReconciledSeries::new();
    for (account, mut current_rows) in current {
        let mut prior_rows = prior.remove(account).unwrap_or_default();
        current_rows.sort_by_key(|r| r.date);
        prior_rows.sort_by_key(|r| r.date);

        let rows = join_rows(&current_rows, &prior_rows, strategy);
        debug!(
            "Reconciled {} current rows for '{}' against {} prior rows ({:?})",
            rows.len(),
            account,
            prior_rows.len(),
            strategy
        );
        series.insert(account.to_string(), rows);
    }

    series
}

/// Reconciles a single account, failing when it has no current-period rows.
pub fn reconcile_account(
    records: &[MetricRecord],
    account: &str,
    pair: &PeriodPair,
    strategy: JoinStrategy,
) -> Result<Vec<ReconciledRow>> {
    let own: Vec<MetricRecord> = records
        .iter()
        .filter(|r| r.account == account)
        .cloned()
        .collect();

    reconcile(&own, pair, strategy)
        .remove(account)
        .ok_or_else(|| ComparisonError::NoCurrentData(account.to_string()))
}

fn join_rows(
    current: &[&MetricRecord],
    prior: &[&MetricRecord],
    strategy: JoinStrategy,
) -> Vec<ReconciledRow> {
    match strategy {
        JoinStrategy::CalendarDate => {
            let by_date: HashMap<NaiveDate, &MetricRecord> =
                prior.iter().map(|r| (r.date, *r)).collect();
            current
                .iter()
                .enumerate()
                .map(|(idx, row)| ReconciledRow::join(idx, row, by_date.get(&row.date).copied()))
                .collect()
        }
        JoinStrategy::DayOffset => current
            .iter()
            .enumerate()
            .map(|(idx, row)| ReconciledRow::join(idx, row, prior.get(idx).copied()))
            .collect(),
    }
}
