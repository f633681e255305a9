use crate::error::{ComparisonError, Result};
use crate::schema::{Metric, MetricRecord};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};

/// Read-only table of daily metric records, ordered by account then date.
#[derive(Debug, Clone, Default)]
pub struct MetricSeriesStore {
    records: Vec<MetricRecord>,
    available_metrics: BTreeSet<Metric>,
}

impl MetricSeriesStore {
    /// Builds a store in which every metric column is considered present.
    pub fn new(records: Vec<MetricRecord>) -> Result<Self> {
        Self::with_metrics(records, Metric::ALL.into_iter().collect())
    }

    pub fn with_metrics(
        mut records: Vec<MetricRecord>,
        available_metrics: BTreeSet<Metric>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for record in &records {
            if !seen.insert((record.account.as_str(), record.date)) {
                return Err(ComparisonError::DuplicateRecord {
                    account: record.account.clone(),
                    date: record.date,
                });
            }
        }

        records.sort_by(|a, b| a.account.cmp(&b.account).then(a.date.cmp(&b.date)));

        Ok(Self {
            records,
            available_metrics,
        })
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_metric(&self, metric: Metric) -> bool {
        self.available_metrics.contains(&metric)
    }

    pub fn require_metric(&self, metric: Metric) -> Result<()> {
        if self.has_metric(metric) {
            Ok(())
        } else {
            Err(ComparisonError::MissingMetricColumn(metric))
        }
    }

    pub fn available_metrics(&self) -> &BTreeSet<Metric> {
        &self.available_metrics
    }

    pub fn accounts(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.account.as_str()).collect()
    }

    /// Most recent date in the table, shown as the data extraction date.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date).max()
    }

    pub fn records_for<'a>(
        &'a self,
        account: &'a str,
    ) -> impl Iterator<Item = &'a MetricRecord> + 'a {
        self.records.iter().filter(move |r| r.account == account)
    }

    /// Returns a new store keeping only the records whose account passes `keep`.
    pub fn filter_accounts<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&str) -> bool,
    {
        Self {
            records: self
                .records
                .iter()
                .filter(|r| keep(&r.account))
                .cloned()
                .collect(),
            available_metrics: self.available_metrics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_records_are_sorted_by_account_and_date() {
        let store = MetricSeriesStore::new(vec![
            MetricRecord::new("B", "b", date(2), 10, 1, 5.0),
            MetricRecord::new("A", "a", date(3), 10, 1, 5.0),
            MetricRecord::new("A", "a", date(1), 10, 1, 5.0),
        ])
        .unwrap();

        let keys: Vec<(&str, NaiveDate)> = store
            .records()
            .iter()
            .map(|r| (r.account.as_str(), r.date))
            .collect();
        assert_eq!(keys, vec![("A", date(1)), ("A", date(3)), ("B", date(2))]);
        assert_eq!(store.latest_date(), Some(date(3)));
        assert_eq!(store.accounts().len(), 2);
    }

    #[test]
    fn test_duplicate_account_date_is_rejected() {
        let result = MetricSeriesStore::new(vec![
            MetricRecord::new("A", "a", date(1), 10, 1, 5.0),
            MetricRecord::new("A", "a-other", date(1), 3, 0, 0.0),
        ]);
        assert!(matches!(
            result,
            Err(ComparisonError::DuplicateRecord { .. })
        ));
    }

    #[test]
    fn test_missing_metric_is_reported() {
        let available = [Metric::Sessions, Metric::Revenue].into_iter().collect();
        let store = MetricSeriesStore::with_metrics(Vec::new(), available).unwrap();
        assert!(store.require_metric(Metric::Revenue).is_ok());
        assert!(matches!(
            store.require_metric(Metric::Transactions),
            Err(ComparisonError::MissingMetricColumn(Metric::Transactions))
        ));
    }

    #[test]
    fn test_filter_accounts() {
        let store = MetricSeriesStore::new(vec![
            MetricRecord::new("A", "a", date(1), 10, 1, 5.0),
            MetricRecord::new("B", "b", date(1), 10, 1, 5.0),
        ])
        .unwrap();
        let only_b = store.filter_accounts(|account| account == "B");
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b.records()[0].account, "B");
    }
}
