//! Loading of GA4 daily exports into a [`MetricSeriesStore`].
//!
//! The expected layout is the flat report produced by the collection job:
//! one row per property and day with `date`, `sessions`, `transactions`,
//! `purchaseRevenue`, `conversion_rate` and `property_display` columns,
//! separated by `;`. Metric columns that are absent are recorded on the store
//! rather than rejected, so that only the charts depending on them are lost.

use crate::error::{ComparisonError, Result};
use crate::schema::{conversion_rate, Metric, MetricRecord};
use crate::store::MetricSeriesStore;
use crate::utils::parse_report_date;
use csv::{ReaderBuilder, StringRecord};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub delimiter: u8,
    /// Column holding the dashboard account name.
    pub account_column: String,
    /// Column holding the GA4 property identifier. Falls back to the account
    /// name when the column is absent.
    pub property_column: String,
    pub date_column: String,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            delimiter: b';',
            account_column: "property_display".to_string(),
            property_column: "property_id".to_string(),
            date_column: "date".to_string(),
        }
    }
}

struct ColumnLayout {
    account: usize,
    property: Option<usize>,
    date: usize,
    sessions: Option<usize>,
    transactions: Option<usize>,
    revenue: Option<usize>,
    conversion_rate: Option<usize>,
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord, options: &IngestionOptions) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let required = |name: &str| {
            find(name).ok_or_else(|| ComparisonError::ParseError {
                line: 1,
                details: format!("Required column '{}' not found in header", name),
            })
        };

        Ok(Self {
            account: required(options.account_column.as_str())?,
            property: find(options.property_column.as_str()),
            date: required(options.date_column.as_str())?,
            sessions: find(Metric::Sessions.column_name()),
            transactions: find(Metric::Transactions.column_name()),
            revenue: find(Metric::Revenue.column_name()),
            conversion_rate: find(Metric::ConversionRate.column_name()),
        })
    }

    fn available_metrics(&self) -> BTreeSet<Metric> {
        let mut available = BTreeSet::new();
        if self.sessions.is_some() {
            available.insert(Metric::Sessions);
        }
        if self.transactions.is_some() {
            available.insert(Metric::Transactions);
        }
        if self.revenue.is_some() {
            available.insert(Metric::Revenue);
        }
        // Derivable from the other two when the export omits it.
        let derivable = self.sessions.is_some() && self.transactions.is_some();
        if self.conversion_rate.is_some() || derivable {
            available.insert(Metric::ConversionRate);
        }
        available
    }
}

pub fn read_metrics<R: Read>(reader: R, options: &IngestionOptions) -> Result<MetricSeriesStore> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let layout = ColumnLayout::from_headers(&headers, options)?;
    let available = layout.available_metrics();

    for metric in Metric::ALL {
        if !available.contains(&metric) {
            warn!(
                "Metric column '{}' not found; charts for this metric will be skipped",
                metric.column_name()
            );
        }
    }

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        records.push(parse_row(&row, &layout, line)?);
    }

    debug!(
        "Read {} metric records with columns {:?}",
        records.len(),
        available
    );

    MetricSeriesStore::with_metrics(records, available)
}

pub fn read_metrics_from_path(
    path: impl AsRef<Path>,
    options: &IngestionOptions,
) -> Result<MetricSeriesStore> {
    let file = std::fs::File::open(path)?;
    read_metrics(file, options)
}

fn parse_row(row: &StringRecord, layout: &ColumnLayout, line: u64) -> Result<MetricRecord> {
    let field = |idx: usize| row.get(idx).map(str::trim).unwrap_or("");

    let account = field(layout.account).to_string();
    if account.is_empty() {
        return Err(ComparisonError::ParseError {
            line,
            details: "Empty account name".to_string(),
        });
    }

    let property = layout
        .property
        .map(|idx| field(idx).to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| account.clone());

    let date = parse_report_date(field(layout.date)).map_err(|e| ComparisonError::ParseError {
        line,
        details: e.to_string(),
    })?;

    let sessions = match layout.sessions {
        Some(idx) => parse_count(field(idx), Metric::Sessions, line)?,
        None => 0,
    };
    let transactions = match layout.transactions {
        Some(idx) => parse_count(field(idx), Metric::Transactions, line)?,
        None => 0,
    };
    let revenue = match layout.revenue {
        Some(idx) => parse_amount(field(idx), Metric::Revenue, line)?,
        None => 0.0,
    };
    let rate = match layout.conversion_rate {
        Some(idx) if !field(idx).is_empty() => {
            parse_amount(field(idx), Metric::ConversionRate, line)?
        }
        _ => conversion_rate(sessions, transactions),
    };

    Ok(MetricRecord {
        account,
        property,
        date,
        sessions,
        transactions,
        revenue,
        conversion_rate: rate,
    })
}

fn parse_amount(raw: &str, metric: Metric, line: u64) -> Result<f64> {
    if raw.is_empty() {
        return Ok(0.0);
    }

    let value: f64 = raw.parse().map_err(|_| ComparisonError::ParseError {
        line,
        details: format!("Invalid {} value '{}'", metric.column_name(), raw),
    })?;

    if !value.is_finite() || value < 0.0 {
        return Err(ComparisonError::ParseError {
            line,
            details: format!(
                "{} must be a non-negative number, got '{}'",
                metric.column_name(),
                raw
            ),
        });
    }

    Ok(value)
}

/// Counts are written as floats by some exports (`12.0`); the fraction must be zero.
fn parse_count(raw: &str, metric: Metric, line: u64) -> Result<u64> {
    if let Ok(value) = raw.parse::<u64>() {
        return Ok(value);
    }

    let value = parse_amount(raw, metric, line)?;
    if value.fract() != 0.0 {
        return Err(ComparisonError::ParseError {
            line,
            details: format!("{} must be a whole number, got '{}'", metric.column_name(), raw),
        });
    }
    // `u64::MAX as f64` rounds up to 2^64, which is itself out of range.
    if value >= u64::MAX as f64 {
        return Err(ComparisonError::ParseError {
            line,
            details: format!("{} value '{}' is out of range", metric.column_name(), raw),
        });
    }

    Ok(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const EXPORT: &str = "date;sessions;transactions;purchaseRevenue;conversion_rate;account_display;property_display
2024-01-01;100;2;150.5;2.0;Agency;Shop A
2024-01-02;80.0;0;0;0;Agency;Shop A
20240101;40;1;30;;Agency;Shop B
";

    #[test]
    fn test_read_full_export() {
        let store = read_metrics(EXPORT.as_bytes(), &IngestionOptions::default()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.available_metrics().len(), 4);

        let shop_b: Vec<_> = store.records_for("Shop B").collect();
        assert_eq!(shop_b.len(), 1);
        assert_eq!(shop_b[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(shop_b[0].property, "Shop B");
        assert!((shop_b[0].conversion_rate - 2.5).abs() < 1e-9);

        let shop_a: Vec<_> = store.records_for("Shop A").collect();
        assert_eq!(shop_a[1].sessions, 80);
    }

    #[test]
    fn test_missing_metric_column_is_recorded() {
        let export = "date;sessions;transactions;property_display
2024-01-01;100;2;Shop A
";
        let store = read_metrics(export.as_bytes(), &IngestionOptions::default()).unwrap();
        assert!(!store.has_metric(Metric::Revenue));
        assert!(store.has_metric(Metric::ConversionRate));
        assert_eq!(store.records()[0].revenue, 0.0);
        assert!(matches!(
            store.require_metric(Metric::Revenue),
            Err(ComparisonError::MissingMetricColumn(Metric::Revenue))
        ));
    }

    #[test]
    fn test_missing_account_column_fails() {
        let export = "date;sessions\n2024-01-01;1\n";
        let result = read_metrics(export.as_bytes(), &IngestionOptions::default());
        assert!(matches!(result, Err(ComparisonError::ParseError { .. })));
    }

    #[test]
    fn test_invalid_values_report_line() {
        let export = "date;sessions;property_display
2024-01-01;10;Shop A
2024-01-02;1.5;Shop A
";
        match read_metrics(export.as_bytes(), &IngestionOptions::default()) {
            Err(ComparisonError::ParseError { line, details }) => {
                assert_eq!(line, 3);
                assert!(details.contains("sessions"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_count_out_of_range_is_rejected() {
        let export = "date;sessions;transactions;property_display
2024-01-30;1e19;0;Shop A
2024-01-31;1e30;0;Shop A
";
        match read_metrics(export.as_bytes(), &IngestionOptions::default()) {
            Err(ComparisonError::ParseError { line, details }) => {
                assert_eq!(line, 3);
                assert!(details.contains("out of range"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_revenue_is_rejected() {
        let export = "date;purchaseRevenue;property_display\n2024-01-01;-5;Shop A\n";
        let result = read_metrics(export.as_bytes(), &IngestionOptions::default());
        assert!(matches!(result, Err(ComparisonError::ParseError { .. })));
    }
}
