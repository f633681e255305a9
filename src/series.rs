use crate::error::Result;
use crate::reconciler::ReconciledRow;
use crate::schema::Metric;
use crate::store::MetricSeriesStore;
use crate::utils::day_label;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Day label of the current-period date, e.g. `25/01`.
    pub label: String,
    pub date: NaiveDate,
    pub current: f64,
    pub prior: Option<f64>,
}

/// Current-versus-prior values of one metric for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub metric: Metric,
    pub title: String,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    pub fn current_total(&self) -> f64 {
        self.points.iter().map(|p| p.current).sum()
    }

    pub fn prior_total(&self) -> Option<f64> {
        let values: Vec<f64> = self.points.iter().filter_map(|p| p.prior).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum())
        }
    }
}

pub fn chart_series(
    rows: &[ReconciledRow],
    metric: Metric,
    store: &MetricSeriesStore,
) -> Result<ChartSeries> {
    store.require_metric(metric)?;

    let points = rows
        .iter()
        .map(|row| ChartPoint {
            label: day_label(row.date),
            date: row.date,
            current: row.value(metric),
            prior: row.prior_value(metric),
        })
        .collect();

    Ok(ChartSeries {
        metric,
        title: format!("{} - current vs prior", metric.title()),
        points,
    })
}
