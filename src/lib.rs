//! # GA4 Period Comparison
//!
//! A library for comparing Google Analytics 4 account metrics between the
//! current reporting period and the period that precedes it.
//!
//! ## Core Concepts
//!
//! - **Metric store**: daily sessions, transactions, revenue and conversion rate per account
//! - **Period pair**: the current window and the prior window it is compared to
//! - **Reconciliation**: current-period days joined to prior-period days, by offset or by date
//! - **Summary**: per-account totals, goal attainment and day-over-day revenue variance
//!
//! ## Example
//!
//! ```rust,ignore
//! use ga4_period_comparison::*;
//! use chrono::NaiveDate;
//!
//! let store = read_metrics_from_path("ga4_100.csv", &IngestionOptions::default())?;
//! let config = DashboardConfig::from_path("accounts.json")?;
//!
//! let request = DashboardRequest::new(
//!     "last 7 days".parse()?,
//!     NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
//! )
//! .ranked_by(RankingCriterion::Revenue);
//!
//! let view = DashboardProcessor::dashboard(&store, &config, &request)?;
//! for summary in &view.summaries {
//!     println!("{}: {:.1}%", summary.account, summary.attainment_pct);
//! }
//! ```

pub mod accounts;
pub mod aggregator;
pub mod error;
pub mod ingestion;
pub mod period;
pub mod reconciler;
pub mod schema;
pub mod series;
pub mod store;
pub mod utils;

pub use accounts::{AccountRegistry, DisplayLink};
pub use aggregator::{
    mean_daily_change_pct, rank, summarize_account, summarize_and_rank, summarize_and_rank_with,
    zeroed_accounts, AccountSummary, GoalPolicy,
};
pub use error::{ComparisonError, Result};
pub use ingestion::{read_metrics, read_metrics_from_path, IngestionOptions};
pub use period::{compute_period, compute_period_from_str, PeriodPair, PeriodWindow};
pub use reconciler::{reconcile, reconcile_account, JoinStrategy, ReconciledRow, ReconciledSeries};
pub use schema::*;
pub use series::{chart_series, ChartPoint, ChartSeries};
pub use store::MetricSeriesStore;

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// One dashboard interaction: everything needed to compute a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRequest {
    pub period_type: PeriodType,
    pub reference_date: NaiveDate,
    #[serde(default)]
    pub ranking: RankingCriterion,
    /// Accounts to show. Empty means every active account.
    #[serde(default)]
    pub selected_accounts: Vec<String>,
    #[serde(default)]
    pub join_strategy: JoinStrategy,
}

impl DashboardRequest {
    pub fn new(period_type: PeriodType, reference_date: NaiveDate) -> Self {
        Self {
            period_type,
            reference_date,
            ranking: RankingCriterion::default(),
            selected_accounts: Vec::new(),
            join_strategy: JoinStrategy::default(),
        }
    }

    /// Uses the local calendar date as the reference date.
    pub fn for_today(period_type: PeriodType) -> Self {
        Self::new(period_type, chrono::Local::now().date_naive())
    }

    pub fn ranked_by(mut self, ranking: RankingCriterion) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn with_accounts<I, S>(mut self, accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_accounts = accounts.into_iter().map(Into::into).collect();
        self
    }

    pub fn joined_by(mut self, join_strategy: JoinStrategy) -> Self {
        self.join_strategy = join_strategy;
        self
    }

    fn is_selected(&self, account: &str) -> bool {
        self.selected_accounts.is_empty() || self.selected_accounts.iter().any(|a| a == account)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub period: PeriodPair,
    pub summaries: Vec<AccountSummary>,
    /// Active accounts whose every record is zero.
    pub zeroed_accounts: Vec<String>,
    /// Date of the most recent record in the store.
    pub extracted_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDetail {
    pub account: String,
    pub period: PeriodPair,
    pub rows: Vec<ReconciledRow>,
    pub charts: Vec<ChartSeries>,
    /// Charts that could not be built, with the reason.
    pub warnings: Vec<String>,
    pub links: Vec<DisplayLink>,
}

pub struct DashboardProcessor;

impl DashboardProcessor {
    pub fn dashboard(
        store: &MetricSeriesStore,
        config: &DashboardConfig,
        request: &DashboardRequest,
    ) -> Result<DashboardView> {
        let registry = AccountRegistry::new(config.clone())?;
        store.require_metric(Metric::Sessions)?;
        store.require_metric(Metric::Revenue)?;

        let period = compute_period(request.period_type, request.reference_date)?;
        info!(
            "Building dashboard for '{}': current {} / prior {}",
            request.period_type, period.current, period.prior
        );

        let active = store.filter_accounts(|account| registry.is_active(account));
        let zeroed = zeroed_accounts(active.records());
        let visible = active.filter_accounts(|account| request.is_selected(account));
        debug!(
            "{} of {} records belong to active, selected accounts",
            visible.len(),
            store.len()
        );

        let reconciled = reconcile(visible.records(), &period, request.join_strategy);
        let summaries =
            summarize_and_rank_with(&reconciled, request.ranking, &registry.goal_policy()?);
        info!(
            "Dashboard ready: {} accounts ranked by {:?}, {} zeroed",
            summaries.len(),
            request.ranking,
            zeroed.len()
        );

        Ok(DashboardView {
            period,
            summaries,
            zeroed_accounts: zeroed,
            extracted_on: store.latest_date(),
        })
    }

    pub fn account_detail(
        store: &MetricSeriesStore,
        config: &DashboardConfig,
        request: &DashboardRequest,
        account: &str,
    ) -> Result<AccountDetail> {
        let registry = AccountRegistry::new(config.clone())?;
        let period = compute_period(request.period_type, request.reference_date)?;
        info!("Building detail view for '{}' ({})", account, request.period_type);

        let rows = reconcile_account(store.records(), account, &period, request.join_strategy)?;

        let mut charts = Vec::new();
        let mut warnings = Vec::new();
        for metric in Metric::ALL {
            match chart_series(&rows, metric, store) {
                Ok(chart) => charts.push(chart),
                Err(e @ ComparisonError::MissingMetricColumn(_)) => {
                    warn!("Skipping {} chart for '{}': {}", metric, account, e);
                    warnings.push(e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        Ok(AccountDetail {
            account: account.to_string(),
            period,
            rows,
            charts,
            warnings,
            links: registry.display_links(account),
        })
    }
}
