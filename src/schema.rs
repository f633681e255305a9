use crate::error::{ComparisonError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_MONTHLY_GOAL: f64 = 100_000.0;
pub const DEFAULT_ATTAINMENT_CAP: f64 = 9999.0;
pub const MAX_ACCOUNT_LINKS: usize = 6;

/// Suffix appended to a metric column name when it carries prior-period values.
pub const PRIOR_SUFFIX: &str = "_prior";

/// A metric column of the GA4 daily report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Sessions,
    Transactions,
    Revenue,
    ConversionRate,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Sessions,
        Metric::Transactions,
        Metric::Revenue,
        Metric::ConversionRate,
    ];

    /// Column header used by the GA4 export.
    pub fn column_name(&self) -> &'static str {
        match self {
            Metric::Sessions => "sessions",
            Metric::Transactions => "transactions",
            Metric::Revenue => "purchaseRevenue",
            Metric::ConversionRate => "conversion_rate",
        }
    }

    pub fn prior_column_name(&self) -> String {
        format!("{}{}", self.column_name(), PRIOR_SUFFIX)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Metric::Sessions => "Sessions",
            Metric::Transactions => "Transactions",
            Metric::Revenue => "Revenue",
            Metric::ConversionRate => "Conversion rate (%)",
        }
    }

    pub fn from_column_name(name: &str) -> Option<Metric> {
        Metric::ALL
            .into_iter()
            .find(|m| m.column_name() == name.trim())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// One day of GA4 metrics for a single account/property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub account: String,
    pub property: String,
    pub date: NaiveDate,
    pub sessions: u64,
    pub transactions: u64,
    pub revenue: f64,
    pub conversion_rate: f64,
}

impl MetricRecord {
    pub fn new(
        account: impl Into<String>,
        property: impl Into<String>,
        date: NaiveDate,
        sessions: u64,
        transactions: u64,
        revenue: f64,
    ) -> Self {
        Self {
            account: account.into(),
            property: property.into(),
            date,
            sessions,
            transactions,
            revenue,
            conversion_rate: conversion_rate(sessions, transactions),
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

    pub fn is_zeroed(&self) -> bool {
        self.sessions == 0 && self.transactions == 0 && self.revenue == 0.0
    }
}

/// Transactions per session as a percentage; zero when there were no sessions.
pub fn conversion_rate(sessions: u64, transactions: u64) -> f64 {
    if sessions == 0 {
        0.0
    } else {
        transactions as f64 / sessions as f64 * 100.0
    }
}

/// Reporting period selector offered by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PeriodType {
    /// First day of the reference month up to the reference date.
    #[default]
    CurrentMonth,
    /// The trailing N days ending on the reference date.
    LastDays(u32),
}

impl PeriodType {
    pub const SUPPORTED_TRAILING_DAYS: [u32; 3] = [7, 15, 30];

    pub fn last_days(days: u32) -> Result<Self> {
        if Self::SUPPORTED_TRAILING_DAYS.contains(&days) {
            Ok(PeriodType::LastDays(days))
        } else {
            Err(ComparisonError::InvalidPeriodType(format!(
                "last {} days",
                days
            )))
        }
    }

    pub fn all() -> Vec<PeriodType> {
        let mut all = vec![PeriodType::CurrentMonth];
        all.extend(
            Self::SUPPORTED_TRAILING_DAYS
                .iter()
                .rev()
                .map(|d| PeriodType::LastDays(*d)),
        );
        all
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodType::CurrentMonth => write!(f, "current month"),
            PeriodType::LastDays(n) => write!(f, "last {} days", n),
        }
    }
}

impl FromStr for PeriodType {
    type Err = ComparisonError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        if normalized == "current month" {
            return Ok(PeriodType::CurrentMonth);
        }

        let days = normalized
            .strip_prefix("last ")
            .and_then(|rest| rest.strip_suffix(" days"))
            .and_then(|n| n.trim().parse::<u32>().ok())
            .ok_or_else(|| ComparisonError::InvalidPeriodType(s.to_string()))?;

        if Self::SUPPORTED_TRAILING_DAYS.contains(&days) {
            Ok(PeriodType::LastDays(days))
        } else {
            Err(ComparisonError::InvalidPeriodType(s.to_string()))
        }
    }
}

impl Serialize for PeriodType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PeriodType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Ordering applied to account summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingCriterion {
    /// Goal attainment, highest first.
    #[default]
    Attainment,
    /// Total revenue, highest first.
    Revenue,
    /// Total sessions, highest first.
    Sessions,
    /// Account name, A to Z (case-sensitive).
    AccountName,
}

impl FromStr for RankingCriterion {
    type Err = ComparisonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "attainment" | "attainment (%)" => Ok(RankingCriterion::Attainment),
            "revenue" | "total revenue" => Ok(RankingCriterion::Revenue),
            "sessions" => Ok(RankingCriterion::Sessions),
            "account name" | "account name (a-z)" | "name" => Ok(RankingCriterion::AccountName),
            _ => Err(ComparisonError::ValidationError {
                account: String::new(),
                details: format!("Unknown ranking criterion '{}'", s),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum AccountStatus {
    #[default]
    #[schemars(description = "The account is shown on the dashboard")]
    Active,

    #[schemars(description = "The account is hidden from the dashboard but kept in the configuration")]
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct AccountLink {
    #[serde(default)]
    #[schemars(description = "Label shown for the link. Falls back to 'Link N' when empty.")]
    pub title: String,

    #[serde(default)]
    #[schemars(description = "Target URL. Links with an empty URL are not displayed.")]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AccountSettings {
    #[schemars(description = "Account display name as it appears in the GA4 export (property_display)")]
    pub name: String,

    #[serde(default)]
    #[schemars(description = "Whether the account appears on the dashboard")]
    pub status: AccountStatus,

    #[serde(default)]
    #[schemars(
        description = "Monthly revenue goal for this account. Zero means the dashboard default goal applies."
    )]
    pub monthly_goal: f64,

    #[serde(default)]
    #[schemars(description = "Up to six shortcut links shown on the account detail page")]
    pub links: Vec<AccountLink>,
}

impl AccountSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: AccountStatus::Active,
            monthly_goal: 0.0,
            links: Vec::new(),
        }
    }
}

fn default_monthly_goal() -> f64 {
    DEFAULT_MONTHLY_GOAL
}

fn default_attainment_cap() -> f64 {
    DEFAULT_ATTAINMENT_CAP
}

/// Persisted dashboard configuration: per-account flags and goals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DashboardConfig {
    #[serde(default = "default_monthly_goal")]
    #[schemars(description = "Goal applied to accounts without their own monthly goal")]
    pub default_monthly_goal: f64,

    #[serde(default = "default_attainment_cap")]
    #[schemars(description = "Upper bound for the displayed attainment percentage")]
    pub attainment_display_cap: f64,

    #[serde(default)]
    pub accounts: Vec<AccountSettings>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_monthly_goal: DEFAULT_MONTHLY_GOAL,
            attainment_display_cap: DEFAULT_ATTAINMENT_CAP,
            accounts: Vec::new(),
        }
    }
}

impl DashboardConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: DashboardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.default_monthly_goal.is_finite() || self.default_monthly_goal <= 0.0 {
            return Err(ComparisonError::InvalidGoal(self.default_monthly_goal));
        }

        if !self.attainment_display_cap.is_finite() || self.attainment_display_cap <= 0.0 {
            return Err(ComparisonError::ValidationError {
                account: String::new(),
                details: format!(
                    "Attainment display cap {} must be greater than zero",
                    self.attainment_display_cap
                ),
            });
        }

        let mut seen = HashSet::new();
        for account in &self.accounts {
            if !seen.insert(account.name.as_str()) {
                return Err(ComparisonError::ValidationError {
                    account: account.name.clone(),
                    details: "Account is configured more than once".to_string(),
                });
            }

            if !account.monthly_goal.is_finite() || account.monthly_goal < 0.0 {
                return Err(ComparisonError::ValidationError {
                    account: account.name.clone(),
                    details: format!(
                        "Monthly goal {} must be zero or a positive number",
                        account.monthly_goal
                    ),
                });
            }

            if account.links.len() > MAX_ACCOUNT_LINKS {
                return Err(ComparisonError::ValidationError {
                    account: account.name.clone(),
                    details: format!(
                        "{} links configured, at most {} are supported",
                        account.links.len(),
                        MAX_ACCOUNT_LINKS
                    ),
                });
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DashboardConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_type_parsing() {
        assert_eq!(
            "current month".parse::<PeriodType>().unwrap(),
            PeriodType::CurrentMonth
        );
        assert_eq!(
            " Last 15 Days ".parse::<PeriodType>().unwrap(),
            PeriodType::LastDays(15)
        );
        assert!(matches!(
            "last 10 days".parse::<PeriodType>(),
            Err(ComparisonError::InvalidPeriodType(_))
        ));
        assert!(matches!(
            "fortnight".parse::<PeriodType>(),
            Err(ComparisonError::InvalidPeriodType(_))
        ));
        assert!(PeriodType::last_days(14).is_err());
    }

    #[test]
    fn test_period_type_display_round_trips() {
        for period in PeriodType::all() {
            let parsed: PeriodType = period.to_string().parse().unwrap();
            assert_eq!(parsed, period);
        }
        assert_eq!(PeriodType::default(), PeriodType::CurrentMonth);
    }

    #[test]
    fn test_conversion_rate_derivation() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let record = MetricRecord::new("Shop", "shop.example", date, 200, 5, 350.0);
        assert!((record.conversion_rate - 2.5).abs() < 1e-9);

        let empty = MetricRecord::new("Shop", "shop.example", date, 0, 0, 0.0);
        assert_eq!(empty.conversion_rate, 0.0);
        assert!(empty.is_zeroed());
    }

    #[test]
    fn test_metric_column_names() {
        assert_eq!(Metric::Revenue.column_name(), "purchaseRevenue");
        assert_eq!(Metric::Revenue.prior_column_name(), "purchaseRevenue_prior");
        assert_eq!(
            Metric::from_column_name("conversion_rate"),
            Some(Metric::ConversionRate)
        );
        assert_eq!(Metric::from_column_name("bounceRate"), None);
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = DashboardConfig::from_json_str(
            r#"{"accounts": [{"name": "Shop", "status": "Inactive"}]}"#,
        )
        .unwrap();
        assert_eq!(config.default_monthly_goal, DEFAULT_MONTHLY_GOAL);
        assert_eq!(config.attainment_display_cap, DEFAULT_ATTAINMENT_CAP);
        assert_eq!(config.accounts[0].status, AccountStatus::Inactive);
        assert_eq!(config.accounts[0].monthly_goal, 0.0);

        let duplicate = DashboardConfig::from_json_str(
            r#"{"accounts": [{"name": "Shop"}, {"name": "Shop"}]}"#,
        );
        assert!(matches!(
            duplicate,
            Err(ComparisonError::ValidationError { .. })
        ));

        let bad_goal = DashboardConfig::from_json_str(r#"{"default_monthly_goal": 0}"#);
        assert!(matches!(bad_goal, Err(ComparisonError::InvalidGoal(_))));
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = DashboardConfig::schema_as_json().unwrap();
        assert!(schema_json.contains("default_monthly_goal"));
        assert!(schema_json.contains("accounts"));
    }
}
