use crate::error::{ComparisonError, Result};
use crate::reconciler::{ReconciledRow, ReconciledSeries};
use crate::schema::{conversion_rate, MetricRecord, RankingCriterion, DEFAULT_ATTAINMENT_CAP};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Per-account totals for the current period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account: String,
    pub days: usize,
    pub sessions_total: u64,
    pub transactions_total: u64,
    pub revenue_total: f64,
    /// Sum of the joined prior-period revenue, `None` when no prior row matched.
    pub revenue_prior_total: Option<f64>,
    pub conversion_rate: f64,
    pub monthly_goal: f64,
    /// Revenue as a percentage of `monthly_goal`, capped for display.
    pub attainment_pct: f64,
    /// Mean day-over-day revenue change within the current period.
    pub revenue_variance_pct: f64,
}

impl AccountSummary {
    pub fn goal_reached(&self) -> bool {
        self.attainment_pct >= 100.0
    }

    /// Change of total revenue against the joined prior rows.
    pub fn revenue_change_pct(&self) -> Option<f64> {
        match self.revenue_prior_total {
            Some(prior) if prior > 0.0 => Some((self.revenue_total - prior) / prior * 100.0),
            _ => None,
        }
    }
}

/// Monthly goals used to compute attainment.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalPolicy {
    default_goal: f64,
    account_goals: HashMap<String, f64>,
    display_cap: f64,
}

impl GoalPolicy {
    pub fn new(default_goal: f64) -> Result<Self> {
        validate_goal(default_goal)?;
        Ok(Self {
            default_goal,
            account_goals: HashMap::new(),
            display_cap: DEFAULT_ATTAINMENT_CAP,
        })
    }

    pub fn with_account_goal(mut self, account: impl Into<String>, goal: f64) -> Result<Self> {
        validate_goal(goal)?;
        self.account_goals.insert(account.into(), goal);
        Ok(self)
    }

    pub fn with_display_cap(mut self, cap: f64) -> Result<Self> {
        validate_display_cap(cap)?;
        self.display_cap = cap;
        Ok(self)
    }

    pub fn goal_for(&self, account: &str) -> f64 {
        self.account_goals
            .get(account)
            .copied()
            .unwrap_or(self.default_goal)
    }

    pub fn display_cap(&self) -> f64 {
        self.display_cap
    }
}

fn validate_goal(goal: f64) -> Result<()> {
    if goal.is_finite() && goal > 0.0 {
        Ok(())
    } else {
        Err(ComparisonError::InvalidGoal(goal))
    }
}

fn validate_display_cap(cap: f64) -> Result<()> {
    if cap.is_finite() && cap > 0.0 {
        Ok(())
    } else {
        Err(ComparisonError::ValidationError {
            account: String::new(),
            details: format!("Attainment display cap {} must be greater than zero", cap),
        })
    }
}

pub fn summarize_and_rank(
    reconciled: &ReconciledSeries,
    criterion: RankingCriterion,
    monthly_goal: f64,
) -> Result<Vec<AccountSummary>> {
    let policy = GoalPolicy::new(monthly_goal)?;
    Ok(summarize_and_rank_with(reconciled, criterion, &policy))
}

/// Summarizes every account and orders the result by `criterion`.
///
/// Accounts without sessions in the period are dropped. The sort is stable, so
/// accounts that tie keep their name order from `reconciled`.
pub fn summarize_and_rank_with(
    reconciled: &ReconciledSeries,
    criterion: RankingCriterion,
    goals: &GoalPolicy,
) -> Vec<AccountSummary> {
    let mut summaries: Vec<AccountSummary> = reconciled
        .iter()
        .map(|(account, rows)| {
            summarize_account(account, rows, goals.goal_for(account), goals.display_cap())
        })
        .filter(|summary| {
            if summary.sessions_total == 0 {
                debug!("Account '{}' has no sessions in the period, excluded", summary.account);
                false
            } else {
                true
            }
        })
        .collect();

    rank(&mut summaries, criterion);
    summaries
}

pub fn summarize_account(
    account: &str,
    rows: &[ReconciledRow],
    monthly_goal: f64,
    display_cap: f64,
) -> AccountSummary {
    // Saturates: a single export row may already hold a count close to u64::MAX.
    let sessions_total = rows.iter().fold(0u64, |acc, r| acc.saturating_add(r.sessions));
    let transactions_total = rows
        .iter()
        .fold(0u64, |acc, r| acc.saturating_add(r.transactions));
    let revenue_total: f64 = rows.iter().map(|r| r.revenue).sum();

    let prior: Vec<f64> = rows.iter().filter_map(|r| r.revenue_prior).collect();
    let revenue_prior_total = if prior.is_empty() {
        None
    } else {
        Some(prior.iter().sum())
    };

    let revenue: Vec<f64> = rows.iter().map(|r| r.revenue).collect();

    AccountSummary {
        account: account.to_string(),
        days: rows.len(),
        sessions_total,
        transactions_total,
        revenue_total,
        revenue_prior_total,
        conversion_rate: conversion_rate(sessions_total, transactions_total),
        monthly_goal,
        attainment_pct: (revenue_total / monthly_goal * 100.0).min(display_cap),
        revenue_variance_pct: mean_daily_change_pct(&revenue),
    }
}

/// Mean of the percentage changes between consecutive values.
///
/// Steps starting from a zero value have no defined percentage and are left
/// out of the mean. Returns 0 when fewer than two values or no valid step exist.
pub fn mean_daily_change_pct(values: &[f64]) -> f64 {
    let steps: Vec<f64> = values
        .windows(2)
        .filter(|pair| pair[0] != 0.0)
        .map(|pair| (pair[1] - pair[0]) / pair[0] * 100.0)
        .collect();

    if steps.is_empty() {
        0.0
    } else {
        steps.iter().sum::<f64>() / steps.len() as f64
    }
}

pub fn rank(summaries: &mut [AccountSummary], criterion: RankingCriterion) {
    match criterion {
        RankingCriterion::Attainment => {
            summaries.sort_by(|a, b| b.attainment_pct.total_cmp(&a.attainment_pct))
        }
        RankingCriterion::Revenue => {
            summaries.sort_by(|a, b| b.revenue_total.total_cmp(&a.revenue_total))
        }
        RankingCriterion::Sessions => {
            summaries.sort_by(|a, b| b.sessions_total.cmp(&a.sessions_total))
        }
        RankingCriterion::AccountName => summaries.sort_by(|a, b| a.account.cmp(&b.account)),
    }
}

/// Accounts whose every record has zero sessions, transactions and revenue.
pub fn zeroed_accounts(records: &[MetricRecord]) -> Vec<String> {
    let mut all_zero: BTreeMap<&str, bool> = BTreeMap::new();
    for record in records {
        let entry = all_zero.entry(record.account.as_str()).or_insert(true);
        *entry &= record.is_zeroed();
    }

    all_zero
        .into_iter()
        .filter(|(_, zeroed)| *zeroed)
        .map(|(account, _)| account.to_string())
        .collect()
}
