use crate::aggregator::GoalPolicy;
use crate::error::{ComparisonError, Result};
use crate::schema::{AccountLink, AccountSettings, AccountStatus, DashboardConfig};
use log::info;
use serde::{Deserialize, Serialize};

/// A link ready for display: empty URLs removed, missing titles filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayLink {
    pub title: String,
    pub url: String,
}

/// In-memory view of the account configuration store.
#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    config: DashboardConfig,
}

impl AccountRegistry {
    pub fn new(config: DashboardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn get(&self, name: &str) -> Option<&AccountSettings> {
        self.config.accounts.iter().find(|a| a.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut AccountSettings> {
        self.config
            .accounts
            .iter_mut()
            .find(|a| a.name == name)
            .ok_or_else(|| ComparisonError::ValidationError {
                account: name.to_string(),
                details: "Account not found in configuration".to_string(),
            })
    }

    /// When no account is configured every account counts as active.
    pub fn is_active(&self, name: &str) -> bool {
        if self.config.accounts.is_empty() {
            return true;
        }
        self.get(name)
            .map(|a| a.status == AccountStatus::Active)
            .unwrap_or(false)
    }

    pub fn active_accounts(&self) -> Vec<&str> {
        self.config
            .accounts
            .iter()
            .filter(|a| a.status == AccountStatus::Active)
            .map(|a| a.name.as_str())
            .collect()
    }

    /// The account's own goal, or the default goal when it has none.
    pub fn goal_for(&self, name: &str) -> f64 {
        self.get(name)
            .map(|a| a.monthly_goal)
            .filter(|goal| *goal > 0.0)
            .unwrap_or(self.config.default_monthly_goal)
    }

    pub fn goal_policy(&self) -> Result<GoalPolicy> {
        let mut policy = GoalPolicy::new(self.config.default_monthly_goal)?
            .with_display_cap(self.config.attainment_display_cap)?;
        for account in &self.config.accounts {
            if account.monthly_goal > 0.0 {
                policy = policy.with_account_goal(account.name.clone(), account.monthly_goal)?;
            }
        }
        Ok(policy)
    }

    pub fn set_status(&mut self, name: &str, status: AccountStatus) -> Result<()> {
        self.get_mut(name)?.status = status;
        info!("Account '{}' set to {:?}", name, status);
        Ok(())
    }

    pub fn set_goal(&mut self, name: &str, goal: f64) -> Result<()> {
        if !goal.is_finite() || goal < 0.0 {
            return Err(ComparisonError::InvalidGoal(goal));
        }
        self.get_mut(name)?.monthly_goal = goal;
        info!("Monthly goal of '{}' updated to {:.2}", name, goal);
        Ok(())
    }

    pub fn set_links(&mut self, name: &str, links: Vec<AccountLink>) -> Result<()> {
        let account = self.get_mut(name)?;
        let previous = std::mem::replace(&mut account.links, links);
        if let Err(e) = self.config.validate() {
            self.get_mut(name)?.links = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Adds `name` as an active account without a goal if it is not configured
    /// yet. Returns true when the account was added.
    pub fn ensure_account(&mut self, name: &str) -> bool {
        if self.get(name).is_some() {
            return false;
        }
        self.config.accounts.push(AccountSettings::new(name));
        info!("Account '{}' added to configuration", name);
        true
    }

    /// Registers every name in `names` that is missing from the configuration.
    pub fn sync_accounts<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> usize {
        names
            .into_iter()
            .filter(|name| self.ensure_account(name))
            .count()
    }

    /// Configured account names containing `query`, ignoring case, sorted.
    pub fn search(&self, query: &str) -> Vec<&str> {
        let needle = query.trim().to_lowercase();
        let mut names: Vec<&str> = self
            .config
            .accounts
            .iter()
            .map(|a| a.name.as_str())
            .filter(|name| needle.is_empty() || name.to_lowercase().contains(&needle))
            .collect();
        names.sort_unstable();
        names
    }

    pub fn display_links(&self, name: &str) -> Vec<DisplayLink> {
        self.get(name)
            .map(|account| {
                account
                    .links
                    .iter()
                    .enumerate()
                    .filter(|(_, link)| !link.url.trim().is_empty())
                    .map(|(idx, link)| DisplayLink {
                        title: if link.title.trim().is_empty() {
                            format!("Link {}", idx + 1)
                        } else {
                            link.title.trim().to_string()
                        },
                        url: link.url.trim().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
