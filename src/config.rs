use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{BillingError, Result};

/// engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// upper bound for any single record-store call, in milliseconds
    pub store_timeout_ms: u64,
    /// day of the rent month on which the rent falls due (1..=28)
    pub rent_due_day: u32,
    /// record the purchase transaction when a one-time purchase customer is onboarded
    pub record_purchase_on_onboarding: bool,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl BillingConfig {
    /// rent due on the 1st, five second store budget
    pub fn standard() -> Self {
        Self {
            store_timeout_ms: 5_000,
            rent_due_day: 1,
            record_purchase_on_onboarding: true,
        }
    }

    /// rent due on a fixed later day of the month (e.g. the 5th)
    pub fn with_rent_due_day(mut self, day: u32) -> Self {
        self.rent_due_day = day;
        self
    }

    /// override the store timeout
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// parse from json; missing keys fall back to [`BillingConfig::standard`]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BillingError::invalid_plan(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store_timeout_ms == 0 {
            return Err(BillingError::invalid_plan("store_timeout_ms must be positive"));
        }
        if !(1..=28).contains(&self.rent_due_day) {
            return Err(BillingError::invalid_plan(format!(
                "rent_due_day must be within 1..=28, got {}",
                self.rent_due_day
            )));
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
