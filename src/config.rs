use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};

/// billing configuration for penalty enforcement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// days after due date before a late fee becomes eligible
    pub grace_period_days: u32,
    /// flat one-time fee per overdue obligation
    pub late_fee_amount: Money,
}

impl BillingConfig {
    /// standard configuration: 5-day grace, flat 500 fee
    pub fn standard() -> Self {
        Self {
            grace_period_days: 5,
            late_fee_amount: Money::from_major(500),
        }
    }

    pub fn new(grace_period_days: u32, late_fee_amount: Money) -> Result<Self> {
        let config = Self {
            grace_period_days,
            late_fee_amount,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.late_fee_amount.is_positive() {
            return Err(LedgerError::InvalidConfiguration {
                message: format!("late fee must be positive, got {}", self.late_fee_amount),
            });
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self::standard()
    }
}
