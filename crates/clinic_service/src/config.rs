//! Service configuration
//!
//! Read from `CLINIC_*` environment variables, falling back to defaults:
//!
//! | Variable | Default |
//! |---|---|
//! | `CLINIC_TAX_RATE_PERCENT` | `8` |
//! | `CLINIC_BASE_CONSULTATION_FEE` | `100` |
//! | `CLINIC_CURRENCY` | `USD` |
//! | `CLINIC_PAYMENT_TERMS_DAYS` | `30` |
//! | `CLINIC_LOCK_TIMEOUT_MS` | `2000` |
//! | `CLINIC_LOW_STOCK_ALERT_POLICY` | `on_crossing` |
//! | `CLINIC_LOG_LEVEL` | `info` |
//! | `CLINIC_LOG_FORMAT` | `text` |

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use core_kernel::{Currency, Money, Rate};
use domain_billing::BillingConfig;
use domain_inventory::AlertPolicy;

use crate::error::ServiceError;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceConfig {
    pub tax_rate_percent: Decimal,
    pub base_consultation_fee: Decimal,
    pub currency: Currency,
    pub payment_terms_days: u32,
    pub lock_timeout_ms: u64,
    pub low_stock_alert_policy: AlertPolicy,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            tax_rate_percent: Decimal::from(8),
            base_consultation_fee: Decimal::from(100),
            currency: Currency::USD,
            payment_terms_days: 30,
            lock_timeout_ms: 2_000,
            low_stock_alert_policy: AlertPolicy::OnCrossing,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from the environment
    pub fn from_env() -> Result<Self, ServiceError> {
        let config = config::Config::builder()
            .set_default("tax_rate_percent", "8")?
            .set_default("base_consultation_fee", "100")?
            .set_default("currency", "USD")?
            .set_default("payment_terms_days", 30)?
            .set_default("lock_timeout_ms", 2_000)?
            .set_default("low_stock_alert_policy", "on_crossing")?
            .set_default("log_level", "info")?
            .set_default("log_format", "text")?
            .add_source(config::Environment::with_prefix("CLINIC"))
            .build()?
            .try_deserialize::<ServiceConfig>()?;
        config.billing()?;
        Ok(config)
    }

    /// The billing part of the configuration, validated
    pub fn billing(&self) -> Result<BillingConfig, ServiceError> {
        let billing = BillingConfig {
            currency: self.currency,
            tax_rate: Rate::from_percentage(self.tax_rate_percent),
            base_consultation_fee: Money::new(self.base_consultation_fee, self.currency),
            payment_terms_days: self.payment_terms_days,
        };
        billing.validate()?;
        Ok(billing)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_billing() {
        let billing = ServiceConfig::default().billing().unwrap();
        assert_eq!(billing, BillingConfig::default());
    }

    #[test]
    fn test_negative_fee_rejected() {
        let config = ServiceConfig {
            base_consultation_fee: Decimal::from(-5),
            ..ServiceConfig::default()
        };
        assert!(config.billing().is_err());
    }

    #[test]
    fn test_lock_timeout() {
        assert_eq!(ServiceConfig::default().lock_timeout(), Duration::from_secs(2));
    }
}
