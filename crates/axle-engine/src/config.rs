//! # Business Configuration
//!
//! Injected settings the engines need: the purchase-side tax rate and
//! the display currency. Loaded once at startup from the environment
//! and passed to the engines that need it; nothing here is global or
//! mutable at runtime.

use axle_core::TaxRate;

/// Environment variable for the purchase tax in basis points.
pub const ENV_PURCHASE_TAX_BPS: &str = "AXLE_PURCHASE_TAX_BPS";

/// Environment variable for the ISO currency code.
pub const ENV_CURRENCY: &str = "AXLE_CURRENCY";

/// Business-level configuration injected into the engines.
///
/// Sale prices are tax-inclusive in this system, so `purchase_tax`
/// only applies to supplier purchase-order totals.
#[derive(Debug, Clone)]
pub struct BusinessConfig {
    pub purchase_tax: TaxRate,
    pub currency: String,
}

impl BusinessConfig {
    /// Loads configuration from the environment, falling back to
    /// defaults (16% purchase tax, USD) for unset or unparsable values.
    pub fn from_env() -> Self {
        let purchase_tax = std::env::var(ENV_PURCHASE_TAX_BPS)
            .ok()
            .and_then(|raw| raw.parse::<u32>().ok())
            .filter(|bps| *bps <= 10_000)
            .map(TaxRate::from_bps)
            .unwrap_or_else(|| TaxRate::from_percentage(16));

        let currency = std::env::var(ENV_CURRENCY)
            .ok()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "USD".to_string());

        BusinessConfig {
            purchase_tax,
            currency,
        }
    }
}

impl Default for BusinessConfig {
    fn default() -> Self {
        BusinessConfig {
            purchase_tax: TaxRate::from_percentage(16),
            currency: "USD".to_string(),
        }
    }
}
