//! Risk ledger limits configuration

use serde::{Deserialize, Serialize};

/// Exposure caps enforced by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerLimits {
    /// Maximum concurrently active trades on one symbol
    #[serde(default = "default_max_trades_per_symbol")]
    pub max_trades_per_symbol: usize,

    /// Maximum concurrently active trades across the portfolio
    #[serde(default = "default_max_trades_portfolio")]
    pub max_trades_portfolio: usize,

    /// Minimum risk percent a single trade may carry
    #[serde(default = "default_min_risk_per_trade")]
    pub min_risk_per_trade: f64,

    /// Maximum risk percent a single trade may carry
    #[serde(default = "default_max_symbol_risk")]
    pub max_symbol_risk: f64,

    /// Cap on the sum of active risk percent across all trades
    #[serde(default = "default_max_portfolio_risk")]
    pub max_portfolio_risk: f64,
}

impl Default for LedgerLimits {
    fn default() -> Self {
        Self {
            max_trades_per_symbol: 2,
            max_trades_portfolio: 5,
            min_risk_per_trade: 0.1,
            max_symbol_risk: 2.0,
            max_portfolio_risk: 5.0,
        }
    }
}

fn default_max_trades_per_symbol() -> usize {
    2
}

fn default_max_trades_portfolio() -> usize {
    5
}

fn default_min_risk_per_trade() -> f64 {
    0.1
}

fn default_max_symbol_risk() -> f64 {
    2.0
}

fn default_max_portfolio_risk() -> f64 {
    5.0
}

/// Load limits from a TOML file.
pub fn load_limits(path: &str) -> anyhow::Result<LedgerLimits> {
    let content = std::fs::read_to_string(path)?;
    let limits: LedgerLimits = toml::from_str(&content)?;
    Ok(limits)
}

/// Save limits to a TOML file.
pub fn save_limits(limits: &LedgerLimits, path: &str) -> anyhow::Result<()> {
    let content = toml::to_string_pretty(limits)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_caps() {
        let limits = LedgerLimits::default();
        assert_eq!(limits.max_trades_per_symbol, 2);
        assert_eq!(limits.max_trades_portfolio, 5);
        assert_eq!(limits.min_risk_per_trade, 0.1);
        assert_eq!(limits.max_symbol_risk, 2.0);
        assert_eq!(limits.max_portfolio_risk, 5.0);
    }

    #[test]
    fn limits_round_trip_through_toml() {
        let limits = LedgerLimits::default();
        let serialized = toml::to_string(&limits).unwrap();
        let deserialized: LedgerLimits = toml::from_str(&serialized).unwrap();
        assert_eq!(limits.max_trades_portfolio, deserialized.max_trades_portfolio);
    }
}
