//! Active-trade bookkeeping and exposure gating

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::LedgerLimits;

/// One active trade's exposure. Created on acceptance, removed on close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub trade_id: Uuid,
    pub risk_pct: f64,
}

/// Capacity rejection from `can_enter`. A veto is an expected outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerVeto {
    MaxSymbolTrades {
        symbol: String,
        limit: usize,
    },
    MaxPortfolioTrades {
        limit: usize,
    },
    RiskBelowMinimum {
        proposed: f64,
        minimum: f64,
    },
    RiskAboveSymbolMax {
        proposed: f64,
        maximum: f64,
    },
    PortfolioRiskCapExceeded {
        active: f64,
        proposed: f64,
        cap: f64,
    },
}

impl std::fmt::Display for LedgerVeto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerVeto::MaxSymbolTrades { symbol, limit } => {
                write!(f, "Max trades for {} reached (limit {})", symbol, limit)
            }
            LedgerVeto::MaxPortfolioTrades { limit } => {
                write!(f, "Max portfolio trades reached (limit {})", limit)
            }
            LedgerVeto::RiskBelowMinimum { proposed, minimum } => {
                write!(f, "Risk too low: {:.2}% < {:.2}%", proposed, minimum)
            }
            LedgerVeto::RiskAboveSymbolMax { proposed, maximum } => {
                write!(
                    f,
                    "Risk per trade exceeds symbol max: {:.2}% > {:.2}%",
                    proposed, maximum
                )
            }
            LedgerVeto::PortfolioRiskCapExceeded {
                active,
                proposed,
                cap,
            } => {
                write!(
                    f,
                    "Portfolio risk cap exceeded: {:.2}% + {:.2}% > {:.2}%",
                    active, proposed, cap
                )
            }
        }
    }
}

impl std::error::Error for LedgerVeto {}

/// Owned, explicitly constructed risk ledger. All operations serialize on
/// one internal lock so a check-then-register pair cannot interleave with
/// another worker's.
#[derive(Debug)]
pub struct RiskLedger {
    limits: LedgerLimits,
    active: Mutex<HashMap<String, Vec<LedgerEntry>>>,
}

impl RiskLedger {
    pub fn new(limits: LedgerLimits) -> Self {
        Self {
            limits,
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn limits(&self) -> &LedgerLimits {
        &self.limits
    }

    fn check(
        &self,
        active: &HashMap<String, Vec<LedgerEntry>>,
        symbol: &str,
        proposed_risk_pct: f64,
    ) -> Result<(), LedgerVeto> {
        let symbol_trades = active.get(symbol).map_or(0, Vec::len);
        let portfolio_trades: usize = active.values().map(Vec::len).sum();
        let total_risk: f64 = active
            .values()
            .flat_map(|entries| entries.iter())
            .map(|entry| entry.risk_pct)
            .sum();

        if symbol_trades >= self.limits.max_trades_per_symbol {
            return Err(LedgerVeto::MaxSymbolTrades {
                symbol: symbol.to_string(),
                limit: self.limits.max_trades_per_symbol,
            });
        }
        if portfolio_trades >= self.limits.max_trades_portfolio {
            return Err(LedgerVeto::MaxPortfolioTrades {
                limit: self.limits.max_trades_portfolio,
            });
        }
        if proposed_risk_pct < self.limits.min_risk_per_trade {
            return Err(LedgerVeto::RiskBelowMinimum {
                proposed: proposed_risk_pct,
                minimum: self.limits.min_risk_per_trade,
            });
        }
        if proposed_risk_pct > self.limits.max_symbol_risk {
            return Err(LedgerVeto::RiskAboveSymbolMax {
                proposed: proposed_risk_pct,
                maximum: self.limits.max_symbol_risk,
            });
        }
        if total_risk + proposed_risk_pct > self.limits.max_portfolio_risk {
            return Err(LedgerVeto::PortfolioRiskCapExceeded {
                active: total_risk,
                proposed: proposed_risk_pct,
                cap: self.limits.max_portfolio_risk,
            });
        }
        Ok(())
    }

    /// Would a new trade on `symbol` at `proposed_risk_pct` be admitted?
    pub async fn can_enter(&self, symbol: &str, proposed_risk_pct: f64) -> Result<(), LedgerVeto> {
        let active = self.active.lock().await;
        self.check(&active, symbol, proposed_risk_pct)
    }

    /// Record an accepted trade. Callers racing other workers should use
    /// `try_enter` instead, which runs the capacity check and this
    /// registration under a single lock acquisition.
    pub async fn register(&self, symbol: &str, trade_id: Uuid, risk_pct: f64) {
        let mut active = self.active.lock().await;
        active
            .entry(symbol.to_string())
            .or_default()
            .push(LedgerEntry { trade_id, risk_pct });
        debug!(symbol, %trade_id, risk_pct, "trade registered");
    }

    /// Atomic check-then-register: no interleaving from other workers can
    /// admit a trade past a cap.
    pub async fn try_enter(
        &self,
        symbol: &str,
        trade_id: Uuid,
        risk_pct: f64,
    ) -> Result<(), LedgerVeto> {
        let mut active = self.active.lock().await;
        self.check(&active, symbol, risk_pct)?;
        active
            .entry(symbol.to_string())
            .or_default()
            .push(LedgerEntry { trade_id, risk_pct });
        info!(symbol, %trade_id, risk_pct, "trade admitted");
        Ok(())
    }

    /// Remove a closed trade; the symbol key is dropped once its last
    /// entry goes. Returns whether anything was removed.
    pub async fn close(&self, symbol: &str, trade_id: Uuid) -> bool {
        let mut active = self.active.lock().await;
        let Some(entries) = active.get_mut(symbol) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.trade_id != trade_id);
        let removed = entries.len() < before;
        if entries.is_empty() {
            active.remove(symbol);
        }
        if removed {
            debug!(symbol, %trade_id, "trade closed");
        }
        removed
    }

    /// Active trades on one symbol.
    pub async fn symbol_trades(&self, symbol: &str) -> usize {
        self.active.lock().await.get(symbol).map_or(0, Vec::len)
    }

    /// Active trades across the portfolio.
    pub async fn portfolio_trades(&self) -> usize {
        self.active.lock().await.values().map(Vec::len).sum()
    }

    /// Sum of active risk percent across all trades.
    pub async fn total_risk(&self) -> f64 {
        self.active
            .lock()
            .await
            .values()
            .flat_map(|entries| entries.iter())
            .map(|entry| entry.risk_pct)
            .sum()
    }

    /// Clone of the current symbol -> entries map, for reporting.
    pub async fn snapshot(&self) -> HashMap<String, Vec<LedgerEntry>> {
        self.active.lock().await.clone()
    }
}

impl Default for RiskLedger {
    fn default() -> Self {
        Self::new(LedgerLimits::default())
    }
}
