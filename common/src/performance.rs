use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Aggregate trading performance over a trailing window of journaled
/// outcomes. Recomputed on demand; never cached across cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percentage of journaled trades that closed as wins
    pub win_rate: f64,
    pub pnl_total: f64,
    /// Peak-to-trough decline of the cumulative-PnL curve over the window
    pub max_drawdown: f64,
}

impl PerformanceSnapshot {
    pub fn empty() -> Self {
        Self {
            trades: 0,
            wins: 0,
            losses: 0,
            win_rate: 0.0,
            pnl_total: 0.0,
            max_drawdown: 0.0,
        }
    }
}

impl Default for PerformanceSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Provider of fresh performance snapshots. The guardrail layer takes this
/// as an explicit dependency instead of reaching into the journal itself.
#[async_trait::async_trait]
pub trait PerformanceSource: Send + Sync {
    async fn snapshot(&self) -> Result<PerformanceSnapshot>;
}
