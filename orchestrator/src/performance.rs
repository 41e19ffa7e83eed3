//! Journal-backed performance feedback

use std::sync::Arc;

use anyhow::Result;
use common::{PerformanceSnapshot, PerformanceSource};

use crate::journal::InMemoryJournal;
use crate::sinks::OutcomeKind;

/// Default trailing window of journal records.
pub const DEFAULT_WINDOW: usize = 200;

/// Computes performance metrics over the trailing journal window on every
/// call. Nothing is cached, so the guardrail drawdown check always sees
/// the current state of the journal.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    journal: Arc<InMemoryJournal>,
    window: usize,
}

impl PerformanceMonitor {
    pub fn new(journal: Arc<InMemoryJournal>) -> Self {
        Self::with_window(journal, DEFAULT_WINDOW)
    }

    pub fn with_window(journal: Arc<InMemoryJournal>, window: usize) -> Self {
        Self { journal, window }
    }
}

#[async_trait::async_trait]
impl PerformanceSource for PerformanceMonitor {
    async fn snapshot(&self) -> Result<PerformanceSnapshot> {
        let records = self.journal.recent(self.window).await;

        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut pnl_total = 0.0;
        let mut equity = 0.0;
        let mut peak = 0.0f64;
        let mut max_drawdown = 0.0f64;

        for record in &records {
            pnl_total += record.outcome.pnl;
            equity += record.outcome.pnl;
            peak = peak.max(equity);
            max_drawdown = max_drawdown.max(peak - equity);
            match record.outcome.result {
                OutcomeKind::Win => wins += 1,
                OutcomeKind::Loss => losses += 1,
                OutcomeKind::Pending => {}
            }
        }

        let trades = records.len();
        let win_rate = if trades > 0 {
            100.0 * wins as f64 / trades as f64
        } else {
            0.0
        };

        Ok(PerformanceSnapshot {
            trades,
            wins,
            losses,
            win_rate,
            pnl_total,
            max_drawdown,
        })
    }
}
