//! In-memory append-only trade journal

use anyhow::Result;
use tokio::sync::RwLock;

use crate::sinks::{JournalRecord, JournalSink};

/// Reference journal for tests, the demo binary and the performance
/// monitor. Records are kept in arrival order and never rewritten.
#[derive(Debug, Default)]
pub struct InMemoryJournal {
    records: RwLock<Vec<JournalRecord>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Up to the `window` most recent records, oldest first.
    pub async fn recent(&self, window: usize) -> Vec<JournalRecord> {
        let records = self.records.read().await;
        let start = records.len().saturating_sub(window);
        records[start..].to_vec()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl JournalSink for InMemoryJournal {
    async fn append(&self, record: JournalRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{OutcomeKind, TradeContext, TradeOutcome};
    use chrono::Utc;
    use common::{MarketState, SentimentSignal, StructureContext, StructureKind, Urgency};

    fn record(symbol: &str, result: OutcomeKind, pnl: f64) -> JournalRecord {
        JournalRecord {
            timestamp: Utc::now(),
            trade_context: TradeContext {
                symbol: symbol.to_string(),
                strategy: "default".to_string(),
                sentiment: SentimentSignal {
                    score: 0.8,
                    urgency: Urgency::High,
                    direction: "bullish".to_string(),
                },
                forecast: 0.7,
                structure: StructureContext {
                    confirmed: true,
                    kind: StructureKind::Breakout,
                    sl_buffer: 0.3,
                },
                market: MarketState {
                    entry: 1.234,
                    bid: 1.233,
                    ask: 1.235,
                    spread: 0.1,
                    median_spread: 0.1,
                    volatility: 0.05,
                    median_volatility: 0.05,
                    data_age: 1,
                },
            },
            execution_result: None,
            outcome: TradeOutcome { result, pnl },
        }
    }

    #[tokio::test]
    async fn records_append_in_arrival_order() {
        let journal = InMemoryJournal::new();
        journal
            .append(record("EURUSD", OutcomeKind::Win, 10.0))
            .await
            .unwrap();
        journal
            .append(record("XAUUSD", OutcomeKind::Loss, -5.0))
            .await
            .unwrap();

        let records = journal.recent(10).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].trade_context.symbol, "EURUSD");
        assert_eq!(records[1].trade_context.symbol, "XAUUSD");
    }

    #[tokio::test]
    async fn recent_truncates_to_trailing_window() {
        let journal = InMemoryJournal::new();
        for i in 0..10 {
            let pnl = i as f64;
            journal
                .append(record("EURUSD", OutcomeKind::Win, pnl))
                .await
                .unwrap();
        }

        let recent = journal.recent(3).await;
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].outcome.pnl, 7.0);
        assert_eq!(recent[2].outcome.pnl, 9.0);
    }
}
