//! External sink contracts and in-process reference implementations
//!
//! Broker transmission, journaling and notification are external
//! collaborators; the pipeline only sees these traits. The paper sink and
//! log notifier back the tests and the demo binary.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use common::{Direction, EntryType, MarketState, SentimentSignal, StructureContext};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Finished order specification handed to the execution sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSpec {
    pub symbol: String,
    pub direction: Direction,
    pub volume: f64,
    pub sl: f64,
    pub tp: f64,
    pub entry_type: EntryType,
}

/// Broker acknowledgment for a submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionAck {
    pub trade_id: Uuid,
    pub status: String,
}

/// Result of the bounded acknowledgment wait. A timeout means
/// unacknowledged, not cancelled; follow-up is the caller's decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Acknowledged { ack: ExecutionAck },
    Unacknowledged { trade_id: Uuid },
}

impl ExecutionOutcome {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, ExecutionOutcome::Acknowledged { .. })
    }
}

/// Order transmission contract: submit, then poll for the acknowledgment.
#[async_trait::async_trait]
pub trait ExecutionSink: Send + Sync {
    async fn submit(&self, trade_id: Uuid, order: &OrderSpec) -> Result<()>;

    async fn poll_ack(&self, trade_id: Uuid) -> Result<Option<ExecutionAck>>;
}

/// All signal inputs behind one decision, journaled for later review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeContext {
    pub symbol: String,
    pub strategy: String,
    pub sentiment: SentimentSignal,
    pub forecast: f64,
    pub structure: StructureContext,
    pub market: MarketState,
}

/// Execution details recorded alongside the context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub outcome: ExecutionOutcome,
    pub entry_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Win,
    Loss,
    Pending,
}

/// Final (or pending) result of a journaled trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub result: OutcomeKind,
    pub pnl: f64,
}

impl TradeOutcome {
    pub fn pending() -> Self {
        Self {
            result: OutcomeKind::Pending,
            pnl: 0.0,
        }
    }
}

/// One appended journal line: context, execution, outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    pub timestamp: DateTime<Utc>,
    pub trade_context: TradeContext,
    pub execution_result: Option<ExecutionRecord>,
    pub outcome: TradeOutcome,
}

/// Append-only trade journal contract.
#[async_trait::async_trait]
pub trait JournalSink: Send + Sync {
    async fn append(&self, record: JournalRecord) -> Result<()>;
}

/// Outbound human-readable alerting contract. Delivery failures are the
/// caller's to log; they never abort a cycle.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

/// Paper execution: every submitted order is acknowledged as filled on
/// the first poll.
#[derive(Debug, Default)]
pub struct PaperExecutionSink {
    pending: Mutex<HashMap<Uuid, ExecutionAck>>,
}

impl PaperExecutionSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ExecutionSink for PaperExecutionSink {
    async fn submit(&self, trade_id: Uuid, order: &OrderSpec) -> Result<()> {
        info!(
            %trade_id,
            symbol = %order.symbol,
            direction = %order.direction,
            volume = order.volume,
            "paper order submitted"
        );
        let mut pending = self.pending.lock().await;
        pending.insert(
            trade_id,
            ExecutionAck {
                trade_id,
                status: "filled".to_string(),
            },
        );
        Ok(())
    }

    async fn poll_ack(&self, trade_id: Uuid) -> Result<Option<ExecutionAck>> {
        let mut pending = self.pending.lock().await;
        Ok(pending.remove(&trade_id))
    }
}

/// Notification sink that only writes to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl NotificationSink for LogNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        info!(target: "notifications", "{}", message);
        Ok(())
    }
}
