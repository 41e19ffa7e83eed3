//! Per-symbol decision pipeline and concurrent fan-out

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use common::{
    Candle, Direction, MarketState, PerformanceSource, SentimentSignal, StructureContext,
    Timeframe, TradeDecision, Uuid,
};
use portfolio_risk::RiskLedger;
use serde::{Deserialize, Serialize};
use signal_fusion::{FusionEngine, GuardrailGate, NewsContext};
use technical_analysis::ContextResolver;
use tracing::{error, info, warn};

use crate::sinks::{
    ExecutionOutcome, ExecutionRecord, ExecutionSink, JournalRecord, JournalSink,
    NotificationSink, OrderSpec, TradeContext, TradeOutcome,
};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Strategy label written into journal records
    pub strategy: String,
    /// Order volume handed to the execution sink
    pub default_volume: f64,
    /// Bounded wait for the execution acknowledgment
    pub ack_timeout_secs: u64,
    /// Fixed polling interval during the acknowledgment wait
    pub ack_poll_interval_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            strategy: "default".to_string(),
            default_volume: 0.1,
            ack_timeout_secs: 10,
            ack_poll_interval_ms: 500,
        }
    }
}

/// All inputs for one symbol's decision cycle. Built fresh by the caller
/// each cycle and consumed by the pipeline.
#[derive(Debug, Clone)]
pub struct SymbolCycle {
    pub symbol: String,
    pub sentiment: SentimentSignal,
    pub forecast: f64,
    pub structure: StructureContext,
    pub market: MarketState,
    pub news: Option<NewsContext>,
    /// Per-timeframe bar series; empty map skips structural resolution
    pub bars: BTreeMap<Timeframe, Vec<Candle>>,
    /// Per-timeframe entry bar indices for the OB/FVG scans
    pub entry_indices: BTreeMap<Timeframe, usize>,
}

/// Per-symbol outcome of one orchestrator cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub decision: Option<TradeDecision>,
    pub trade_id: Option<Uuid>,
    pub execution: Option<ExecutionOutcome>,
    pub error: Option<String>,
}

impl SymbolReport {
    fn decided(symbol: String, decision: TradeDecision) -> Self {
        Self {
            symbol,
            decision: Some(decision),
            trade_id: None,
            execution: None,
            error: None,
        }
    }

    fn failed(symbol: String, error: String) -> Self {
        Self {
            symbol,
            decision: None,
            trade_id: None,
            execution: None,
            error: Some(error),
        }
    }
}

/// Runs the full pipeline per symbol on its own task. Workers share
/// nothing but the risk ledger; one symbol's failure never aborts the
/// others.
#[derive(Clone)]
pub struct MultiSymbolOrchestrator {
    config: OrchestratorConfig,
    fusion: Arc<FusionEngine>,
    guardrails: Arc<GuardrailGate>,
    resolver: Arc<ContextResolver>,
    ledger: Arc<RiskLedger>,
    execution: Arc<dyn ExecutionSink>,
    journal: Arc<dyn JournalSink>,
    performance: Arc<dyn PerformanceSource>,
    notifier: Arc<dyn NotificationSink>,
}

impl MultiSymbolOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OrchestratorConfig,
        fusion: FusionEngine,
        guardrails: GuardrailGate,
        resolver: ContextResolver,
        ledger: Arc<RiskLedger>,
        execution: Arc<dyn ExecutionSink>,
        journal: Arc<dyn JournalSink>,
        performance: Arc<dyn PerformanceSource>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            fusion: Arc::new(fusion),
            guardrails: Arc::new(guardrails),
            resolver: Arc::new(resolver),
            ledger,
            execution,
            journal,
            performance,
            notifier,
        }
    }

    pub fn ledger(&self) -> &Arc<RiskLedger> {
        &self.ledger
    }

    /// Run one decision cycle for every symbol concurrently and join all
    /// workers. Reports come back in input order.
    pub async fn run_cycle(&self, cycles: Vec<SymbolCycle>) -> Vec<SymbolReport> {
        let mut handles = Vec::with_capacity(cycles.len());
        for cycle in cycles {
            let worker = self.clone();
            let symbol = cycle.symbol.clone();
            handles.push((
                symbol,
                tokio::spawn(async move { worker.process_symbol(cycle).await }),
            ));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (symbol, handle) in handles {
            let report = match handle.await {
                Ok(Ok(report)) => report,
                Ok(Err(err)) => {
                    error!(%symbol, error = %err, "symbol cycle failed");
                    SymbolReport::failed(symbol, err.to_string())
                }
                Err(join_err) => {
                    error!(%symbol, error = %join_err, "symbol worker panicked");
                    SymbolReport::failed(symbol, format!("worker panicked: {}", join_err))
                }
            };
            reports.push(report);
        }
        reports
    }

    /// Release a closed trade's exposure from the ledger.
    pub async fn close_trade(&self, symbol: &str, trade_id: Uuid) -> bool {
        self.ledger.close(symbol, trade_id).await
    }

    /// One symbol's cycle: resolve levels, fuse, guard, gate on the
    /// ledger, execute, journal, notify.
    pub async fn process_symbol(&self, cycle: SymbolCycle) -> Result<SymbolReport> {
        let symbol = cycle.symbol.clone();
        info!(%symbol, "starting decision cycle");

        let scan_direction = if cycle.sentiment.score > 0.0 {
            Direction::Buy
        } else {
            Direction::Sell
        };
        let levels = if cycle.bars.is_empty() {
            None
        } else {
            Some(
                self.resolver
                    .resolve(&cycle.bars, &cycle.entry_indices, scan_direction)?,
            )
        };

        let decision = self.fusion.fuse(
            &cycle.sentiment,
            cycle.forecast,
            &cycle.structure,
            &cycle.market,
            levels.as_ref(),
        )?;

        let decision = self
            .guardrails
            .apply(
                decision,
                &cycle.market,
                &cycle.sentiment,
                cycle.news.as_ref(),
                self.performance.as_ref(),
            )
            .await?;

        let (entry_type, direction, sl, tp, risk_pct) = match &decision {
            TradeDecision::Entry {
                entry_type,
                direction,
                sl,
                tp,
                risk_pct,
                ..
            } => (*entry_type, *direction, *sl, *tp, *risk_pct),
            _ => {
                let reason = decision.reason().unwrap_or("unknown");
                info!(%symbol, reason, "no trade this cycle");
                self.notify(&format!("[{}] Trade blocked: {}", symbol, reason))
                    .await;
                return Ok(SymbolReport::decided(symbol, decision));
            }
        };

        let trade_id = Uuid::new_v4();
        if let Err(veto) = self.ledger.try_enter(&symbol, trade_id, risk_pct).await {
            let reason = veto.to_string();
            info!(%symbol, %reason, "ledger veto");
            self.notify(&format!("[{}] Trade blocked: {}", symbol, reason))
                .await;
            return Ok(SymbolReport::decided(symbol, TradeDecision::Block { reason }));
        }

        let order = OrderSpec {
            symbol: symbol.clone(),
            direction,
            volume: self.config.default_volume,
            sl,
            tp,
            entry_type,
        };
        let execution = self.execute_with_ack_wait(trade_id, &order).await?;

        let entry_price = match direction {
            Direction::Buy => cycle.market.ask,
            Direction::Sell => cycle.market.bid,
        };
        let record = JournalRecord {
            timestamp: Utc::now(),
            trade_context: TradeContext {
                symbol: symbol.clone(),
                strategy: self.config.strategy.clone(),
                sentiment: cycle.sentiment.clone(),
                forecast: cycle.forecast,
                structure: cycle.structure.clone(),
                market: cycle.market.clone(),
            },
            execution_result: Some(ExecutionRecord {
                outcome: execution.clone(),
                entry_price,
            }),
            outcome: TradeOutcome::pending(),
        };
        if let Err(err) = self.journal.append(record).await {
            warn!(%symbol, error = %err, "journal append failed");
        }

        self.notify(&format!(
            "[{}] {} {} executed, sl {:.3} tp {:.3} risk {:.2}%",
            symbol, direction, order.volume, sl, tp, risk_pct
        ))
        .await;

        Ok(SymbolReport {
            symbol,
            decision: Some(decision),
            trade_id: Some(trade_id),
            execution: Some(execution),
            error: None,
        })
    }

    /// Submit the order and poll for its acknowledgment until the
    /// configured deadline. A deadline miss yields `Unacknowledged`; the
    /// trade is not cancelled here.
    async fn execute_with_ack_wait(
        &self,
        trade_id: Uuid,
        order: &OrderSpec,
    ) -> Result<ExecutionOutcome> {
        self.execution.submit(trade_id, order).await?;

        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(self.config.ack_timeout_secs);
        let interval = Duration::from_millis(self.config.ack_poll_interval_ms);

        loop {
            if let Some(ack) = self.execution.poll_ack(trade_id).await? {
                return Ok(ExecutionOutcome::Acknowledged { ack });
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(%trade_id, "execution acknowledgment timed out");
                return Ok(ExecutionOutcome::Unacknowledged { trade_id });
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn notify(&self, message: &str) {
        if let Err(err) = self.notifier.notify(message).await {
            warn!(error = %err, "notification failed");
        }
    }
}
