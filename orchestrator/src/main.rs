use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use common::{
    Candle, MarketState, PerformanceSource, SentimentSignal, StructureContext, StructureKind,
    Timeframe, Urgency,
};
use orchestrator::{
    InMemoryJournal, JournalSink, LogNotifier, MultiSymbolOrchestrator, OrchestratorConfig,
    PaperExecutionSink, PerformanceMonitor, SymbolCycle,
};
use portfolio_risk::{LedgerLimits, RiskLedger};
use signal_fusion::{FusionEngine, GuardrailGate};
use technical_analysis::ContextResolver;
use tracing::{info, Level};
use tracing_subscriber::fmt;

/// Gently trending synthetic series with one strong bearish candle so the
/// order-block branch has something to find.
fn demo_bars(base: f64, step: f64, n: usize) -> Vec<Candle> {
    let mut bars = Vec::with_capacity(n);
    for i in 0..n {
        let open = base + step * i as f64;
        bars.push(Candle {
            open,
            high: open + step * 1.5,
            low: open - step * 0.5,
            close: open + step,
        });
    }
    if n > 10 {
        // Last down-move before the up-leg resumes.
        let open = base + step * (n as f64 / 2.0);
        bars[n / 2] = Candle {
            open,
            high: open + step * 0.2,
            low: open - step * 1.8,
            close: open - step * 1.5,
        };
    }
    bars
}

fn market(entry: f64, spread: f64, median_spread: f64) -> MarketState {
    MarketState {
        entry,
        bid: entry - spread / 2.0,
        ask: entry + spread / 2.0,
        spread,
        median_spread,
        volatility: 0.05,
        median_volatility: 0.04,
        data_age: 4,
    }
}

fn cycle(
    symbol: &str,
    score: f64,
    urgency: Urgency,
    state: MarketState,
    with_bars: bool,
) -> SymbolCycle {
    let direction = if score >= 0.0 { "bullish" } else { "bearish" };
    let mut bars = BTreeMap::new();
    let mut entry_indices = BTreeMap::new();
    if with_bars {
        bars.insert(Timeframe::M5, demo_bars(state.entry - 0.5, 0.01, 40));
        bars.insert(Timeframe::H1, demo_bars(state.entry - 2.0, 0.05, 40));
        entry_indices.insert(Timeframe::M5, 39);
        entry_indices.insert(Timeframe::H1, 39);
    }
    SymbolCycle {
        symbol: symbol.to_string(),
        sentiment: SentimentSignal {
            score,
            urgency,
            direction: direction.to_string(),
        },
        forecast: score * 0.9,
        structure: StructureContext {
            confirmed: true,
            kind: StructureKind::Breakout,
            sl_buffer: 0.3,
        },
        market: state,
        news: None,
        bars,
        entry_indices,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_max_level(Level::INFO).init();

    info!("Multi-Symbol Decision Pipeline Demo");
    info!("===================================");

    let ledger = Arc::new(RiskLedger::new(LedgerLimits::default()));
    let journal = Arc::new(InMemoryJournal::new());
    let performance = Arc::new(PerformanceMonitor::new(Arc::clone(&journal)));
    let orchestrator = MultiSymbolOrchestrator::new(
        OrchestratorConfig::default(),
        FusionEngine::default(),
        GuardrailGate::default(),
        ContextResolver::default(),
        Arc::clone(&ledger),
        Arc::new(PaperExecutionSink::new()),
        Arc::clone(&journal) as Arc<dyn JournalSink>,
        Arc::clone(&performance) as Arc<dyn PerformanceSource>,
        Arc::new(LogNotifier),
    );

    let cycles = vec![
        // Strong confirmed bias with structural context: expect an entry.
        cycle("XAUUSD", 0.82, Urgency::High, market(2363.1, 0.09, 0.10), true),
        // Spread more than 1.5x its median: expect a pre-trade block.
        cycle("EURUSD", 0.80, Urgency::High, market(1.0845, 0.0004, 0.0002), false),
        // Sentiment below threshold: expect no entry with check detail.
        cycle("GBPJPY", 0.40, Urgency::Medium, market(198.52, 0.03, 0.03), false),
    ];

    let reports = orchestrator.run_cycle(cycles).await;
    for report in &reports {
        match (&report.decision, &report.error) {
            (Some(decision), _) => {
                info!(symbol = %report.symbol, decision = ?decision, "cycle finished")
            }
            (None, Some(error)) => {
                info!(symbol = %report.symbol, %error, "cycle failed")
            }
            (None, None) => {}
        }
    }

    let active_trades = ledger.portfolio_trades().await;
    let active_risk = ledger.total_risk().await;
    let journaled = journal.len().await;
    info!(active_trades, active_risk, journaled, "portfolio after cycle");

    // Close whatever was opened and show the exposure draining.
    for report in &reports {
        if let Some(trade_id) = report.trade_id {
            orchestrator.close_trade(&report.symbol, trade_id).await;
        }
    }
    let active_trades = ledger.portfolio_trades().await;
    info!(active_trades, "portfolio after close");

    let snapshot = performance.snapshot().await?;
    info!(
        trades = snapshot.trades,
        win_rate = snapshot.win_rate,
        pnl_total = snapshot.pnl_total,
        max_drawdown = snapshot.max_drawdown,
        "trailing performance"
    );

    Ok(())
}
