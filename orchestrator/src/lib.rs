// Multi-Symbol Orchestrator (Layer 4)
// Runs the full decision pipeline per symbol concurrently, serializing
// all exposure accounting through the shared risk ledger

pub mod journal;
pub mod performance;
pub mod sinks;
pub mod worker;

pub use journal::InMemoryJournal;
pub use performance::PerformanceMonitor;
pub use sinks::{
    ExecutionAck, ExecutionOutcome, ExecutionRecord, ExecutionSink, JournalRecord, JournalSink,
    LogNotifier, NotificationSink, OrderSpec, OutcomeKind, PaperExecutionSink, TradeContext,
    TradeOutcome,
};
pub use worker::{MultiSymbolOrchestrator, OrchestratorConfig, SymbolCycle, SymbolReport};
