// Shared Data Model (Layer 0)
// Types exchanged between the analysis, fusion, risk and orchestration crates

pub mod decision;
pub mod error;
pub mod performance;
pub mod types;

pub use decision::{BiasChecks, EntryType, TradeDecision};
pub use error::InputError;
pub use performance::{PerformanceSnapshot, PerformanceSource};
pub use types::{
    Candle, Direction, MarketState, SentimentSignal, StructureContext, StructureKind, Timeframe,
    Urgency,
};

pub use uuid::Uuid;
