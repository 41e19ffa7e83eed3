// Technical Analysis (Layer 1)
// Leaf market-structure, order-block/FVG and ATR sizing primitives feeding
// the context-aware stop/target resolver

pub mod context;
pub mod ob_fvg;
pub mod sizing;
pub mod structure;

pub use context::{ContextResolver, ContextSignals, LevelBasis, ResolvedLevels, ResolverConfig};
pub use ob_fvg::{
    ConsolidatedSignals, FvgRecord, GapKind, ObFvgConfig, ObFvgDetector, ObKind, ObRecord,
};
pub use sizing::{rolling_atr, DynamicSizing, SizingConfig};
pub use structure::{
    detect_market_structure, StructurePattern, StructureState, StructureTag,
    STRUCTURE_CONFIDENCE,
};
