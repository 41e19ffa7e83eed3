// Signal Fusion & Guardrails (Layer 2)
// Fuses sentiment, forecast and structural bias into a trade decision,
// then applies the hard-veto guardrail layer

pub mod config;
pub mod fusion;
pub mod guardrails;

pub use config::{
    load_settings, save_settings, BlockerConfig, FallbackSizing, FusionConfig, FusionSettings,
    FusionWeights, GuardrailConfig, RiskTiers,
};
pub use fusion::FusionEngine;
pub use guardrails::{GuardrailGate, NewsContext, NewsImpact};
