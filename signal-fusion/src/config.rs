//! Fusion and guardrail configuration

use common::Urgency;
use serde::{Deserialize, Serialize};

/// Pre-trade blocker thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockerConfig {
    /// Block when spread exceeds this multiple of its median
    #[serde(default = "default_spread_ratio")]
    pub max_spread_ratio: f64,

    /// Block when the snapshot is older than this many feed time units
    #[serde(default = "default_max_data_age")]
    pub max_data_age: u64,

    /// Block when volatility exceeds this multiple of its median
    #[serde(default = "default_volatility_ratio")]
    pub max_volatility_ratio: f64,
}

impl Default for BlockerConfig {
    fn default() -> Self {
        Self {
            max_spread_ratio: 1.5,
            max_data_age: 20,
            max_volatility_ratio: 3.0,
        }
    }
}

fn default_spread_ratio() -> f64 {
    1.5
}

fn default_max_data_age() -> u64 {
    20
}

fn default_volatility_ratio() -> f64 {
    3.0
}

/// Confidence blend weights; expected to sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionWeights {
    pub sentiment: f64,
    pub forecast: f64,
    pub structure: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            sentiment: 0.4,
            forecast: 0.3,
            structure: 0.3,
        }
    }
}

/// Risk-per-trade tiering as a step function of confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskTiers {
    /// Base risk percent of equity per trade
    pub base: f64,
    /// Hard cap on the upper tier
    pub max: f64,
    /// Hard floor on the lower tier
    pub min: f64,
    /// Confidence at or above which the upper tier applies
    pub high_confidence: f64,
    /// Confidence below which no entry is taken
    pub min_confidence: f64,
}

impl Default for RiskTiers {
    fn default() -> Self {
        Self {
            base: 1.0,
            max: 2.0,
            min: 0.25,
            high_confidence: 0.8,
            min_confidence: 0.6,
        }
    }
}

/// Stop/target multiples applied to the volatility proxy when no
/// multi-timeframe context is supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackSizing {
    pub sl_mult: f64,
    pub tp_mult: f64,
}

impl Default for FallbackSizing {
    fn default() -> Self {
        Self {
            sl_mult: 1.5,
            tp_mult: 2.5,
        }
    }
}

/// Fusion decision engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Minimum |sentiment score| for bias confirmation
    #[serde(default = "default_sentiment_threshold")]
    pub sentiment_threshold: f64,

    /// Minimum sentiment urgency for bias confirmation
    #[serde(default = "default_min_urgency")]
    pub min_urgency: Urgency,

    /// Minimum |forecast| agreeing with sentiment direction
    #[serde(default = "default_forecast_min_agreement")]
    pub forecast_min_agreement: f64,

    #[serde(default)]
    pub blockers: BlockerConfig,

    #[serde(default)]
    pub weights: FusionWeights,

    #[serde(default)]
    pub risk: RiskTiers,

    #[serde(default)]
    pub fallback: FallbackSizing,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            sentiment_threshold: 0.65,
            min_urgency: Urgency::Medium,
            forecast_min_agreement: 0.5,
            blockers: BlockerConfig::default(),
            weights: FusionWeights::default(),
            risk: RiskTiers::default(),
            fallback: FallbackSizing::default(),
        }
    }
}

fn default_sentiment_threshold() -> f64 {
    0.65
}

fn default_min_urgency() -> Urgency {
    Urgency::Medium
}

fn default_forecast_min_agreement() -> f64 {
    0.5
}

/// Guardrail gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// Veto when high-impact news is within this many minutes
    #[serde(default = "default_news_window")]
    pub news_window_minutes: i64,

    /// Veto when |sentiment score| falls below this, even after fusion
    #[serde(default = "default_min_sentiment")]
    pub min_sentiment: f64,

    /// Veto when spread exceeds this multiple of its median
    #[serde(default = "default_spread_ratio")]
    pub spread_spike_ratio: f64,

    /// Veto when volatility exceeds this multiple of its median
    #[serde(default = "default_volatility_ratio")]
    pub volatility_spike_ratio: f64,

    /// Risk off when max drawdown exceeds this multiple of total PnL
    #[serde(default = "default_drawdown_ratio")]
    pub drawdown_pnl_ratio: f64,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            news_window_minutes: 15,
            min_sentiment: 0.65,
            spread_spike_ratio: 1.5,
            volatility_spike_ratio: 3.0,
            drawdown_pnl_ratio: 3.0,
        }
    }
}

fn default_news_window() -> i64 {
    15
}

fn default_min_sentiment() -> f64 {
    0.65
}

fn default_drawdown_ratio() -> f64 {
    3.0
}

/// Combined settings as persisted on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FusionSettings {
    #[serde(default)]
    pub fusion: FusionConfig,

    #[serde(default)]
    pub guardrails: GuardrailConfig,
}

/// Load settings from a TOML file.
pub fn load_settings(path: &str) -> anyhow::Result<FusionSettings> {
    let content = std::fs::read_to_string(path)?;
    let settings: FusionSettings = toml::from_str(&content)?;
    Ok(settings)
}

/// Save settings to a TOML file.
pub fn save_settings(settings: &FusionSettings, path: &str) -> anyhow::Result<()> {
    let content = toml::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}
