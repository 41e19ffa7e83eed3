//! Context-aware stop/target resolution across timeframes

use std::collections::BTreeMap;

use common::{Candle, Direction, InputError, Timeframe};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ob_fvg::{ConsolidatedSignals, ObFvgConfig, ObFvgDetector};
use crate::sizing::{atr_at, DynamicSizing, SizingConfig};
use crate::structure::{detect_market_structure, StructureState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Timeframe whose bars anchor entry price, ATR and structure
    pub context_timeframe: Timeframe,
    /// Target distance in ATR multiples when an order block sets the stop
    pub ob_tp_atr_mult: f64,
    /// Stop distance in ATR multiples when an FVG sets the target
    pub fvg_sl_atr_mult: f64,
    pub detector: ObFvgConfig,
    pub sizing: SizingConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            context_timeframe: Timeframe::M5,
            ob_tp_atr_mult: 2.0,
            fvg_sl_atr_mult: 1.5,
            detector: ObFvgConfig::default(),
            sizing: SizingConfig::default(),
        }
    }
}

/// Which priority branch produced the levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelBasis {
    OrderBlock,
    FairValueGap,
    AtrFallback,
}

/// Everything the resolver looked at, kept for audit and journaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSignals {
    pub structure: StructureState,
    pub signals: ConsolidatedSignals,
}

/// Final stop/target with the branch that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedLevels {
    pub stop: f64,
    pub target: f64,
    pub basis: LevelBasis,
    pub context: ContextSignals,
}

/// Consolidates multi-timeframe OB/FVG detection with structure analysis
/// and ATR sizing into one stop/target pair per decision.
///
/// Priority: order block > fair value gap > pure ATR.
#[derive(Debug, Clone, Default)]
pub struct ContextResolver {
    config: ResolverConfig,
    detector: ObFvgDetector,
    sizing: DynamicSizing,
}

impl ContextResolver {
    pub fn new(config: ResolverConfig) -> Self {
        let detector = ObFvgDetector::new(config.detector.clone());
        let sizing = DynamicSizing::new(config.sizing.clone());
        Self {
            config,
            detector,
            sizing,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn resolve(
        &self,
        data: &BTreeMap<Timeframe, Vec<Candle>>,
        entry_indices: &BTreeMap<Timeframe, usize>,
        direction: Direction,
    ) -> Result<ResolvedLevels, InputError> {
        let context_tf = self.config.context_timeframe;
        let bars = data.get(&context_tf).ok_or_else(|| InputError::MissingSeries {
            timeframe: context_tf.to_string(),
        })?;
        let entry_idx = entry_indices.get(&context_tf).copied().unwrap_or(0);
        if entry_idx >= bars.len() {
            return Err(InputError::NotEnoughBars {
                timeframe: context_tf.to_string(),
                have: bars.len(),
                need: entry_idx + 1,
            });
        }
        let atr = atr_at(bars, self.config.sizing.atr_period, entry_idx).ok_or_else(|| {
            InputError::NotEnoughBars {
                timeframe: context_tf.to_string(),
                have: entry_idx + 1,
                need: self.config.sizing.atr_period,
            }
        })?;

        let all_obs = self.detector.detect_multi_tf_ob(data, direction);
        let all_fvgs = self.detector.detect_multi_tf_fvg(data, entry_indices, direction);
        let signals = self.detector.consolidate(all_obs, all_fvgs);
        let structure = detect_market_structure(bars);
        let entry = bars[entry_idx].close;

        let (stop, target, basis) = if let Some(ob) = &signals.main_ob {
            let target = match direction {
                Direction::Buy => entry + self.config.ob_tp_atr_mult * atr,
                Direction::Sell => entry - self.config.ob_tp_atr_mult * atr,
            };
            (ob.price, target, LevelBasis::OrderBlock)
        } else if let Some(fvg) = &signals.main_fvg {
            let stop = match direction {
                Direction::Buy => entry - self.config.fvg_sl_atr_mult * atr,
                Direction::Sell => entry + self.config.fvg_sl_atr_mult * atr,
            };
            (stop, fvg.price, LevelBasis::FairValueGap)
        } else {
            // ATR window already verified above, so this cannot miss.
            let (stop, target) = self
                .sizing
                .sl_tp(bars, entry_idx, direction)
                .expect("ATR available at entry index");
            (stop, target, LevelBasis::AtrFallback)
        };

        debug!(
            timeframe = %context_tf,
            ?basis,
            stop,
            target,
            "resolved contextual levels"
        );

        Ok(ResolvedLevels {
            stop,
            target,
            basis,
            context: ContextSignals { structure, signals },
        })
    }
}
