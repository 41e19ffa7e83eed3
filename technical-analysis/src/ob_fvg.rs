//! Multi-timeframe order-block and fair-value-gap detection

use std::collections::BTreeMap;

use common::{Candle, Direction, Timeframe};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sizing::rolling_atr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObFvgConfig {
    /// Minimum |close-open| / (high-low) for an order-block candidate
    pub min_body_ratio: f64,
    /// Gap must exceed this multiple of the bar's ATR to count as an FVG
    pub fvg_gap_threshold: f64,
    pub atr_period: usize,
}

impl Default for ObFvgConfig {
    fn default() -> Self {
        Self {
            min_body_ratio: 0.6,
            fvg_gap_threshold: 0.5,
            atr_period: 14,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObKind {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapKind {
    Up,
    Down,
}

/// Order block found on one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObRecord {
    pub timeframe: Timeframe,
    pub index: usize,
    pub kind: ObKind,
    pub price: f64,
}

/// Fair value gap found on one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FvgRecord {
    pub timeframe: Timeframe,
    pub index: usize,
    pub kind: GapKind,
    pub price: f64,
}

/// Per-timeframe scan results with the longest-timeframe record selected
/// as the main signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedSignals {
    pub main_ob: Option<ObRecord>,
    pub main_fvg: Option<FvgRecord>,
    pub all_obs: Vec<ObRecord>,
    pub all_fvgs: Vec<FvgRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct ObFvgDetector {
    config: ObFvgConfig,
}

impl ObFvgDetector {
    pub fn new(config: ObFvgConfig) -> Self {
        Self { config }
    }

    /// Last bar whose body dominates its range and whose close runs
    /// against the bias: the final down-candle before an up-move for a
    /// Buy scan, and the mirror for Sell. Bars with no range are skipped.
    pub fn find_last_ob(&self, bars: &[Candle], direction: Direction) -> Option<usize> {
        let mut last = None;
        for (i, bar) in bars.iter().enumerate() {
            let range = bar.range();
            if range <= 0.0 {
                continue;
            }
            let counter_close = match direction {
                Direction::Buy => bar.is_bearish(),
                Direction::Sell => bar.is_bullish(),
            };
            if counter_close && bar.body() / range > self.config.min_body_ratio {
                last = Some(i);
            }
        }
        last
    }

    /// First bar index after `entry_idx` whose gap to the previous bar
    /// exceeds the ATR-scaled threshold. The final bar of the series is
    /// never a candidate, and bars before the ATR window fills are
    /// skipped.
    pub fn find_nearest_fvg(
        &self,
        bars: &[Candle],
        entry_idx: usize,
        direction: Direction,
    ) -> Option<usize> {
        let atr = rolling_atr(bars, self.config.atr_period);
        let end = bars.len().saturating_sub(1);
        for i in (entry_idx + 1)..end {
            let gap = match direction {
                Direction::Buy => bars[i].low - bars[i - 1].high,
                Direction::Sell => bars[i - 1].low - bars[i].high,
            };
            if let Some(atr_i) = atr[i] {
                if gap > self.config.fvg_gap_threshold * atr_i {
                    return Some(i);
                }
            }
        }
        None
    }

    /// Run the order-block scan on every supplied timeframe. The map's
    /// `BTreeMap` keying fixes the scan order to ascending duration.
    pub fn detect_multi_tf_ob(
        &self,
        data: &BTreeMap<Timeframe, Vec<Candle>>,
        direction: Direction,
    ) -> Vec<ObRecord> {
        let mut results = Vec::new();
        for (&timeframe, bars) in data {
            if let Some(index) = self.find_last_ob(bars, direction) {
                let (kind, price) = match direction {
                    Direction::Buy => (ObKind::Bullish, bars[index].low),
                    Direction::Sell => (ObKind::Bearish, bars[index].high),
                };
                debug!(%timeframe, index, price, "order block detected");
                results.push(ObRecord {
                    timeframe,
                    index,
                    kind,
                    price,
                });
            }
        }
        results
    }

    /// Run the FVG scan on every supplied timeframe, starting each scan
    /// at that timeframe's entry index (0 when absent).
    pub fn detect_multi_tf_fvg(
        &self,
        data: &BTreeMap<Timeframe, Vec<Candle>>,
        entry_indices: &BTreeMap<Timeframe, usize>,
        direction: Direction,
    ) -> Vec<FvgRecord> {
        let mut results = Vec::new();
        for (&timeframe, bars) in data {
            let entry_idx = entry_indices.get(&timeframe).copied().unwrap_or(0);
            if let Some(index) = self.find_nearest_fvg(bars, entry_idx, direction) {
                let (kind, price) = match direction {
                    Direction::Buy => (GapKind::Up, bars[index].high),
                    Direction::Sell => (GapKind::Down, bars[index].low),
                };
                debug!(%timeframe, index, price, "fair value gap detected");
                results.push(FvgRecord {
                    timeframe,
                    index,
                    kind,
                    price,
                });
            }
        }
        results
    }

    /// Select the longest-timeframe OB and FVG as the main signals.
    ///
    /// `max_by_key` keeps the last of equal elements, so if a record list
    /// ever carried duplicate timeframes the later-scanned record wins;
    /// with one scan per `BTreeMap` key that case cannot arise.
    pub fn consolidate(
        &self,
        all_obs: Vec<ObRecord>,
        all_fvgs: Vec<FvgRecord>,
    ) -> ConsolidatedSignals {
        let main_ob = all_obs.iter().max_by_key(|r| r.timeframe).cloned();
        let main_fvg = all_fvgs.iter().max_by_key(|r| r.timeframe).cloned();
        ConsolidatedSignals {
            main_ob,
            main_fvg,
            all_obs,
            all_fvgs,
        }
    }
}
