//! ATR-based dynamic stop/target sizing

use common::{Candle, Direction};
use serde::{Deserialize, Serialize};

/// Rolling mean of the per-bar true range.
///
/// True range of bar 0 is its high-low span; afterwards it is
/// max(high-low, |high-prev_close|, |low-prev_close|). The mean is `None`
/// until a full `period` of true ranges is available, mirroring a rolling
/// window that yields nothing before it fills.
pub fn rolling_atr(bars: &[Candle], period: usize) -> Vec<Option<f64>> {
    assert!(period > 0, "ATR period must be positive");

    let mut true_ranges = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let tr = if i == 0 {
            bar.range()
        } else {
            let prev_close = bars[i - 1].close;
            bar.range()
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs())
        };
        true_ranges.push(tr);
    }

    let mut atr = vec![None; bars.len()];
    let mut window_sum = 0.0;
    for i in 0..bars.len() {
        window_sum += true_ranges[i];
        if i >= period {
            window_sum -= true_ranges[i - period];
        }
        if i + 1 >= period {
            atr[i] = Some(window_sum / period as f64);
        }
    }
    atr
}

/// ATR value at a single bar index, if the window has filled by then.
pub fn atr_at(bars: &[Candle], period: usize, index: usize) -> Option<f64> {
    if index >= bars.len() {
        return None;
    }
    rolling_atr(bars, period)[index]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    pub atr_period: usize,
    /// Stop distance in ATR multiples
    pub sl_mult: f64,
    /// Target distance in ATR multiples
    pub tp_mult: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            sl_mult: 1.5,
            tp_mult: 2.5,
        }
    }
}

/// Pure ATR stop/target placement, the fallback when no structural level
/// is available.
#[derive(Debug, Clone, Default)]
pub struct DynamicSizing {
    config: SizingConfig,
}

impl DynamicSizing {
    pub fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    /// (stop, target) around the close of the entry bar, or `None` when
    /// the series is too short for the ATR window.
    pub fn sl_tp(
        &self,
        bars: &[Candle],
        entry_idx: usize,
        direction: Direction,
    ) -> Option<(f64, f64)> {
        let atr = atr_at(bars, self.config.atr_period, entry_idx)?;
        let entry = bars[entry_idx].close;
        let (sl, tp) = match direction {
            Direction::Buy => (
                entry - self.config.sl_mult * atr,
                entry + self.config.tp_mult * atr,
            ),
            Direction::Sell => (
                entry + self.config.sl_mult * atr,
                entry - self.config.tp_mult * atr,
            ),
        };
        Some((sl, tp))
    }
}
