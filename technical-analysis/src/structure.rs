//! Swing-based market structure detection

use common::Candle;
use serde::{Deserialize, Serialize};

/// Confidence assigned whenever a swing pattern fires.
pub const STRUCTURE_CONFIDENCE: f64 = 0.6;

/// Minimum bars required before detection runs.
const MIN_BARS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructurePattern {
    Undetected,
    SwingHigh,
    SwingLow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureTag {
    PotentialBreakOfStructure,
    PotentialChangeOfCharacter,
}

/// Per-timeframe structure read-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureState {
    pub pattern: StructurePattern,
    pub tags: Vec<StructureTag>,
    pub confidence: Option<f64>,
}

impl StructureState {
    pub fn undetected() -> Self {
        Self {
            pattern: StructurePattern::Undetected,
            tags: Vec::new(),
            confidence: None,
        }
    }
}

/// Compare the latest bar's high/low against the prior two bars.
///
/// A strictly higher high marks a swing high with a potential break of
/// structure; a strictly lower low marks a swing low with a potential
/// change of character. When both fire on the same bar the swing-low
/// pattern wins and both tags are kept. Short series never error.
pub fn detect_market_structure(bars: &[Candle]) -> StructureState {
    if bars.len() < MIN_BARS {
        return StructureState::undetected();
    }

    let mut state = StructureState::undetected();
    let n = bars.len();
    let last = &bars[n - 1];

    if last.high > bars[n - 2].high && last.high > bars[n - 3].high {
        state.pattern = StructurePattern::SwingHigh;
        state.tags.push(StructureTag::PotentialBreakOfStructure);
        state.confidence = Some(STRUCTURE_CONFIDENCE);
    }

    if last.low < bars[n - 2].low && last.low < bars[n - 3].low {
        state.pattern = StructurePattern::SwingLow;
        state.tags.push(StructureTag::PotentialChangeOfCharacter);
        state.confidence = Some(STRUCTURE_CONFIDENCE);
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            open,
            high,
            low,
            close,
        }
    }

    fn flat(n: usize) -> Vec<Candle> {
        (0..n).map(|_| bar(1.0, 1.5, 0.5, 1.2)).collect()
    }

    #[test]
    fn short_series_is_undetected() {
        let bars = flat(3);
        let state = detect_market_structure(&bars);
        assert_eq!(state.pattern, StructurePattern::Undetected);
        assert!(state.tags.is_empty());
        assert!(state.confidence.is_none());
    }

    #[test]
    fn higher_high_marks_swing_high() {
        let mut bars = flat(4);
        bars[3] = bar(1.0, 2.0, 0.9, 1.8);
        let state = detect_market_structure(&bars);
        assert_eq!(state.pattern, StructurePattern::SwingHigh);
        assert_eq!(state.tags, vec![StructureTag::PotentialBreakOfStructure]);
        assert_eq!(state.confidence, Some(STRUCTURE_CONFIDENCE));
    }

    #[test]
    fn lower_low_marks_swing_low() {
        let mut bars = flat(4);
        bars[3] = bar(1.0, 1.4, 0.2, 0.4);
        let state = detect_market_structure(&bars);
        assert_eq!(state.pattern, StructurePattern::SwingLow);
        assert_eq!(state.tags, vec![StructureTag::PotentialChangeOfCharacter]);
    }

    #[test]
    fn wide_bar_keeps_both_tags_with_swing_low_pattern() {
        let mut bars = flat(4);
        bars[3] = bar(1.0, 2.0, 0.2, 1.0);
        let state = detect_market_structure(&bars);
        assert_eq!(state.pattern, StructurePattern::SwingLow);
        assert_eq!(
            state.tags,
            vec![
                StructureTag::PotentialBreakOfStructure,
                StructureTag::PotentialChangeOfCharacter
            ]
        );
    }

    #[test]
    fn equal_high_is_not_a_swing() {
        let bars = flat(5);
        let state = detect_market_structure(&bars);
        assert_eq!(state.pattern, StructurePattern::Undetected);
    }
}
