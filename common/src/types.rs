use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Canonical timeframe labels, totally ordered by bar duration.
///
/// The derived `Ord` is the ordering used everywhere a "longer timeframe"
/// comparison is made; series maps keyed by `Timeframe` iterate ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single OHLC bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => f.write_str("buy"),
            Direction::Sell => f.write_str("sell"),
        }
    }
}

/// Sentiment urgency; the derived `Ord` is the rank low < medium < high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

/// News/sentiment reading for one decision cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentSignal {
    /// -1.0 (strongly bearish) to 1.0 (strongly bullish)
    pub score: f64,
    pub urgency: Urgency,
    /// Free-form label from the upstream feed, e.g. "bullish"
    pub direction: String,
}

impl SentimentSignal {
    pub fn validate(&self) -> Result<(), InputError> {
        if !self.score.is_finite() {
            return Err(InputError::NonFinite {
                field: "sentiment.score".to_string(),
            });
        }
        if !(-1.0..=1.0).contains(&self.score) {
            return Err(InputError::OutOfRange {
                field: "sentiment.score".to_string(),
                value: self.score,
                min: -1.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

/// Setup classification carried by the structural context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureKind {
    Breakout,
    Zone,
}

/// Structural bias for one symbol and cycle, supplied by upstream analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureContext {
    pub confirmed: bool,
    pub kind: StructureKind,
    /// Distance between entry and the invalidation level, >= 0
    pub sl_buffer: f64,
}

impl StructureContext {
    pub fn validate(&self) -> Result<(), InputError> {
        if !self.sl_buffer.is_finite() {
            return Err(InputError::NonFinite {
                field: "structure.sl_buffer".to_string(),
            });
        }
        if self.sl_buffer < 0.0 {
            return Err(InputError::Negative {
                field: "structure.sl_buffer".to_string(),
                value: self.sl_buffer,
            });
        }
        Ok(())
    }
}

/// Live quote snapshot for one decision cycle. Produced fresh by the
/// upstream feed and discarded after the decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketState {
    pub entry: f64,
    pub bid: f64,
    pub ask: f64,
    pub spread: f64,
    pub median_spread: f64,
    pub volatility: f64,
    pub median_volatility: f64,
    /// Staleness of the snapshot, in feed time units
    pub data_age: u64,
}

impl MarketState {
    /// Fail fast on malformed feed data instead of silently defaulting.
    pub fn validate(&self) -> Result<(), InputError> {
        let fields = [
            ("market.entry", self.entry),
            ("market.bid", self.bid),
            ("market.ask", self.ask),
            ("market.spread", self.spread),
            ("market.median_spread", self.median_spread),
            ("market.volatility", self.volatility),
            ("market.median_volatility", self.median_volatility),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(InputError::NonFinite {
                    field: name.to_string(),
                });
            }
        }
        for (name, value) in [
            ("market.spread", self.spread),
            ("market.median_spread", self.median_spread),
            ("market.volatility", self.volatility),
            ("market.median_volatility", self.median_volatility),
        ] {
            if value < 0.0 {
                return Err(InputError::Negative {
                    field: name.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_order_follows_duration() {
        assert!(Timeframe::M1 < Timeframe::M5);
        assert!(Timeframe::M15 < Timeframe::H1);
        assert!(Timeframe::H4 < Timeframe::D1);
        assert_eq!(
            [Timeframe::H1, Timeframe::M5, Timeframe::D1]
                .iter()
                .max()
                .copied(),
            Some(Timeframe::D1)
        );
    }

    #[test]
    fn urgency_rank_matches_ordering() {
        assert_eq!(Urgency::Low.rank(), 0);
        assert_eq!(Urgency::Medium.rank(), 1);
        assert_eq!(Urgency::High.rank(), 2);
        assert!(Urgency::High >= Urgency::Medium);
        assert!(Urgency::Low < Urgency::Medium);
    }

    #[test]
    fn market_state_validation_rejects_bad_fields() {
        let mut market = MarketState {
            entry: 1.234,
            bid: 1.233,
            ask: 1.235,
            spread: 0.002,
            median_spread: 0.002,
            volatility: 0.05,
            median_volatility: 0.04,
            data_age: 3,
        };
        assert!(market.validate().is_ok());

        market.spread = -0.1;
        assert!(matches!(
            market.validate(),
            Err(InputError::Negative { .. })
        ));

        market.spread = f64::NAN;
        assert!(matches!(
            market.validate(),
            Err(InputError::NonFinite { .. })
        ));
    }

    #[test]
    fn sentiment_score_range_is_enforced() {
        let sentiment = SentimentSignal {
            score: 1.2,
            urgency: Urgency::High,
            direction: "bullish".to_string(),
        };
        assert!(matches!(
            sentiment.validate(),
            Err(InputError::OutOfRange { .. })
        ));
    }
}
