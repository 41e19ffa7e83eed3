use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Direction;

/// How the entry order should be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Market,
    Limit,
}

/// Outcome of the three bias-confirmation checks, reported verbatim on a
/// `NoEntry` so callers can see which leg failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasChecks {
    pub sentiment_ok: bool,
    pub forecast_ok: bool,
    pub structure_ok: bool,
}

impl BiasChecks {
    pub fn all(&self) -> bool {
        self.sentiment_ok && self.forecast_ok && self.structure_ok
    }
}

/// Terminal result of one decision cycle. Exactly one variant, immutable
/// once produced; vetoes are values here, never errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum TradeDecision {
    Block {
        reason: String,
    },
    NoEntry {
        reason: String,
        checks: BiasChecks,
    },
    Entry {
        entry_type: EntryType,
        direction: Direction,
        entry: f64,
        sl: f64,
        tp: f64,
        risk_pct: f64,
        confidence: f64,
        timestamp: DateTime<Utc>,
    },
}

impl TradeDecision {
    pub fn is_entry(&self) -> bool {
        matches!(self, TradeDecision::Entry { .. })
    }

    /// Veto reason, if this decision carries one.
    pub fn reason(&self) -> Option<&str> {
        match self {
            TradeDecision::Block { reason } | TradeDecision::NoEntry { reason, .. } => {
                Some(reason.as_str())
            }
            TradeDecision::Entry { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_serializes_with_tag() {
        let decision = TradeDecision::Block {
            reason: "Spread too high".to_string(),
        };
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["decision"], "block");
        assert_eq!(json["reason"], "Spread too high");
    }

    #[test]
    fn bias_checks_all_requires_every_leg() {
        let checks = BiasChecks {
            sentiment_ok: true,
            forecast_ok: false,
            structure_ok: true,
        };
        assert!(!checks.all());
    }
}
