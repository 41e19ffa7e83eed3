//! Fusion decision engine: blockers, bias confirmation, confidence and
//! risk tiering

use chrono::Utc;
use common::{
    BiasChecks, Direction, EntryType, InputError, MarketState, SentimentSignal, StructureContext,
    StructureKind, TradeDecision, Urgency,
};
use technical_analysis::ResolvedLevels;
use tracing::{debug, info};

use crate::config::FusionConfig;

/// Fuses one cycle's sentiment, forecast, structural bias and market
/// snapshot into a terminal `TradeDecision`. Stateless between cycles.
#[derive(Debug, Clone, Default)]
pub struct FusionEngine {
    config: FusionConfig,
}

fn same_sign(a: f64, b: f64) -> bool {
    (a > 0.0 && b > 0.0) || (a < 0.0 && b < 0.0)
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Weighted confidence blend over the three signal legs.
    pub fn confidence(&self, sentiment_score: f64, forecast: f64, structure_score: f64) -> f64 {
        let w = &self.config.weights;
        w.sentiment * sentiment_score.abs()
            + w.forecast * forecast.abs()
            + w.structure * structure_score
    }

    /// Risk percent for a confidence level, or `None` below the entry
    /// floor. Step function with breakpoints at the configured tiers.
    pub fn risk_tier(&self, confidence: f64) -> Option<f64> {
        let tiers = &self.config.risk;
        if confidence >= tiers.high_confidence {
            Some(tiers.max.min(tiers.base * 1.5))
        } else if confidence >= tiers.min_confidence {
            Some(tiers.min.max(tiers.base * 0.75))
        } else {
            None
        }
    }

    pub fn fuse(
        &self,
        sentiment: &SentimentSignal,
        forecast: f64,
        structure: &StructureContext,
        market: &MarketState,
        levels: Option<&ResolvedLevels>,
    ) -> Result<TradeDecision, InputError> {
        market.validate()?;
        sentiment.validate()?;
        structure.validate()?;
        if !forecast.is_finite() {
            return Err(InputError::NonFinite {
                field: "forecast".to_string(),
            });
        }
        if !(-1.0..=1.0).contains(&forecast) {
            return Err(InputError::OutOfRange {
                field: "forecast".to_string(),
                value: forecast,
                min: -1.0,
                max: 1.0,
            });
        }

        let blockers = &self.config.blockers;
        if market.spread > blockers.max_spread_ratio * market.median_spread {
            return Ok(TradeDecision::Block {
                reason: "Spread too high".to_string(),
            });
        }
        if market.data_age > blockers.max_data_age {
            return Ok(TradeDecision::Block {
                reason: "Market data too stale".to_string(),
            });
        }
        if market.volatility > blockers.max_volatility_ratio * market.median_volatility {
            return Ok(TradeDecision::Block {
                reason: "Volatility spike".to_string(),
            });
        }

        let checks = BiasChecks {
            sentiment_ok: sentiment.score.abs() >= self.config.sentiment_threshold
                && sentiment.urgency >= self.config.min_urgency,
            forecast_ok: forecast.abs() >= self.config.forecast_min_agreement
                && same_sign(forecast, sentiment.score),
            structure_ok: structure.confirmed,
        };
        if !checks.all() {
            debug!(?checks, "bias not confirmed");
            return Ok(TradeDecision::NoEntry {
                reason: "Bias not confirmed".to_string(),
                checks,
            });
        }

        let structure_score = 1.0;
        let confidence = self.confidence(sentiment.score, forecast, structure_score);

        let risk_pct = match self.risk_tier(confidence) {
            Some(risk_pct) => risk_pct,
            None => {
                debug!(confidence, "confidence below entry floor");
                return Ok(TradeDecision::NoEntry {
                    reason: "Confidence too low".to_string(),
                    checks,
                });
            }
        };

        let direction = if sentiment.score > 0.0 {
            Direction::Buy
        } else {
            Direction::Sell
        };
        let entry_type =
            if structure.kind == StructureKind::Breakout && sentiment.urgency == Urgency::High {
                EntryType::Market
            } else {
                EntryType::Limit
            };

        let entry = market.entry;
        let (sl, tp) = match levels {
            Some(levels) => (levels.stop, levels.target),
            None => {
                // No bar context: size off the structural buffer plus
                // current volatility as the ATR proxy.
                let buffer = structure.sl_buffer + market.volatility;
                let fallback = &self.config.fallback;
                match direction {
                    Direction::Buy => (
                        entry - fallback.sl_mult * buffer,
                        entry + fallback.tp_mult * buffer,
                    ),
                    Direction::Sell => (
                        entry + fallback.sl_mult * buffer,
                        entry - fallback.tp_mult * buffer,
                    ),
                }
            }
        };

        info!(
            %direction,
            ?entry_type,
            confidence,
            risk_pct,
            "trade intent produced"
        );

        Ok(TradeDecision::Entry {
            entry_type,
            direction,
            entry,
            sl,
            tp,
            risk_pct,
            confidence,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market() -> MarketState {
        MarketState {
            entry: 1.234,
            bid: 1.233,
            ask: 1.235,
            spread: 0.12,
            median_spread: 0.1,
            volatility: 0.05,
            median_volatility: 0.04,
            data_age: 4,
        }
    }

    fn sentiment(score: f64, urgency: Urgency) -> SentimentSignal {
        let direction = if score >= 0.0 { "bullish" } else { "bearish" };
        SentimentSignal {
            score,
            urgency,
            direction: direction.to_string(),
        }
    }

    fn structure(confirmed: bool, kind: StructureKind) -> StructureContext {
        StructureContext {
            confirmed,
            kind,
            sl_buffer: 0.3,
        }
    }

    fn engine() -> FusionEngine {
        FusionEngine::default()
    }

    #[test]
    fn end_to_end_entry_scenario() {
        let decision = engine()
            .fuse(
                &sentiment(0.82, Urgency::High),
                0.7,
                &structure(true, StructureKind::Breakout),
                &market(),
                None,
            )
            .unwrap();

        match decision {
            TradeDecision::Entry {
                entry_type,
                direction,
                entry,
                confidence,
                risk_pct,
                ..
            } => {
                assert_eq!(entry_type, EntryType::Market);
                assert_eq!(direction, Direction::Buy);
                assert_eq!(entry, 1.234);
                // 0.4 * 0.82 + 0.3 * 0.7 + 0.3 * 1.0
                assert!((confidence - 0.838).abs() < 1e-9);
                assert_eq!(risk_pct, 1.5);
            }
            other => panic!("expected Entry, got {:?}", other),
        }
    }

    #[test]
    fn spread_blocker_fires_regardless_of_other_inputs() {
        let mut state = market();
        state.spread = 0.2;
        let decision = engine()
            .fuse(
                &sentiment(0.82, Urgency::High),
                0.7,
                &structure(true, StructureKind::Breakout),
                &state,
                None,
            )
            .unwrap();
        assert_eq!(decision.reason(), Some("Spread too high"));
        assert!(matches!(decision, TradeDecision::Block { .. }));
    }

    #[test]
    fn stale_data_blocks() {
        let mut state = market();
        state.data_age = 21;
        let decision = engine()
            .fuse(
                &sentiment(0.82, Urgency::High),
                0.7,
                &structure(true, StructureKind::Breakout),
                &state,
                None,
            )
            .unwrap();
        assert_eq!(decision.reason(), Some("Market data too stale"));
    }

    #[test]
    fn volatility_spike_blocks() {
        let mut state = market();
        state.volatility = 0.2;
        let decision = engine()
            .fuse(
                &sentiment(0.82, Urgency::High),
                0.7,
                &structure(true, StructureKind::Breakout),
                &state,
                None,
            )
            .unwrap();
        assert_eq!(decision.reason(), Some("Volatility spike"));
    }

    #[test]
    fn each_bias_check_reports_independently() {
        let engine = engine();
        let confirmed = structure(true, StructureKind::Zone);

        // Weak sentiment score only.
        let decision = engine
            .fuse(&sentiment(0.5, Urgency::High), 0.7, &confirmed, &market(), None)
            .unwrap();
        match decision {
            TradeDecision::NoEntry { checks, .. } => {
                assert!(!checks.sentiment_ok);
                assert!(checks.forecast_ok);
                assert!(checks.structure_ok);
            }
            other => panic!("expected NoEntry, got {:?}", other),
        }

        // Low urgency fails the sentiment leg even with a strong score.
        let decision = engine
            .fuse(&sentiment(0.82, Urgency::Low), 0.7, &confirmed, &market(), None)
            .unwrap();
        match decision {
            TradeDecision::NoEntry { checks, .. } => assert!(!checks.sentiment_ok),
            other => panic!("expected NoEntry, got {:?}", other),
        }

        // Forecast disagreeing in sign fails the forecast leg only.
        let decision = engine
            .fuse(&sentiment(0.82, Urgency::High), -0.7, &confirmed, &market(), None)
            .unwrap();
        match decision {
            TradeDecision::NoEntry { checks, .. } => {
                assert!(checks.sentiment_ok);
                assert!(!checks.forecast_ok);
                assert!(checks.structure_ok);
            }
            other => panic!("expected NoEntry, got {:?}", other),
        }

        // Weak forecast magnitude fails the forecast leg.
        let decision = engine
            .fuse(&sentiment(0.82, Urgency::High), 0.4, &confirmed, &market(), None)
            .unwrap();
        match decision {
            TradeDecision::NoEntry { checks, .. } => assert!(!checks.forecast_ok),
            other => panic!("expected NoEntry, got {:?}", other),
        }

        // Unconfirmed structure fails the structure leg only.
        let decision = engine
            .fuse(
                &sentiment(0.82, Urgency::High),
                0.7,
                &structure(false, StructureKind::Zone),
                &market(),
                None,
            )
            .unwrap();
        match decision {
            TradeDecision::NoEntry { checks, reason } => {
                assert!(checks.sentiment_ok);
                assert!(checks.forecast_ok);
                assert!(!checks.structure_ok);
                assert_eq!(reason, "Bias not confirmed");
            }
            other => panic!("expected NoEntry, got {:?}", other),
        }
    }

    #[test]
    fn confidence_is_monotone_in_each_leg() {
        let engine = engine();
        assert!(engine.confidence(0.9, 0.7, 1.0) > engine.confidence(0.7, 0.7, 1.0));
        assert!(engine.confidence(0.8, 0.9, 1.0) > engine.confidence(0.8, 0.6, 1.0));
        assert!(engine.confidence(0.8, 0.7, 1.0) > engine.confidence(0.8, 0.7, 0.0));
        // Magnitude, not sign, drives the blend.
        assert_eq!(
            engine.confidence(-0.8, -0.7, 1.0),
            engine.confidence(0.8, 0.7, 1.0)
        );
    }

    #[test]
    fn risk_tier_boundaries_are_exact() {
        let engine = engine();
        assert_eq!(engine.risk_tier(0.59), None);
        assert_eq!(engine.risk_tier(0.60), Some(0.75));
        assert_eq!(engine.risk_tier(0.79), Some(0.75));
        assert_eq!(engine.risk_tier(0.80), Some(1.5));
        assert_eq!(engine.risk_tier(0.81), Some(1.5));
    }

    #[test]
    fn low_confidence_yields_no_entry_under_permissive_thresholds() {
        let mut config = FusionConfig::default();
        config.sentiment_threshold = 0.1;
        config.forecast_min_agreement = 0.1;
        let engine = FusionEngine::new(config);

        let decision = engine
            .fuse(
                &sentiment(0.2, Urgency::High),
                0.15,
                &structure(true, StructureKind::Zone),
                &market(),
                None,
            )
            .unwrap();
        match decision {
            TradeDecision::NoEntry { reason, checks } => {
                assert_eq!(reason, "Confidence too low");
                assert!(checks.all());
            }
            other => panic!("expected NoEntry, got {:?}", other),
        }
    }

    #[test]
    fn negative_sentiment_sells_with_limit_entry() {
        let decision = engine()
            .fuse(
                &sentiment(-0.9, Urgency::Medium),
                -0.8,
                &structure(true, StructureKind::Zone),
                &market(),
                None,
            )
            .unwrap();
        match decision {
            TradeDecision::Entry {
                direction,
                entry_type,
                sl,
                tp,
                ..
            } => {
                assert_eq!(direction, Direction::Sell);
                assert_eq!(entry_type, EntryType::Limit);
                // buffer = 0.3 + 0.05; sell stops above, targets below
                assert!((sl - (1.234 + 1.5 * 0.35)).abs() < 1e-9);
                assert!((tp - (1.234 - 2.5 * 0.35)).abs() < 1e-9);
            }
            other => panic!("expected Entry, got {:?}", other),
        }
    }

    #[test]
    fn breakout_without_high_urgency_uses_limit_entry() {
        let decision = engine()
            .fuse(
                &sentiment(0.82, Urgency::Medium),
                0.7,
                &structure(true, StructureKind::Breakout),
                &market(),
                None,
            )
            .unwrap();
        match decision {
            TradeDecision::Entry { entry_type, .. } => assert_eq!(entry_type, EntryType::Limit),
            other => panic!("expected Entry, got {:?}", other),
        }
    }

    #[test]
    fn resolved_levels_override_fallback_sizing() {
        use technical_analysis::{ContextSignals, LevelBasis, ResolvedLevels, StructureState};

        let levels = ResolvedLevels {
            stop: 1.2,
            target: 1.31,
            basis: LevelBasis::OrderBlock,
            context: ContextSignals {
                structure: StructureState::undetected(),
                signals: technical_analysis::ObFvgDetector::default().consolidate(vec![], vec![]),
            },
        };
        let decision = engine()
            .fuse(
                &sentiment(0.82, Urgency::High),
                0.7,
                &structure(true, StructureKind::Breakout),
                &market(),
                Some(&levels),
            )
            .unwrap();
        match decision {
            TradeDecision::Entry { sl, tp, .. } => {
                assert_eq!(sl, 1.2);
                assert_eq!(tp, 1.31);
            }
            other => panic!("expected Entry, got {:?}", other),
        }
    }

    #[test]
    fn malformed_market_state_is_an_error_not_a_veto() {
        let mut state = market();
        state.median_spread = f64::NAN;
        let result = engine().fuse(
            &sentiment(0.82, Urgency::High),
            0.7,
            &structure(true, StructureKind::Breakout),
            &state,
            None,
        );
        assert!(matches!(result, Err(InputError::NonFinite { .. })));
    }

    #[test]
    fn out_of_range_forecast_is_rejected() {
        let result = engine().fuse(
            &sentiment(0.82, Urgency::High),
            1.4,
            &structure(true, StructureKind::Breakout),
            &market(),
            None,
        );
        assert!(matches!(result, Err(InputError::OutOfRange { .. })));
    }
}
