//! Hard-veto guardrail layer applied after fusion

use anyhow::Result;
use common::{MarketState, PerformanceSource, SentimentSignal, TradeDecision};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::GuardrailConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsImpact {
    Low,
    Medium,
    High,
}

/// Upcoming scheduled-news context for the symbol, when known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsContext {
    pub impact: NewsImpact,
    /// Signed minutes until (positive) or since (negative) the event
    pub minutes_to_event: i64,
}

/// Final admission control over a provisional `Entry`. Any single veto
/// converts it to a `Block`; checks run in a fixed order and the first
/// match wins. The drawdown check reads a fresh performance snapshot on
/// every call, coupling long-run results back into admission.
#[derive(Debug, Clone, Default)]
pub struct GuardrailGate {
    config: GuardrailConfig,
}

impl GuardrailGate {
    pub fn new(config: GuardrailConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GuardrailConfig {
        &self.config
    }

    /// First matching veto reason, or `None` when trading may proceed.
    pub async fn first_veto(
        &self,
        market: &MarketState,
        sentiment: &SentimentSignal,
        news: Option<&NewsContext>,
        performance: &dyn PerformanceSource,
    ) -> Result<Option<String>> {
        if let Some(news) = news {
            if news.impact == NewsImpact::High
                && news.minutes_to_event.abs() < self.config.news_window_minutes
            {
                return Ok(Some("High-impact news window".to_string()));
            }
        }

        if market.spread > self.config.spread_spike_ratio * market.median_spread {
            return Ok(Some("Spread spike".to_string()));
        }

        if market.volatility > self.config.volatility_spike_ratio * market.median_volatility {
            return Ok(Some("Extreme volatility regime".to_string()));
        }

        if sentiment.score.abs() < self.config.min_sentiment {
            return Ok(Some("Weak sentiment".to_string()));
        }

        let perf = performance.snapshot().await?;
        if perf.max_drawdown > self.config.drawdown_pnl_ratio * perf.pnl_total {
            return Ok(Some("Drawdown risk-off".to_string()));
        }

        Ok(None)
    }

    /// Re-examine a fusion decision; only an `Entry` can be vetoed.
    pub async fn apply(
        &self,
        decision: TradeDecision,
        market: &MarketState,
        sentiment: &SentimentSignal,
        news: Option<&NewsContext>,
        performance: &dyn PerformanceSource,
    ) -> Result<TradeDecision> {
        if !decision.is_entry() {
            return Ok(decision);
        }
        match self.first_veto(market, sentiment, news, performance).await? {
            Some(reason) => {
                warn!(%reason, "guardrail veto");
                Ok(TradeDecision::Block { reason })
            }
            None => Ok(decision),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{Direction, EntryType, PerformanceSnapshot, Urgency};

    struct StubPerformance {
        snapshot: PerformanceSnapshot,
    }

    #[async_trait::async_trait]
    impl PerformanceSource for StubPerformance {
        async fn snapshot(&self) -> Result<PerformanceSnapshot> {
            Ok(self.snapshot.clone())
        }
    }

    fn healthy_performance() -> StubPerformance {
        StubPerformance {
            snapshot: PerformanceSnapshot {
                trades: 10,
                wins: 6,
                losses: 4,
                win_rate: 60.0,
                pnl_total: 100.0,
                max_drawdown: 40.0,
            },
        }
    }

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

    fn sentiment(score: f64) -> SentimentSignal {
        SentimentSignal {
            score,
            urgency: Urgency::High,
            direction: "bullish".to_string(),
        }
    }

    fn entry() -> TradeDecision {
        TradeDecision::Entry {
            entry_type: EntryType::Market,
            direction: Direction::Buy,
            entry: 1.234,
            sl: 1.2,
            tp: 1.3,
            risk_pct: 1.5,
            confidence: 0.84,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn clean_entry_passes_through() {
        let gate = GuardrailGate::default();
        let decision = gate
            .apply(entry(), &market(), &sentiment(0.82), None, &healthy_performance())
            .await
            .unwrap();
        assert!(decision.is_entry());
    }

    #[tokio::test]
    async fn high_impact_news_blocks_first() {
        let gate = GuardrailGate::default();
        // Spread also spikes, but the news veto is evaluated first.
        let mut state = market();
        state.spread = 0.5;
        let news = NewsContext {
            impact: NewsImpact::High,
            minutes_to_event: -5,
        };
        let decision = gate
            .apply(
                entry(),
                &state,
                &sentiment(0.82),
                Some(&news),
                &healthy_performance(),
            )
            .await
            .unwrap();
        assert_eq!(decision.reason(), Some("High-impact news window"));
    }

    #[tokio::test]
    async fn distant_or_low_impact_news_is_ignored() {
        let gate = GuardrailGate::default();
        for news in [
            NewsContext {
                impact: NewsImpact::High,
                minutes_to_event: 30,
            },
            NewsContext {
                impact: NewsImpact::Low,
                minutes_to_event: 2,
            },
        ] {
            let decision = gate
                .apply(
                    entry(),
                    &market(),
                    &sentiment(0.82),
                    Some(&news),
                    &healthy_performance(),
                )
                .await
                .unwrap();
            assert!(decision.is_entry());
        }
    }

    #[tokio::test]
    async fn spread_spike_blocks() {
        let gate = GuardrailGate::default();
        let mut state = market();
        state.spread = 0.2;
        let decision = gate
            .apply(entry(), &state, &sentiment(0.82), None, &healthy_performance())
            .await
            .unwrap();
        assert_eq!(decision.reason(), Some("Spread spike"));
    }

    #[tokio::test]
    async fn volatility_regime_blocks() {
        let gate = GuardrailGate::default();
        let mut state = market();
        state.volatility = 0.2;
        let decision = gate
            .apply(entry(), &state, &sentiment(0.82), None, &healthy_performance())
            .await
            .unwrap();
        assert_eq!(decision.reason(), Some("Extreme volatility regime"));
    }

    #[tokio::test]
    async fn weak_sentiment_is_rechecked_after_fusion() {
        let gate = GuardrailGate::default();
        let decision = gate
            .apply(entry(), &market(), &sentiment(0.5), None, &healthy_performance())
            .await
            .unwrap();
        assert_eq!(decision.reason(), Some("Weak sentiment"));
    }

    #[tokio::test]
    async fn drawdown_risk_off_blocks() {
        let gate = GuardrailGate::default();
        let drawn_down = StubPerformance {
            snapshot: PerformanceSnapshot {
                trades: 20,
                wins: 5,
                losses: 15,
                win_rate: 25.0,
                pnl_total: 10.0,
                max_drawdown: 50.0,
            },
        };
        let decision = gate
            .apply(entry(), &market(), &sentiment(0.82), None, &drawn_down)
            .await
            .unwrap();
        assert_eq!(decision.reason(), Some("Drawdown risk-off"));
    }

    #[tokio::test]
    async fn non_entry_decisions_pass_untouched() {
        let gate = GuardrailGate::default();
        let blocked = TradeDecision::Block {
            reason: "Spread too high".to_string(),
        };
        // A market state that would trip every veto must not matter.
        let mut state = market();
        state.spread = 1.0;
        let decision = gate
            .apply(blocked, &state, &sentiment(0.1), None, &healthy_performance())
            .await
            .unwrap();
        assert_eq!(decision.reason(), Some("Spread too high"));
        assert!(matches!(decision, TradeDecision::Block { .. }));
    }
}
