use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a recommended position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    BuyYes,
    BuyNo,
}

impl TradeAction {
    /// YES only when the probability strictly exceeds one half.
    pub fn from_probability(probability: f64) -> Self {
        if probability > 0.5 {
            TradeAction::BuyYes
        } else {
            TradeAction::BuyNo
        }
    }
}

/// Which stake-sizing policy produced an amount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SizingPolicy {
    /// Stake scales with distance from 0.5 and analysis confidence.
    #[default]
    Confidence,
    /// Quarter-Kelly on the market's decimal odds.
    Kelly,
}

/// A sized, directional stake recommendation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeProposal {
    pub action: TradeAction,
    /// Stake in bankroll units, 2 dp, never above the hard cap.
    pub amount: Decimal,
    /// 0.0 to 1.0, carried from the estimate or judgment sized.
    pub confidence: f64,
    pub reasoning: String,
    pub policy: SizingPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn action_from_probability() {
        assert_eq!(TradeAction::from_probability(0.51), TradeAction::BuyYes);
        assert_eq!(TradeAction::from_probability(0.5), TradeAction::BuyNo);
        assert_eq!(TradeAction::from_probability(0.1), TradeAction::BuyNo);
    }

    #[test]
    fn action_serialization() {
        assert_eq!(
            serde_json::to_string(&TradeAction::BuyYes).unwrap(),
            "\"BUY_YES\""
        );
        assert_eq!(
            serde_json::to_string(&TradeAction::BuyNo).unwrap(),
            "\"BUY_NO\""
        );
    }

    #[test]
    fn roundtrip_trade_proposal() {
        let proposal = TradeProposal {
            action: TradeAction::BuyYes,
            amount: dec!(42.50),
            confidence: 0.85,
            reasoning: "Strong evidence".to_string(),
            policy: SizingPolicy::Kelly,
        };
        let json = serde_json::to_string(&proposal).unwrap();
        assert!(json.contains("\"amount\":\"42.50\""));
        let back: TradeProposal = serde_json::from_str(&json).unwrap();
        assert_eq!(proposal, back);
    }
}
