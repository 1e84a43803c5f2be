use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One market to evaluate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketRequest {
    /// Natural-language prediction market question.
    pub question: String,
    /// On-chain market identifier, passed through to the report.
    #[serde(default)]
    pub market_id: Option<String>,
    /// Capital available for this market's stake.
    pub bankroll: Decimal,
    /// Extra analysis calls after the first one.
    #[serde(default)]
    pub repeat_count: u32,
    /// Decimal odds offered by the market (2.0 = even money). Needed for Kelly sizing.
    #[serde(default)]
    pub decimal_odds: Option<f64>,
}

impl MarketRequest {
    pub fn new(question: impl Into<String>, bankroll: Decimal) -> Self {
        Self {
            question: question.into(),
            market_id: None,
            bankroll,
            repeat_count: 0,
            decimal_odds: None,
        }
    }

    pub fn with_repeat_count(mut self, repeat_count: u32) -> Self {
        self.repeat_count = repeat_count;
        self
    }

    pub fn with_decimal_odds(mut self, odds: f64) -> Self {
        self.decimal_odds = Some(odds);
        self
    }

    pub fn with_market_id(mut self, market_id: impl Into<String>) -> Self {
        self.market_id = Some(market_id.into());
        self
    }
}
