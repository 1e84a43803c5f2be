use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::estimate::{clamp_unit, NEUTRAL_PROBABILITY};

/// Sample standard deviation below which estimates are in high agreement.
pub const HIGH_AGREEMENT_STDEV: f64 = 0.10;

/// Sample standard deviation below which estimates are in medium agreement.
pub const MEDIUM_AGREEMENT_STDEV: f64 = 0.20;

/// How tightly a set of estimates' probabilities cluster.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgreementLevel {
    /// No estimates were available.
    None,
    /// Exactly one estimate; spread is undefined.
    Single,
    High,
    Medium,
    Low,
}

impl AgreementLevel {
    /// Classify from estimate count and the sample standard deviation of their
    /// probabilities. `stdev` is ignored when `count < 2`.
    pub fn classify(count: usize, stdev: f64) -> Self {
        match count {
            0 => AgreementLevel::None,
            1 => AgreementLevel::Single,
            _ if stdev < HIGH_AGREEMENT_STDEV => AgreementLevel::High,
            _ if stdev < MEDIUM_AGREEMENT_STDEV => AgreementLevel::Medium,
            _ => AgreementLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementLevel::None => "none",
            AgreementLevel::Single => "single",
            AgreementLevel::High => "high",
            AgreementLevel::Medium => "medium",
            AgreementLevel::Low => "low",
        }
    }
}

impl fmt::Display for AgreementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgreementLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(AgreementLevel::None),
            "single" => Ok(AgreementLevel::Single),
            "high" => Ok(AgreementLevel::High),
            "medium" => Ok(AgreementLevel::Medium),
            "low" => Ok(AgreementLevel::Low),
            other => Err(format!("unknown agreement level: {other}")),
        }
    }
}

/// Where a judgment's consensus values came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusMethod {
    /// Local confidence-weighted aggregation.
    Weighted,
    /// Values supplied by the external judge capability.
    Judge,
    /// Canonical judgment for an empty estimate list.
    NoData,
}

/// Consensus over a list of estimates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "JudgmentRecord")]
pub struct Judgment {
    consensus_probability: f64,
    consensus_confidence: f64,
    agreement_level: AgreementLevel,
    agent_count: usize,
    reasoning: String,
    method: ConsensusMethod,
}

#[derive(Deserialize)]
struct JudgmentRecord {
    consensus_probability: f64,
    consensus_confidence: f64,
    agreement_level: AgreementLevel,
    agent_count: usize,
    #[serde(default)]
    reasoning: String,
    method: ConsensusMethod,
}

impl From<JudgmentRecord> for Judgment {
    fn from(r: JudgmentRecord) -> Self {
        Judgment::new(
            r.consensus_probability,
            r.consensus_confidence,
            r.agreement_level,
            r.agent_count,
            r.reasoning,
            r.method,
        )
    }
}

impl Judgment {
    pub fn new(
        consensus_probability: f64,
        consensus_confidence: f64,
        agreement_level: AgreementLevel,
        agent_count: usize,
        reasoning: impl Into<String>,
        method: ConsensusMethod,
    ) -> Self {
        Self {
            consensus_probability: clamp_unit(consensus_probability, NEUTRAL_PROBABILITY),
            consensus_confidence: clamp_unit(consensus_confidence, 0.0),
            agreement_level,
            agent_count,
            reasoning: reasoning.into(),
            method,
        }
    }

    /// The judgment used when there is nothing to aggregate.
    pub fn no_data() -> Self {
        Self::new(
            NEUTRAL_PROBABILITY,
            0.0,
            AgreementLevel::None,
            0,
            "No analyses provided",
            ConsensusMethod::NoData,
        )
    }

    pub fn consensus_probability(&self) -> f64 {
        self.consensus_probability
    }

    pub fn consensus_confidence(&self) -> f64 {
        self.consensus_confidence
    }

    pub fn agreement_level(&self) -> AgreementLevel {
        self.agreement_level
    }

    pub fn agent_count(&self) -> usize {
        self.agent_count
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn method(&self) -> ConsensusMethod {
        self.method
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_boundaries() {
        assert_eq!(AgreementLevel::classify(0, 0.0), AgreementLevel::None);
        assert_eq!(AgreementLevel::classify(1, 0.9), AgreementLevel::Single);
        assert_eq!(AgreementLevel::classify(2, 0.0), AgreementLevel::High);
        assert_eq!(AgreementLevel::classify(2, 0.0999), AgreementLevel::High);
        assert_eq!(AgreementLevel::classify(2, 0.10), AgreementLevel::Medium);
        assert_eq!(AgreementLevel::classify(3, 0.1999), AgreementLevel::Medium);
        assert_eq!(AgreementLevel::classify(3, 0.20), AgreementLevel::Low);
    }

    #[test]
    fn agreement_level_string_forms() {
        assert_eq!(
            serde_json::to_string(&AgreementLevel::High).unwrap(),
            "\"high\""
        );
        assert_eq!("MEDIUM".parse::<AgreementLevel>(), Ok(AgreementLevel::Medium));
        assert!("unanimous".parse::<AgreementLevel>().is_err());
        assert_eq!(AgreementLevel::Low.to_string(), "low");
    }

    #[test]
    fn no_data_judgment() {
        let j = Judgment::no_data();
        assert_eq!(j.consensus_probability(), 0.5);
        assert_eq!(j.consensus_confidence(), 0.0);
        assert_eq!(j.agreement_level(), AgreementLevel::None);
        assert_eq!(j.agent_count(), 0);
        assert_eq!(j.method(), ConsensusMethod::NoData);
    }

    #[test]
    fn new_clamps_consensus_values() {
        let j = Judgment::new(
            1.4,
            -1.0,
            AgreementLevel::High,
            2,
            "judge overshoot",
            ConsensusMethod::Judge,
        );
        assert_eq!(j.consensus_probability(), 1.0);
        assert_eq!(j.consensus_confidence(), 0.0);
    }

    #[test]
    fn roundtrip_judgment() {
        let j = Judgment::new(
            0.706,
            0.8,
            AgreementLevel::High,
            3,
            "Weighted average of 3 analyses",
            ConsensusMethod::Weighted,
        );
        let json = serde_json::to_string(&j).unwrap();
        assert!(json.contains("\"method\":\"weighted\""));
        let back: Judgment = serde_json::from_str(&json).unwrap();
        assert_eq!(j, back);
    }
}
