use serde::{Deserialize, Serialize};

/// Probability assumed when an analysis yields nothing usable.
pub const NEUTRAL_PROBABILITY: f64 = 0.5;

/// Confidence attached to a substituted estimate after a failed analysis call.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Clamp a probability-like value into `[0, 1]`.
///
/// Non-finite input (NaN, infinities) carries no information, so it maps to
/// `default` instead of an endpoint.
pub fn clamp_unit(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        default
    }
}

/// One analysis call's probability/confidence view of a market question.
///
/// Fields are private so every instance, including deserialized ones, went
/// through [`Estimate::new`] and holds values in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "EstimateRecord")]
pub struct Estimate {
    probability: f64,
    confidence: f64,
    evidence: String,
    sources_count: u32,
}

#[derive(Deserialize)]
struct EstimateRecord {
    probability: f64,
    confidence: f64,
    #[serde(default)]
    evidence: String,
    #[serde(default)]
    sources_count: u32,
}

impl From<EstimateRecord> for Estimate {
    fn from(r: EstimateRecord) -> Self {
        Estimate::new(r.probability, r.confidence, r.evidence, r.sources_count)
    }
}

impl Estimate {
    pub fn new(
        probability: f64,
        confidence: f64,
        evidence: impl Into<String>,
        sources_count: u32,
    ) -> Self {
        Self {
            probability: clamp_unit(probability, NEUTRAL_PROBABILITY),
            confidence: clamp_unit(confidence, NEUTRAL_PROBABILITY),
            evidence: evidence.into(),
            sources_count,
        }
    }

    /// Neutral estimate substituted when the analysis capability fails outright.
    pub fn fallback(question: &str, cause: &str) -> Self {
        Self::new(
            NEUTRAL_PROBABILITY,
            FALLBACK_CONFIDENCE,
            format!("Fallback analysis for: {question} (analysis unavailable: {cause})"),
            0,
        )
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn evidence(&self) -> &str {
        &self.evidence
    }

    pub fn sources_count(&self) -> u32 {
        self.sources_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_out_of_range_values() {
        let e = Estimate::new(1.5, -0.2, "noisy", 3);
        assert_eq!(e.probability(), 1.0);
        assert_eq!(e.confidence(), 0.0);
        assert_eq!(e.sources_count(), 3);
    }

    #[test]
    fn non_finite_values_become_neutral() {
        let e = Estimate::new(f64::NAN, f64::INFINITY, "", 0);
        assert_eq!(e.probability(), NEUTRAL_PROBABILITY);
        assert_eq!(e.confidence(), NEUTRAL_PROBABILITY);
    }

    #[test]
    fn fallback_is_neutral_and_labelled() {
        let e = Estimate::fallback("Will it rain?", "timed out");
        assert_eq!(e.probability(), 0.5);
        assert_eq!(e.confidence(), 0.3);
        assert!(e.evidence().contains("Fallback analysis for: Will it rain?"));
        assert!(e.evidence().contains("timed out"));
    }

    #[test]
    fn deserialize_goes_through_clamping() {
        let json = r#"{"probability": 2.0, "confidence": 0.9}"#;
        let e: Estimate = serde_json::from_str(json).unwrap();
        assert_eq!(e.probability(), 1.0);
        assert_eq!(e.evidence(), "");
        assert_eq!(e.sources_count(), 0);
    }

    #[test]
    fn roundtrip_estimate() {
        let e = Estimate::new(0.72, 0.8, "Three trials met endpoints", 12);
        let json = serde_json::to_string(&e).unwrap();
        let back: Estimate = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }
}
