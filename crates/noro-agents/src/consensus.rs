use noro_models::{AgreementLevel, ConsensusMethod, Estimate, Judgment};

use crate::parser::{ParseTier, ParsedFields};

/// Confidence-weighted mean of the estimates' probabilities.
///
/// A single estimate is returned as-is. When every confidence is zero the
/// unweighted mean is used instead.
pub fn weighted_probability(estimates: &[Estimate]) -> f64 {
    if let [only] = estimates {
        return only.probability();
    }

    let total_weight: f64 = estimates.iter().map(Estimate::confidence).sum();
    if total_weight > 0.0 {
        estimates
            .iter()
            .map(|e| e.probability() * e.confidence())
            .sum::<f64>()
            / total_weight
    } else {
        mean(estimates.iter().map(Estimate::probability))
    }
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}

/// Sample (n - 1) standard deviation. Zero for fewer than two values.
pub fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values.iter().copied());
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Reduce estimates to a judgment using only local arithmetic.
///
/// Pure and deterministic. An empty slice yields [`Judgment::no_data`].
pub fn aggregate(estimates: &[Estimate]) -> Judgment {
    if estimates.is_empty() {
        return Judgment::no_data();
    }

    let probabilities: Vec<f64> = estimates.iter().map(Estimate::probability).collect();
    let consensus_probability = weighted_probability(estimates);
    // Plain mean: the weighting already rewards confident estimates once.
    let consensus_confidence = mean(estimates.iter().map(Estimate::confidence));
    let stdev = sample_stdev(&probabilities);
    let agreement = AgreementLevel::classify(estimates.len(), stdev);

    let all_unweighted = estimates.len() > 1 && estimates.iter().all(|e| e.confidence() == 0.0);
    let reasoning = match agreement {
        AgreementLevel::Single => format!(
            "Consensus from a single analysis: probability {:.2}%, confidence {:.2}%.",
            consensus_probability * 100.0,
            consensus_confidence * 100.0
        ),
        _ => format!(
            "{} of {} analyses: probability {:.2}%, confidence {:.2}%. \
             Agreement: {agreement} (stdev {stdev:.3}).",
            if all_unweighted {
                "Unweighted mean (all confidences zero)"
            } else {
                "Confidence-weighted average"
            },
            estimates.len(),
            consensus_probability * 100.0,
            consensus_confidence * 100.0,
        ),
    };

    Judgment::new(
        consensus_probability,
        consensus_confidence,
        agreement,
        estimates.len(),
        reasoning,
        ConsensusMethod::Weighted,
    )
}

/// Overlay a parsed judge response on the local judgment.
///
/// Returns `None` when the response carried nothing recognisable, in which
/// case the local judgment stands. Numeric fields the judge left out keep
/// their local values. `agent_count` always comes from the local judgment,
/// and an agreement level outside `high|medium|low` is ignored.
pub fn apply_judge_verdict(local: &Judgment, verdict: &ParsedFields) -> Option<Judgment> {
    if verdict.tier == ParseTier::Defaulted || local.agent_count() == 0 {
        return None;
    }

    let agreement = verdict
        .label("agreement_level")
        .and_then(|l| l.parse::<AgreementLevel>().ok())
        .filter(|l| {
            matches!(
                l,
                AgreementLevel::High | AgreementLevel::Medium | AgreementLevel::Low
            )
        })
        .filter(|_| local.agent_count() > 1)
        .unwrap_or(local.agreement_level());

    let reasoning = match verdict.text("reasoning") {
        "" => local.reasoning().to_string(),
        text => text.to_string(),
    };

    let field_or_local = |name: &str, local_value: f64| {
        if verdict.supplied(name) {
            verdict.number(name)
        } else {
            local_value
        }
    };

    Some(Judgment::new(
        field_or_local("consensus_probability", local.consensus_probability()),
        field_or_local("consensus_confidence", local.consensus_confidence()),
        agreement,
        local.agent_count(),
        reasoning,
        ConsensusMethod::Judge,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_fields, JUDGE_FIELDS};

    fn est(p: f64, c: f64) -> Estimate {
        Estimate::new(p, c, "test", 1)
    }

    #[test]
    fn single_estimate_identity() {
        for p in [0.0, 0.1, 0.333, 0.7, 0.99, 1.0] {
            let j = aggregate(&[est(p, 0.3)]);
            assert_eq!(j.consensus_probability(), p);
            assert_eq!(j.agreement_level(), AgreementLevel::Single);
            assert_eq!(j.agent_count(), 1);
        }
    }

    #[test]
    fn zero_confidence_contributes_no_weight() {
        let j = aggregate(&[est(0.8, 1.0), est(0.2, 0.0)]);
        assert!((j.consensus_probability() - 0.8).abs() < 1e-12);
        assert!((j.consensus_confidence() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn all_zero_confidence_uses_unweighted_mean() {
        let j = aggregate(&[est(0.8, 0.0), est(0.2, 0.0)]);
        assert!((j.consensus_probability() - 0.5).abs() < 1e-12);
        assert_eq!(j.consensus_confidence(), 0.0);
        assert!(j.reasoning().contains("Unweighted mean"));
    }

    #[test]
    fn agreement_classification() {
        assert_eq!(
            aggregate(&[est(0.5, 0.5), est(0.5, 0.5)]).agreement_level(),
            AgreementLevel::High
        );
        assert_eq!(
            aggregate(&[est(0.3, 0.5), est(0.7, 0.5)]).agreement_level(),
            AgreementLevel::Low
        );
        assert_eq!(
            aggregate(&[est(0.5, 0.5), est(0.7, 0.5)]).agreement_level(),
            AgreementLevel::Medium
        );
    }

    #[test]
    fn sample_stdev_values() {
        assert_eq!(sample_stdev(&[]), 0.0);
        assert_eq!(sample_stdev(&[0.4]), 0.0);
        assert!((sample_stdev(&[0.3, 0.7]) - 0.282_842_712).abs() < 1e-6);
        assert!((sample_stdev(&[0.7, 0.75, 0.65]) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn three_analyst_consensus() {
        let j = aggregate(&[est(0.7, 0.8), est(0.75, 0.9), est(0.65, 0.7)]);
        let expected = (0.7 * 0.8 + 0.75 * 0.9 + 0.65 * 0.7) / (0.8 + 0.9 + 0.7);
        assert!((j.consensus_probability() - expected).abs() < 1e-12);
        assert!((j.consensus_confidence() - 0.8).abs() < 1e-12);
        assert_eq!(j.agreement_level(), AgreementLevel::High);
        assert_eq!(j.agent_count(), 3);
        assert_eq!(j.method(), ConsensusMethod::Weighted);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let list = [est(0.61, 0.4), est(0.58, 0.9), est(0.77, 0.2)];
        assert_eq!(aggregate(&list), aggregate(&list));
    }

    #[test]
    fn empty_is_no_data() {
        assert_eq!(aggregate(&[]), Judgment::no_data());
    }

    #[test]
    fn judge_verdict_overrides_consensus_fields() {
        let local = aggregate(&[est(0.7, 0.8), est(0.75, 0.9)]);
        let verdict = parse_fields(
            r#"{"consensus_probability": 0.74, "consensus_confidence": 0.6, "agreement_level": "medium", "reasoning": "Judge view"}"#,
            JUDGE_FIELDS,
        );
        let j = apply_judge_verdict(&local, &verdict).unwrap();
        assert_eq!(j.consensus_probability(), 0.74);
        assert_eq!(j.consensus_confidence(), 0.6);
        assert_eq!(j.agreement_level(), AgreementLevel::Medium);
        assert_eq!(j.agent_count(), 2);
        assert_eq!(j.reasoning(), "Judge view");
        assert_eq!(j.method(), ConsensusMethod::Judge);
    }

    #[test]
    fn judge_verdict_keeps_local_agreement_when_label_invalid() {
        let local = aggregate(&[est(0.7, 0.8), est(0.72, 0.9)]);
        let verdict = parse_fields(
            r#"{"consensus_probability": 0.71, "agreement_level": "unanimous"}"#,
            JUDGE_FIELDS,
        );
        let j = apply_judge_verdict(&local, &verdict).unwrap();
        assert_eq!(j.agreement_level(), AgreementLevel::High);
    }

    #[test]
    fn judge_verdict_cannot_relabel_single() {
        let local = aggregate(&[est(0.7, 0.8)]);
        let verdict = parse_fields(
            r#"{"consensus_probability": 0.7, "agreement_level": "low"}"#,
            JUDGE_FIELDS,
        );
        let j = apply_judge_verdict(&local, &verdict).unwrap();
        assert_eq!(j.agreement_level(), AgreementLevel::Single);
    }

    #[test]
    fn judge_missing_probability_keeps_local_probability() {
        let local = aggregate(&[est(0.8, 0.8), est(0.82, 0.9)]);
        let verdict = parse_fields("consensus_confidence: 0.4", JUDGE_FIELDS);
        assert_eq!(verdict.tier, ParseTier::Lenient);
        let j = apply_judge_verdict(&local, &verdict).unwrap();
        assert_eq!(j.consensus_probability(), local.consensus_probability());
        assert_eq!(j.consensus_confidence(), 0.4);
        assert_eq!(j.method(), ConsensusMethod::Judge);
    }

    #[test]
    fn judge_missing_confidence_keeps_local_confidence() {
        let local = aggregate(&[est(0.8, 0.8), est(0.82, 0.9)]);
        let verdict = parse_fields(r#"{"consensus_probability": 0.77}"#, JUDGE_FIELDS);
        let j = apply_judge_verdict(&local, &verdict).unwrap();
        assert_eq!(j.consensus_probability(), 0.77);
        assert_eq!(j.consensus_confidence(), local.consensus_confidence());
    }

    #[test]
    fn unrecognisable_judge_output_is_ignored() {
        let local = aggregate(&[est(0.7, 0.8), est(0.75, 0.9)]);
        let verdict = parse_fields("I am unable to judge this.", JUDGE_FIELDS);
        assert!(apply_judge_verdict(&local, &verdict).is_none());
    }
}
