use noro_models::Estimate;

/// Output contract shared by the analyst system and user prompts.
fn analyst_schema() -> String {
    let example = serde_json::json!({
        "probability": 0.75,
        "confidence": 0.85,
        "evidence": "<summary of key findings and where they came from>",
        "sources_count": 10
    });
    serde_json::to_string_pretty(&example).unwrap_or_default()
}

fn judge_schema() -> String {
    let example = serde_json::json!({
        "consensus_probability": 0.75,
        "consensus_confidence": 0.82,
        "agreement_level": "high | medium | low",
        "reasoning": "<how the analyses were weighed>"
    });
    serde_json::to_string_pretty(&example).unwrap_or_default()
}

pub fn analyst_system_prompt() -> String {
    format!(
        "You are an evidence analyst for Noro, a prediction market agent. Given a market \
         question, gather evidence and estimate the probability that the market resolves YES.\n\n\
         ## EVIDENCE SOURCES\n\n\
         Pick sources by question type:\n\
         - Scientific or medical questions: peer-reviewed literature (PubMed, arXiv)\n\
         - Weather or climate questions: observed and forecast weather data\n\
         - Crypto questions: current and historical price data\n\n\
         Only use real data. Never invent sources or placeholder figures.\n\n\
         ## ESTIMATION RULES\n\n\
         - Weigh recency, sample size and source quality\n\
         - Look for consensus or disagreement across sources\n\
         - Stay close to 0.5 when evidence is thin\n\
         - `confidence` is how reliable your own estimate is, not how likely the outcome is\n\
         - `sources_count` is the number of distinct evidence items you consulted\n\n\
         ## OUTPUT FORMAT\n\n\
         Respond with a single JSON object and nothing else:\n{}\n",
        analyst_schema()
    )
}

pub fn analyst_user_prompt(question: &str) -> String {
    format!(
        "Analyze the following prediction market question:\n\n\"{question}\"\n\n\
         Return your analysis as JSON with: probability, confidence, evidence, sources_count."
    )
}

pub fn judge_system_prompt() -> String {
    format!(
        "You are the judge for Noro, a prediction market agent. You receive several \
         independent analyses of one market question and produce a consensus.\n\n\
         ## AGGREGATION RULES\n\n\
         - Weight each analysis's probability by its confidence\n\
         - Give more weight to analyses backed by more and better sources\n\
         - Agreement level: standard deviation of probabilities < 0.10 is high, < 0.20 medium, \
         otherwise low\n\
         - When analyses disagree significantly, lower the consensus confidence\n\n\
         ## OUTPUT FORMAT\n\n\
         Respond with a single JSON object and nothing else:\n{}\n",
        judge_schema()
    )
}

pub fn judge_user_prompt(question: &str, estimates: &[Estimate]) -> Result<String, serde_json::Error> {
    let analyses = serde_json::to_string_pretty(estimates)?;
    Ok(format!(
        "You are judging a prediction market question:\n\n\"{question}\"\n\n\
         You have received {} analysis results:\n\n{analyses}\n\n\
         Return your judgment as JSON with: consensus_probability, consensus_confidence, \
         agreement_level, reasoning.",
        estimates.len()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyst_prompt_contains_contract() {
        let prompt = analyst_system_prompt();
        assert!(prompt.contains("\"probability\""));
        assert!(prompt.contains("\"sources_count\""));
        assert!(prompt.contains("PubMed"));
        assert!(prompt.contains("OUTPUT FORMAT"));
    }

    #[test]
    fn judge_prompt_contains_thresholds() {
        let prompt = judge_system_prompt();
        assert!(prompt.contains("consensus_probability"));
        assert!(prompt.contains("< 0.10"));
        assert!(prompt.contains("< 0.20"));
    }

    #[test]
    fn judge_user_prompt_embeds_estimates() {
        let estimates = vec![
            Estimate::new(0.7, 0.8, "a", 1),
            Estimate::new(0.6, 0.5, "b", 2),
        ];
        let prompt = judge_user_prompt("Will X happen?", &estimates).unwrap();
        assert!(prompt.contains("\"Will X happen?\""));
        assert!(prompt.contains("received 2 analysis results"));
        assert!(prompt.contains("\"probability\": 0.7"));
    }
}
