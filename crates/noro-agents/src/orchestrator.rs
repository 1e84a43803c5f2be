use std::sync::Arc;
use std::time::{Duration, Instant};

use noro_models::report::REPORT_SCHEMA_VERSION;
use noro_models::{
    Degradation, Estimate, Judgment, MarketReport, MarketRequest, NoroConfig, ReportSummary,
    TradeProposal,
};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analyst::EvidenceAnalyst;
use crate::consensus::{aggregate, apply_judge_verdict};
use crate::error::AgentError;
use crate::judge::JudgeAgent;
use crate::pacing::Pacer;
use crate::parser::{parse_estimate, parse_fields, ParseTier, JUDGE_FIELDS};
use crate::policy::{CallPolicy, Outcome};
use crate::sizing;

/// Upper bound on extra analysis calls per market.
pub const MAX_REPEAT_COUNT: u32 = 10;

/// Runs one market through analyze → propose → analyze(k) → aggregate → finalize.
///
/// Every stage has a fallback, so a valid request always yields a report.
/// Only invalid input and cancellation surface as errors.
pub struct Orchestrator {
    analyst: Arc<dyn EvidenceAnalyst>,
    judge: Option<Arc<dyn JudgeAgent>>,
    config: NoroConfig,
}

impl Orchestrator {
    pub fn new(analyst: Arc<dyn EvidenceAnalyst>, config: NoroConfig) -> Self {
        Self {
            analyst,
            judge: None,
            config,
        }
    }

    /// Attach a judge capability to refine the local consensus.
    pub fn with_judge(mut self, judge: Arc<dyn JudgeAgent>) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn config(&self) -> &NoroConfig {
        &self.config
    }

    fn call_policy(&self) -> CallPolicy {
        CallPolicy::new(
            Duration::from_secs(self.config.agents.call_timeout_seconds),
            Pacer::new(Duration::from_millis(self.config.agents.min_call_spacing_ms)),
        )
    }

    pub async fn process_market(&self, request: &MarketRequest) -> Result<MarketReport, AgentError> {
        self.process_market_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Like [`Orchestrator::process_market`], checking `cancel` between stages.
    pub async fn process_market_with_cancel(
        &self,
        request: &MarketRequest,
        cancel: &CancellationToken,
    ) -> Result<MarketReport, AgentError> {
        let start = Instant::now();
        validate(request)?;
        info!(
            question = %request.question,
            repeat_count = request.repeat_count,
            bankroll = %request.bankroll,
            "Starting market evaluation"
        );

        let mut policy = self.call_policy();
        let mut estimates: Vec<Estimate> = Vec::with_capacity(1 + request.repeat_count as usize);
        let mut degradations: Vec<Degradation> = Vec::new();
        let mut first_success: Option<usize> = None;

        // 1. Analyze once
        checkpoint(cancel, "analysis[0]")?;
        self.analyze_into(
            &mut policy,
            &request.question,
            &mut estimates,
            &mut degradations,
            &mut first_success,
        )
        .await;

        // 2. Propose from the first estimate, no extra call
        checkpoint(cancel, "proposal")?;
        let proposal = self.propose(estimates.first(), request);

        // 3. Optional repeats
        for i in 1..=request.repeat_count {
            checkpoint(cancel, &format!("analysis[{i}]"))?;
            self.analyze_into(
                &mut policy,
                &request.question,
                &mut estimates,
                &mut degradations,
                &mut first_success,
            )
            .await;
        }

        // 4. Aggregate
        checkpoint(cancel, "aggregation")?;
        let judgment = self
            .judge_estimates(&mut policy, &request.question, &estimates, &mut degradations)
            .await;

        // 5. Finalize
        Ok(finalize(
            request,
            estimates,
            judgment,
            proposal,
            degradations,
            start.elapsed(),
        ))
    }

    /// Run propose → aggregate → finalize over estimates gathered elsewhere.
    ///
    /// An empty list yields the canonical no-data judgment.
    pub async fn evaluate_estimates(
        &self,
        request: &MarketRequest,
        estimates: Vec<Estimate>,
    ) -> Result<MarketReport, AgentError> {
        let start = Instant::now();
        validate(request)?;

        let mut policy = self.call_policy();
        let mut degradations = Vec::new();
        let proposal = self.propose(estimates.first(), request);
        let judgment = self
            .judge_estimates(&mut policy, &request.question, &estimates, &mut degradations)
            .await;

        Ok(finalize(
            request,
            estimates,
            judgment,
            proposal,
            degradations,
            start.elapsed(),
        ))
    }

    /// Evaluate several questions concurrently, splitting `bankroll` evenly.
    ///
    /// Each question is an independent run with its own pacer and estimate
    /// list. Reports come back in input order.
    pub async fn batch_process(
        self: &Arc<Self>,
        questions: Vec<String>,
        bankroll: Decimal,
    ) -> Result<Vec<MarketReport>, AgentError> {
        if bankroll < Decimal::ZERO {
            return Err(AgentError::InvalidInput(format!(
                "bankroll must be non-negative, got {bankroll}"
            )));
        }
        if questions.is_empty() {
            return Ok(Vec::new());
        }

        let per_market = (bankroll / Decimal::from(questions.len())).round_dp(2);
        info!(markets = questions.len(), per_market = %per_market, "Starting batch evaluation");

        let mut handles = Vec::with_capacity(questions.len());
        for question in questions {
            let this = Arc::clone(self);
            let request = MarketRequest::new(question, per_market)
                .with_repeat_count(self.config.agents.repeat_count);
            handles.push(tokio::spawn(async move {
                this.process_market(&request).await
            }));
        }

        let mut reports = Vec::with_capacity(handles.len());
        let mut pending = handles.into_iter();
        while let Some(handle) = pending.next() {
            let failure = match handle.await {
                Ok(Ok(report)) => {
                    reports.push(report);
                    continue;
                }
                Ok(Err(e)) => e,
                Err(e) => {
                    error!(error = %e, "Market evaluation task panicked");
                    AgentError::Task(e.to_string())
                }
            };
            // Don't leave the remaining markets running detached.
            let aborted = pending.len();
            pending.for_each(|h| h.abort());
            warn!(error = %failure, aborted, "Batch evaluation failed, aborting remaining markets");
            return Err(failure);
        }
        Ok(reports)
    }

    /// One analysis call. Appends exactly one estimate: the parsed response,
    /// or on failure a copy of the first successful estimate, or a neutral
    /// fallback when there is none yet.
    async fn analyze_into(
        &self,
        policy: &mut CallPolicy,
        question: &str,
        estimates: &mut Vec<Estimate>,
        degradations: &mut Vec<Degradation>,
        first_success: &mut Option<usize>,
    ) {
        let index = estimates.len();
        let stage = format!("analysis[{index}]");
        let reference = first_success.map(|i| (i, estimates[i].clone()));

        let analyst = &self.analyst;
        let outcome = policy
            .call_with_degradation(
                &stage,
                async move {
                    let raw = analyst.analyze(question).await?;
                    Ok::<_, AgentError>(parse_estimate(&raw))
                },
                |e| {
                    let estimate = match reference {
                        Some((i, prior)) => Estimate::new(
                            prior.probability(),
                            prior.confidence(),
                            format!(
                                "Fallback: analysis[{index}] failed ({e}); reusing analysis[{i}]. {}",
                                prior.evidence()
                            ),
                            prior.sources_count(),
                        ),
                        None => Estimate::fallback(question, &e.to_string()),
                    };
                    (estimate, ParseTier::Defaulted)
                },
            )
            .await;

        let succeeded = !outcome.is_degraded();
        if let Some(cause) = outcome.cause() {
            degradations.push(Degradation {
                stage: stage.clone(),
                cause: cause.to_string(),
            });
        }
        let (estimate, tier) = outcome.into_value();

        if succeeded {
            match tier {
                ParseTier::Strict => {}
                ParseTier::Lenient => {
                    warn!(stage = %stage, "Analysis response was not valid JSON, extracted fields from text");
                }
                ParseTier::Defaulted => {
                    warn!(stage = %stage, "Analysis response unparseable, using default values");
                    degradations.push(Degradation {
                        stage: stage.clone(),
                        cause: "unparseable analysis response; defaults used".to_string(),
                    });
                }
            }
            if first_success.is_none() {
                *first_success = Some(index);
            }
        }

        info!(
            stage = %stage,
            probability = estimate.probability(),
            confidence = estimate.confidence(),
            sources = estimate.sources_count(),
            degraded = !succeeded,
            "Analysis complete"
        );
        estimates.push(estimate);
    }

    fn propose(&self, first: Option<&Estimate>, request: &MarketRequest) -> TradeProposal {
        let (probability, confidence) = match first {
            Some(e) => (e.probability(), e.confidence()),
            None => {
                let no_data = Judgment::no_data();
                (no_data.consensus_probability(), no_data.consensus_confidence())
            }
        };
        let proposal = sizing::propose(
            probability,
            confidence,
            request.bankroll,
            self.config.sizing.policy,
            request.decimal_odds,
        );
        info!(
            action = ?proposal.action,
            amount = %proposal.amount,
            policy = ?proposal.policy,
            "Trade proposal complete"
        );
        proposal
    }

    /// Local consensus, optionally refined by the judge. Never fails.
    async fn judge_estimates(
        &self,
        policy: &mut CallPolicy,
        question: &str,
        estimates: &[Estimate],
        degradations: &mut Vec<Degradation>,
    ) -> Judgment {
        if estimates.is_empty() {
            warn!("No analyses to aggregate, using no-data judgment");
            return Judgment::no_data();
        }

        let local = aggregate(estimates);
        let judgment = match &self.judge {
            None => local,
            Some(judge) => {
                let outcome = policy
                    .call_with_degradation(
                        "judge",
                        async {
                            let raw = judge.aggregate(estimates, question).await?;
                            let verdict = parse_fields(&raw, JUDGE_FIELDS);
                            apply_judge_verdict(&local, &verdict).ok_or_else(|| {
                                AgentError::Parse(
                                    "judge response carried no consensus fields".to_string(),
                                )
                            })
                        },
                        |_| local.clone(),
                    )
                    .await;
                if let Some(cause) = outcome.cause() {
                    degradations.push(Degradation {
                        stage: "judge".to_string(),
                        cause: cause.to_string(),
                    });
                }
                outcome.into_value()
            }
        };

        info!(
            consensus_probability = judgment.consensus_probability(),
            consensus_confidence = judgment.consensus_confidence(),
            agreement = %judgment.agreement_level(),
            agent_count = judgment.agent_count(),
            method = ?judgment.method(),
            "Consensus judgment complete"
        );
        judgment
    }
}

fn validate(request: &MarketRequest) -> Result<(), AgentError> {
    if request.question.trim().is_empty() {
        return Err(AgentError::InvalidInput(
            "market question is empty".to_string(),
        ));
    }
    if request.bankroll < Decimal::ZERO {
        return Err(AgentError::InvalidInput(format!(
            "bankroll must be non-negative, got {}",
            request.bankroll
        )));
    }
    if let Some(odds) = request.decimal_odds {
        if !odds.is_finite() {
            return Err(AgentError::InvalidInput(format!(
                "decimal odds must be finite, got {odds}"
            )));
        }
    }
    if request.repeat_count > MAX_REPEAT_COUNT {
        return Err(AgentError::InvalidInput(format!(
            "repeat_count {} exceeds maximum {MAX_REPEAT_COUNT}",
            request.repeat_count
        )));
    }
    Ok(())
}

fn checkpoint(cancel: &CancellationToken, next_stage: &str) -> Result<(), AgentError> {
    if cancel.is_cancelled() {
        warn!(stage = next_stage, "Evaluation cancelled");
        return Err(AgentError::Cancelled(next_stage.to_string()));
    }
    Ok(())
}

fn finalize(
    request: &MarketRequest,
    estimates: Vec<Estimate>,
    judgment: Judgment,
    trade_proposal: TradeProposal,
    degradations: Vec<Degradation>,
    elapsed: Duration,
) -> MarketReport {
    let summary = ReportSummary::new(&judgment, &trade_proposal, !degradations.is_empty());
    info!(
        question = %request.question,
        action = ?trade_proposal.action,
        stake = %trade_proposal.amount,
        degradations = degradations.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Market evaluation complete"
    );

    MarketReport {
        id: Uuid::new_v4(),
        schema_version: REPORT_SCHEMA_VERSION,
        market_question: request.question.clone(),
        market_id: request.market_id.clone(),
        decided_at: chrono::Utc::now(),
        analyses: estimates,
        judgment,
        trade_proposal,
        summary,
        degradations,
        processing_time_ms: elapsed.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptStep, ScriptedAnalyst};
    use noro_models::{AgreementLevel, TradeAction};
    use rust_decimal_macros::dec;

    fn test_config() -> NoroConfig {
        let mut config = NoroConfig::default();
        config.agents.min_call_spacing_ms = 0;
        config.agents.call_timeout_seconds = 5;
        config
    }

    fn orchestrator(analyst: ScriptedAnalyst) -> (Orchestrator, Arc<ScriptedAnalyst>) {
        let analyst = Arc::new(analyst);
        (
            Orchestrator::new(Arc::clone(&analyst) as Arc<dyn EvidenceAnalyst>, test_config()),
            analyst,
        )
    }

    #[tokio::test]
    async fn negative_bankroll_fails_fast() {
        let (orch, analyst) = orchestrator(ScriptedAnalyst::replying(&[(0.7, 0.8)]));
        let request = MarketRequest::new("Will X happen?", dec!(-1));
        let result = orch.process_market(&request).await;
        assert!(matches!(result, Err(AgentError::InvalidInput(_))));
        assert_eq!(analyst.calls(), 0);
    }

    #[tokio::test]
    async fn empty_question_and_bad_odds_are_rejected() {
        let (orch, _) = orchestrator(ScriptedAnalyst::replying(&[]));
        let blank = MarketRequest::new("   ", dec!(100));
        assert!(matches!(
            orch.process_market(&blank).await,
            Err(AgentError::InvalidInput(_))
        ));
        let nan_odds = MarketRequest::new("Q?", dec!(100)).with_decimal_odds(f64::NAN);
        assert!(matches!(
            orch.process_market(&nan_odds).await,
            Err(AgentError::InvalidInput(_))
        ));
        let too_many = MarketRequest::new("Q?", dec!(100)).with_repeat_count(MAX_REPEAT_COUNT + 1);
        assert!(matches!(
            orch.process_market(&too_many).await,
            Err(AgentError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn zero_bankroll_is_valid_and_stakes_nothing() {
        let (orch, _) = orchestrator(ScriptedAnalyst::replying(&[(0.9, 0.9)]));
        let report = orch
            .process_market(&MarketRequest::new("Q?", Decimal::ZERO))
            .await
            .unwrap();
        assert_eq!(report.trade_proposal.amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let (orch, analyst) = orchestrator(ScriptedAnalyst::replying(&[(0.7, 0.8)]));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = orch
            .process_market_with_cancel(&MarketRequest::new("Q?", dec!(100)), &cancel)
            .await;
        assert!(matches!(result, Err(AgentError::Cancelled(stage)) if stage == "analysis[0]"));
        assert_eq!(analyst.calls(), 0);
    }

    #[tokio::test]
    async fn first_analysis_failure_uses_neutral_fallback() {
        let (orch, _) = orchestrator(ScriptedAnalyst::new([ScriptStep::Fail(
            "provider down".to_string(),
        )]));
        let report = orch
            .process_market(&MarketRequest::new("Will it rain?", dec!(1000)))
            .await
            .unwrap();
        assert_eq!(report.analyses.len(), 1);
        assert_eq!(report.analyses[0].probability(), 0.5);
        assert_eq!(report.analyses[0].confidence(), 0.3);
        assert!(report.analyses[0].evidence().contains("Fallback analysis"));
        assert_eq!(report.judgment.agreement_level(), AgreementLevel::Single);
        assert_eq!(report.trade_proposal.action, TradeAction::BuyNo);
        assert!(report.summary.degraded);
        assert_eq!(report.degradations[0].stage, "analysis[0]");
    }

    #[tokio::test]
    async fn failed_repeat_copies_first_success() {
        let (orch, analyst) = orchestrator(ScriptedAnalyst::new([
            ScriptStep::Reply(crate::test_support::estimate_json(0.8, 0.9)),
            ScriptStep::RateLimit,
        ]));
        let report = orch
            .process_market(&MarketRequest::new("Q?", dec!(1000)).with_repeat_count(1))
            .await
            .unwrap();
        assert_eq!(analyst.calls(), 2);
        assert_eq!(report.analyses.len(), 2);
        assert_eq!(report.judgment.agent_count(), 2);
        assert_eq!(report.analyses[1].probability(), 0.8);
        assert_eq!(report.analyses[1].confidence(), 0.9);
        assert!(report.analyses[1].evidence().starts_with("Fallback: analysis[1]"));
        assert_eq!(report.judgment.agreement_level(), AgreementLevel::High);
        assert_eq!(report.degradations.len(), 1);
    }

    #[tokio::test]
    async fn unparseable_response_is_defaulted_not_failed() {
        let (orch, _) = orchestrator(ScriptedAnalyst::new([ScriptStep::Reply(
            "I'm not sure.".to_string(),
        )]));
        let report = orch
            .process_market(&MarketRequest::new("Q?", dec!(1000)))
            .await
            .unwrap();
        assert_eq!(report.analyses[0].probability(), 0.5);
        assert_eq!(report.analyses[0].confidence(), 0.5);
        assert_eq!(report.analyses[0].evidence(), "I'm not sure.");
        assert!(report.summary.degraded);
    }
}
