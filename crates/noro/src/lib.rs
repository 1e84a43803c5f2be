//! Noro - prediction-market evaluation pipeline
//!
//! Turns a binary market question into a probability estimate, a consensus
//! judgment and a sized trade proposal, using Claude CLI analysts and an
//! optional Claude judge.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use noro::models::{MarketRequest, NoroConfig};
//! use rust_decimal::Decimal;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = NoroConfig::default();
//! let orchestrator = noro::build_orchestrator(&config)?;
//! let request = MarketRequest::new("Will it snow in Denver on Friday?", Decimal::from(1000));
//! let report = noro::process_market(&orchestrator, &request).await?;
//! println!("{}", report.summary.recommended_stake);
//! # Ok(())
//! # }
//! ```

pub use noro_agents as agents;
pub use noro_models as models;

use std::sync::Arc;
use std::time::Duration;

use noro_agents::{ClaudeAnalyst, ClaudeJudge, EvidenceAnalyst, JudgeAgent, Orchestrator};
use noro_models::{MarketReport, MarketRequest, NoroConfig};
use tracing::info;

/// Build an Orchestrator from configuration.
///
/// The judge is attached only when `agents.judge_enabled` is set.
pub fn build_orchestrator(config: &NoroConfig) -> Result<Orchestrator, anyhow::Error> {
    let agents = &config.agents;
    if agents.analyst_model.trim().is_empty() {
        anyhow::bail!("agents.analyst_model must not be empty");
    }
    let timeout = Duration::from_secs(agents.call_timeout_seconds);

    let analyst = Arc::new(ClaudeAnalyst::new(
        "analyst".to_string(),
        agents.analyst_model.clone(),
        timeout,
    )) as Arc<dyn EvidenceAnalyst>;
    let mut orchestrator = Orchestrator::new(analyst, config.clone());

    if agents.judge_enabled {
        let judge = Arc::new(ClaudeJudge::new(
            "judge".to_string(),
            agents.judge_model.clone(),
            timeout,
        )) as Arc<dyn JudgeAgent>;
        orchestrator = orchestrator.with_judge(judge);
    }

    info!(
        analyst_model = %agents.analyst_model,
        judge_enabled = agents.judge_enabled,
        policy = ?config.sizing.policy,
        "Orchestrator ready"
    );
    Ok(orchestrator)
}

/// Evaluate one market using the given orchestrator.
pub async fn process_market(
    orchestrator: &Orchestrator,
    request: &MarketRequest,
) -> Result<MarketReport, noro_agents::AgentError> {
    orchestrator.process_market(request).await
}
