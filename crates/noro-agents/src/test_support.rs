//! Scripted capabilities for exercising the pipeline without the Claude CLI.
//!
//! Each scripted capability replays a fixed sequence of steps, one per call,
//! and fails once the script runs out.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use noro_models::Estimate;
use tokio::sync::Mutex;

use crate::analyst::EvidenceAnalyst;
use crate::error::AgentError;
use crate::judge::JudgeAgent;

/// What a scripted capability does on one call.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// Return this raw text.
    Reply(String),
    /// Fail with a CLI error carrying this message.
    Fail(String),
    /// Fail as if the provider throttled the call.
    RateLimit,
    /// Sleep this long, then reply. Used to trigger timeouts.
    Stall(Duration, String),
}

impl ScriptStep {
    async fn play(self) -> Result<String, AgentError> {
        match self {
            ScriptStep::Reply(text) => Ok(text),
            ScriptStep::Fail(msg) => Err(AgentError::Cli(msg)),
            ScriptStep::RateLimit => Err(AgentError::RateLimited(
                "429 Too Many Requests".to_string(),
            )),
            ScriptStep::Stall(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
        }
    }
}

/// JSON an analyst would return for `(probability, confidence)`.
pub fn estimate_json(probability: f64, confidence: f64) -> String {
    serde_json::json!({
        "probability": probability,
        "confidence": confidence,
        "evidence": format!("Scripted evidence p={probability} c={confidence}"),
        "sources_count": 3,
    })
    .to_string()
}

/// JSON a judge would return.
pub fn judgment_json(probability: f64, confidence: f64, agreement: &str) -> String {
    serde_json::json!({
        "consensus_probability": probability,
        "consensus_confidence": confidence,
        "agreement_level": agreement,
        "reasoning": "Scripted judge verdict",
    })
    .to_string()
}

pub struct ScriptedAnalyst {
    pub name: String,
    script: Mutex<VecDeque<ScriptStep>>,
    calls: AtomicUsize,
}

impl ScriptedAnalyst {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            name: "scripted_analyst".to_string(),
            script: Mutex::new(steps.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Analyst that answers each call with the next `(p, c)` pair as JSON.
    pub fn replying(estimates: &[(f64, f64)]) -> Self {
        Self::new(
            estimates
                .iter()
                .map(|&(p, c)| ScriptStep::Reply(estimate_json(p, c))),
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EvidenceAnalyst for ScriptedAnalyst {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, _question: &str) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().await.pop_front();
        match step {
            Some(step) => step.play().await,
            None => Err(AgentError::Cli("analyst script exhausted".to_string())),
        }
    }
}

pub struct ScriptedJudge {
    pub name: String,
    script: Mutex<VecDeque<ScriptStep>>,
    calls: AtomicUsize,
    last_estimate_count: AtomicUsize,
}

impl ScriptedJudge {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            name: "scripted_judge".to_string(),
            script: Mutex::new(steps.into_iter().collect()),
            calls: AtomicUsize::new(0),
            last_estimate_count: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Length of the estimate list on the most recent call.
    pub fn last_estimate_count(&self) -> usize {
        self.last_estimate_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JudgeAgent for ScriptedJudge {
    fn name(&self) -> &str {
        &self.name
    }

    async fn aggregate(&self, estimates: &[Estimate], _question: &str) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_estimate_count
            .store(estimates.len(), Ordering::SeqCst);
        let step = self.script.lock().await.pop_front();
        match step {
            Some(step) => step.play().await,
            None => Err(AgentError::Cli("judge script exhausted".to_string())),
        }
    }
}
