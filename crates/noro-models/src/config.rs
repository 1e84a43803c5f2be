use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::trade::SizingPolicy;

/// Top-level configuration for Noro.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct NoroConfig {
    pub agents: AgentsConfig,
    pub sizing: SizingConfig,
}

/// Configuration for the analysis/judge capabilities and call pacing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentsConfig {
    /// Model used for evidence analysis calls.
    pub analyst_model: String,
    /// Model used for the optional judge call.
    pub judge_model: String,
    /// Whether to ask the judge capability to refine the local consensus.
    pub judge_enabled: bool,
    /// Per-call timeout in seconds; a timeout counts as an ordinary failure.
    pub call_timeout_seconds: u64,
    /// Minimum spacing between successive external calls within one run.
    pub min_call_spacing_ms: u64,
    /// Default number of extra analysis calls after the first.
    pub repeat_count: u32,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            analyst_model: "claude-3-5-haiku-latest".to_string(),
            judge_model: "claude-sonnet-4-5-20250929".to_string(),
            judge_enabled: false,
            call_timeout_seconds: 45,
            min_call_spacing_ms: 1000,
            repeat_count: 1,
        }
    }
}

/// Configuration for stake sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SizingConfig {
    /// Kelly is only used when the request carries market odds.
    pub policy: SizingPolicy,
    /// Bankroll used when the caller does not give one.
    pub default_bankroll: Decimal,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            policy: SizingPolicy::Confidence,
            default_bankroll: Decimal::from(1000),
        }
    }
}
