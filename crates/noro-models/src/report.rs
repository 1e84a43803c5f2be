use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::estimate::Estimate;
use crate::judgment::{AgreementLevel, Judgment};
use crate::trade::{TradeAction, TradeProposal};

pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Complete output of one market evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketReport {
    pub id: Uuid,
    pub schema_version: u32,
    pub market_question: String,
    pub market_id: Option<String>,
    pub decided_at: DateTime<Utc>,
    /// Estimates in call order; substituted entries included.
    pub analyses: Vec<Estimate>,
    pub judgment: Judgment,
    pub trade_proposal: TradeProposal,
    pub summary: ReportSummary,
    /// One entry per value substituted because a capability call failed.
    pub degradations: Vec<Degradation>,
    pub processing_time_ms: u64,
}

/// Display-oriented mirror of the key judgment and proposal fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportSummary {
    pub consensus_probability: f64,
    pub consensus_confidence: f64,
    pub recommended_action: TradeAction,
    pub recommended_stake: Decimal,
    pub agreement_level: AgreementLevel,
    pub analyses_count: usize,
    pub degraded: bool,
}

impl ReportSummary {
    pub fn new(judgment: &Judgment, proposal: &TradeProposal, degraded: bool) -> Self {
        Self {
            consensus_probability: judgment.consensus_probability(),
            consensus_confidence: judgment.consensus_confidence(),
            recommended_action: proposal.action,
            recommended_stake: proposal.amount,
            agreement_level: judgment.agreement_level(),
            analyses_count: judgment.agent_count(),
            degraded,
        }
    }
}

/// A pipeline stage that fell back to a substitute value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Degradation {
    /// e.g. `analysis[0]`, `judge`.
    pub stage: String,
    pub cause: String,
}
