pub mod analyst;
pub mod claude_cli;
pub mod consensus;
pub mod error;
pub mod judge;
pub mod orchestrator;
pub mod pacing;
pub mod parser;
pub mod policy;
pub mod prompts;
pub mod sizing;

pub mod test_support;

pub use analyst::{ClaudeAnalyst, EvidenceAnalyst};
pub use consensus::aggregate;
pub use error::AgentError;
pub use judge::{ClaudeJudge, JudgeAgent};
pub use orchestrator::Orchestrator;
pub use sizing::{confidence_stake, kelly_stake};
