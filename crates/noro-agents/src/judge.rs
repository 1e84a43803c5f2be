use async_trait::async_trait;
use noro_models::Estimate;

use crate::claude_cli::{invoke_claude, ClaudeCliConfig};
use crate::error::AgentError;
use crate::prompts::{judge_system_prompt, judge_user_prompt};

/// Optional consensus capability. Its output refines, never replaces, the
/// local aggregation.
#[async_trait]
pub trait JudgeAgent: Send + Sync {
    fn name(&self) -> &str;

    async fn aggregate(&self, estimates: &[Estimate], question: &str) -> Result<String, AgentError>;
}

/// A judge backed by the Claude CLI.
pub struct ClaudeJudge {
    pub name: String,
    pub cli_config: ClaudeCliConfig,
}

impl ClaudeJudge {
    pub fn new(name: String, model: String, timeout: std::time::Duration) -> Self {
        Self {
            name,
            cli_config: ClaudeCliConfig { model, timeout },
        }
    }
}

#[async_trait]
impl JudgeAgent for ClaudeJudge {
    fn name(&self) -> &str {
        &self.name
    }

    async fn aggregate(&self, estimates: &[Estimate], question: &str) -> Result<String, AgentError> {
        if estimates.is_empty() {
            return Err(AgentError::InvalidInput(
                "judge called with no estimates".to_string(),
            ));
        }
        let system_prompt = judge_system_prompt();
        let user_prompt = judge_user_prompt(question, estimates)?;
        invoke_claude(&system_prompt, &user_prompt, &self.cli_config).await
    }
}
