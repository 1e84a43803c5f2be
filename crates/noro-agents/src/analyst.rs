use async_trait::async_trait;

use crate::claude_cli::{invoke_claude, ClaudeCliConfig};
use crate::error::AgentError;
use crate::prompts::{analyst_system_prompt, analyst_user_prompt};

/// Evidence analysis capability. Returns the raw, unparsed response.
#[async_trait]
pub trait EvidenceAnalyst: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(&self, question: &str) -> Result<String, AgentError>;
}

/// An analyst backed by the Claude CLI.
pub struct ClaudeAnalyst {
    pub name: String,
    pub cli_config: ClaudeCliConfig,
}

impl ClaudeAnalyst {
    pub fn new(name: String, model: String, timeout: std::time::Duration) -> Self {
        Self {
            name,
            cli_config: ClaudeCliConfig { model, timeout },
        }
    }
}

#[async_trait]
impl EvidenceAnalyst for ClaudeAnalyst {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, question: &str) -> Result<String, AgentError> {
        let system_prompt = analyst_system_prompt();
        let user_prompt = analyst_user_prompt(question);
        invoke_claude(&system_prompt, &user_prompt, &self.cli_config).await
    }
}
