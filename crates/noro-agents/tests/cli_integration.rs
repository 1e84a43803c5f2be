//! Integration tests that invoke the real Claude CLI.
//!
//! These tests are `#[ignore]` by default. They require:
//! - The `claude` CLI installed and on PATH
//! - Valid Anthropic credentials configured
//!
//! Run explicitly with:
//! ```bash
//! cargo test -p noro-agents --test cli_integration -- --ignored
//! ```

use std::time::Duration;

use noro_agents::claude_cli::{check_cli_available, invoke_claude, ClaudeCliConfig};
use noro_agents::parser::{extract_anchored_object, parse_estimate, ParseTier};
use noro_agents::{ClaudeAnalyst, EvidenceAnalyst};

/// Verify the Claude CLI is installed and responds to --version.
#[tokio::test]
#[ignore]
async fn cli_is_available() {
    assert!(
        check_cli_available().await,
        "claude CLI not found on PATH, install it from https://docs.anthropic.com/en/docs/claude-code"
    );
}

/// Invoke the CLI with a trivial prompt and check the anchored object survives
/// whatever wrapping the CLI adds around it.
#[tokio::test]
#[ignore]
async fn cli_output_contains_anchored_object() {
    if !check_cli_available().await {
        eprintln!("Skipping: claude CLI not available");
        return;
    }

    let config = ClaudeCliConfig {
        model: "claude-3-5-haiku-latest".to_string(),
        timeout: Duration::from_secs(30),
    };

    let system_prompt = concat!(
        "You are a test agent. Respond ONLY with a JSON object, no other text.\n",
        "The JSON must have exactly these fields:\n",
        "- \"status\": the string \"ok\"\n",
        "- \"echo\": repeat back the user's message exactly\n",
    );

    let raw = invoke_claude(system_prompt, "ping", &config)
        .await
        .expect("Claude CLI invocation failed");

    let object = extract_anchored_object(&raw, "status").unwrap_or_else(|| {
        panic!(
            "No object with a \"status\" key in CLI output.\n\
             This likely means the CLI output format has changed.\n\
             Raw output:\n---\n{raw}\n---"
        )
    });
    assert_eq!(object["status"], "ok", "Unexpected response structure: {object:?}");
}

/// A real analyst answer should parse without falling through to defaults.
#[tokio::test]
#[ignore]
async fn analyst_answer_is_parseable() {
    if !check_cli_available().await {
        eprintln!("Skipping: claude CLI not available");
        return;
    }

    let analyst = ClaudeAnalyst::new(
        "analyst".to_string(),
        "claude-3-5-haiku-latest".to_string(),
        Duration::from_secs(90),
    );
    let raw = analyst
        .analyze("Will the sun rise tomorrow in London?")
        .await
        .expect("analyst call failed");

    let (estimate, tier) = parse_estimate(&raw);
    assert_ne!(tier, ParseTier::Defaulted, "Raw output:\n---\n{raw}\n---");
    assert!(estimate.probability() > 0.5);
}

/// Verify that the CLI returns a non-zero exit code for an invalid model,
/// and that our error handling captures it correctly.
#[tokio::test]
#[ignore]
async fn cli_reports_errors_for_invalid_model() {
    if !check_cli_available().await {
        eprintln!("Skipping: claude CLI not available");
        return;
    }

    let config = ClaudeCliConfig {
        model: "nonexistent-model-12345".to_string(),
        timeout: Duration::from_secs(15),
    };

    let result = invoke_claude("You are a test.", "hello", &config).await;

    assert!(
        result.is_err(),
        "Expected error for invalid model, got: {:?}",
        result.unwrap()
    );
}
