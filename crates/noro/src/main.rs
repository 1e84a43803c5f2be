use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use noro_models::{MarketRequest, NoroConfig};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config/noro.toml";

#[derive(Parser, Debug)]
#[command(name = "noro", about = "Prediction-market evaluation pipeline")]
struct Cli {
    /// Path to configuration file (defaults apply when config/noro.toml is absent)
    #[arg(short, long)]
    config: Option<String>,

    /// Market question; repeat for batch mode. Read from stdin, one per line, when omitted
    #[arg(short, long)]
    question: Vec<String>,

    /// Bankroll to size against (batch mode splits it evenly)
    #[arg(short, long)]
    bankroll: Option<Decimal>,

    /// Extra analysis calls per market
    #[arg(short, long)]
    repeat: Option<u32>,

    /// Decimal odds offered on the side being bought, enables Kelly sizing
    #[arg(long)]
    odds: Option<f64>,

    /// External market identifier, echoed into the report
    #[arg(long)]
    market_id: Option<String>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

fn load_config(path: Option<&str>) -> Result<NoroConfig> {
    let path = match path {
        Some(p) => p,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => DEFAULT_CONFIG_PATH,
        None => return Ok(NoroConfig::default()),
    };
    let config_str =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config: {path}"))?;
    toml::from_str(&config_str).with_context(|| format!("Failed to parse config: {path}"))
}

fn read_questions(cli_questions: Vec<String>) -> Result<Vec<String>> {
    if !cli_questions.is_empty() {
        return Ok(cli_questions);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read questions from stdin")?;
    Ok(buf
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(repeat) = cli.repeat {
        config.agents.repeat_count = repeat;
    }
    let bankroll = cli.bankroll.unwrap_or(config.sizing.default_bankroll);

    let mut questions = read_questions(cli.question)?;
    if questions.is_empty() {
        anyhow::bail!("No market question given (use --question or pipe questions on stdin)");
    }

    let orchestrator =
        Arc::new(noro::build_orchestrator(&config).context("Failed to build orchestrator")?);

    let output = if questions.len() > 1 {
        if cli.odds.is_some() || cli.market_id.is_some() {
            warn!("--odds and --market-id apply to single-market runs only, ignoring");
        }
        let reports = orchestrator
            .batch_process(questions, bankroll)
            .await
            .map_err(|e| anyhow::anyhow!("Batch evaluation failed: {e}"))?;
        to_json(&reports, cli.pretty)?
    } else {
        let mut request = MarketRequest::new(questions.swap_remove(0), bankroll)
            .with_repeat_count(config.agents.repeat_count);
        if let Some(odds) = cli.odds {
            request = request.with_decimal_odds(odds);
        }
        if let Some(market_id) = cli.market_id {
            request = request.with_market_id(market_id);
        }

        let cancel = CancellationToken::new();
        let ctrl_c_token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, cancelling evaluation");
                ctrl_c_token.cancel();
            }
        });

        let report = orchestrator
            .process_market_with_cancel(&request, &cancel)
            .await
            .map_err(|e| anyhow::anyhow!("Evaluation failed: {e}"))?;
        to_json(&report, cli.pretty)?
    };

    // Output report(s) as JSON to stdout
    println!("{output}");

    Ok(())
}
