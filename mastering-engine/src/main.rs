//! mastering-plan: derive clamped mastering parameters from interchange JSON
//!
//! Reads an AnalysisSnapshot JSON file and, optionally, a raw decision JSON
//! file (or asks the configured oracles), then prints the clamped Params as
//! JSON on stdout. No audio is decoded or rendered.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mastering_common::config::{init_logging, TomlConfig};
use mastering_common::{AnalysisSnapshot, Decision, DistributionTarget, RawDecision};
use mastering_engine::advisory::AdvisoryPanel;
use mastering_engine::{normalize, plan_params, resolve_specifics};
use tracing::info;

/// Command-line arguments for mastering-plan
#[derive(Parser, Debug)]
#[command(name = "mastering-plan")]
#[command(about = "Derive clamped mastering parameters from an analysis snapshot")]
#[command(version)]
struct Args {
    /// AnalysisSnapshot JSON file
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Raw decision JSON file; repaired before use
    #[arg(short, long)]
    decision: Option<PathBuf>,

    /// Distribution target (streaming or club)
    #[arg(short, long, default_value = "streaming")]
    target: DistributionTarget,

    /// Config file (overrides MASTERING_CONFIG and the default location)
    #[arg(short, long, env = "MASTERING_CONFIG")]
    config: Option<PathBuf>,

    /// Ask the configured oracles when no decision file is given
    #[arg(long)]
    ask_oracle: bool,

    /// Print gain estimate and risk alongside the parameters
    #[arg(long)]
    report: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_source) =
        TomlConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging);
    config_source.log();

    info!(
        "Starting mastering-plan v{} (target: {:?})",
        env!("CARGO_PKG_VERSION"),
        args.target
    );

    let snapshot_text = std::fs::read_to_string(&args.snapshot)
        .with_context(|| format!("Failed to read snapshot {}", args.snapshot.display()))?;
    let snapshot: AnalysisSnapshot =
        serde_json::from_str(&snapshot_text).context("Snapshot is not a valid AnalysisSnapshot")?;

    let specifics = resolve_specifics(args.target);

    let decision = match (&args.decision, args.ask_oracle) {
        (Some(path), _) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read decision {}", path.display()))?;
            // Any JSON at all goes through repair; non-objects become defaults
            let value: serde_json::Value = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
            normalize(&RawDecision::from_value(value))
        }
        (None, true) => {
            let panel = AdvisoryPanel::from_settings(&config.oracle).context("Invalid oracle configuration")?;
            let panel_decision = panel
                .decide(&snapshot, &specifics)
                .await
                .context("Advisory oracle unavailable")?;
            info!(path = %panel_decision.path, "Decision from oracle panel");
            panel_decision.decision
        }
        (None, false) => Decision::default(),
    };

    let (derivation, params) = plan_params(&decision, &snapshot, &specifics);

    let output = if args.report {
        serde_json::json!({
            "specifics": specifics,
            "decision": decision,
            "rawGainDb": derivation.gain.raw_db,
            "boundedGainDb": derivation.gain.bounded_db,
            "risk": derivation.risk,
            "lowEndCollision": derivation.collision,
            "params": params,
        })
    } else {
        serde_json::to_value(&params)?
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
