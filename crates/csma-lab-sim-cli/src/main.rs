use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use csma_lab_abstract::{
    Scenario, ScenarioAssertion, SimulationParameters, StrategyConfig, StrategyKind,
};
use csma_lab_simulator::{AggregateResult, RunObserver, SimulationReport, TrialRunner};

#[derive(Parser, Debug)]
#[command(author, version, about = "CSMA/CA medium contention simulator")]
struct Args {
    /// Number of contending nodes.
    #[arg(long, default_value_t = 100)]
    nodes: u32,

    /// Smallest packet size in bytes.
    #[arg(long, default_value_t = 64)]
    min_packet_size: u32,

    /// Largest packet size in bytes.
    #[arg(long, default_value_t = 1500)]
    max_packet_size: u32,

    /// Discrete time steps per trial.
    #[arg(long, default_value_t = 100)]
    steps: u32,

    /// Independent trials per run.
    #[arg(long, default_value_t = 1000)]
    trials: u32,

    /// Backoff policy: exponential, beb or adaptive-rate.
    #[arg(long, default_value = "exponential")]
    strategy: StrategyKind,

    /// Minimum contention window (beb, adaptive-rate).
    #[arg(long, default_value_t = 16)]
    cw_min: u32,

    /// Maximum contention window (beb, adaptive-rate).
    #[arg(long, default_value_t = 1024)]
    cw_max: u32,

    /// Window growth factor (adaptive-rate).
    #[arg(long, default_value_t = 2.0)]
    alpha: f64,

    /// Window shrink factor (adaptive-rate).
    #[arg(long, default_value_t = 0.5)]
    beta: f64,

    /// RNG seed for reproducible runs.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Run a scenario from disk instead of the flat flags above.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Write a JSON report of the finished run.
    #[arg(long)]
    report_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let report = if let Some(path) = &args.scenario {
        run_scenario(path, args.seed)?
    } else {
        run_flat(&args)?
    };

    if let Some(path) = &args.report_out {
        write_report(path, &report)?;
    }
    Ok(())
}

/// Logs each change in percentage so long runs stay visible without
/// flooding the output.
#[derive(Default)]
struct LogProgress {
    last: Option<u8>,
}

impl RunObserver for LogProgress {
    fn on_progress(&mut self, percent: u8) {
        if self.last != Some(percent) {
            info!("progress: {}%", percent);
            self.last = Some(percent);
        }
    }
}

fn run_flat(args: &Args) -> Result<SimulationReport> {
    let params = SimulationParameters {
        node_count: args.nodes,
        min_packet_size: args.min_packet_size,
        max_packet_size: args.max_packet_size,
        step_count: args.steps,
        trial_count: args.trials,
    };
    let strategy = StrategyConfig {
        kind: args.strategy,
        cw_min: args.cw_min,
        cw_max: args.cw_max,
        alpha: args.alpha,
        beta: args.beta,
    };

    let result = execute(&params, &strategy, args.seed)?;
    Ok(SimulationReport::new(
        &params,
        &strategy.kind.to_string(),
        args.seed,
        &result,
    ))
}

fn run_scenario(path: &Path, fallback_seed: u64) -> Result<SimulationReport> {
    let content = fs::read_to_string(path).context("Failed to read scenario file")?;
    let scenario: Scenario = toml::from_str(&content).context("Failed to parse scenario")?;

    info!("Running scenario: {}", scenario.name);
    if !scenario.description.is_empty() {
        info!("Description: {}", scenario.description);
    }

    let mut params = SimulationParameters::default();
    scenario.params.apply_to(&mut params);
    let seed = scenario.seed.unwrap_or(fallback_seed);

    let result = execute(&params, &scenario.strategy, seed)?;
    check_assertions(&scenario.assertions, &result)?;
    info!("All assertions passed.");

    Ok(SimulationReport::new(
        &params,
        &scenario.strategy.kind.to_string(),
        seed,
        &result,
    ))
}

fn execute(
    params: &SimulationParameters,
    strategy: &StrategyConfig,
    seed: u64,
) -> Result<AggregateResult> {
    let mut runner = TrialRunner::new(params.clone(), strategy.build(), seed);
    let result = runner.run(&mut LogProgress::default())?;
    info!(
        "{} successful transmissions, {} collisions, mean {:.2} collisions per trial",
        result.total_successful, result.total_collisions, result.mean_collisions
    );
    Ok(result)
}

fn check_assertions(assertions: &[ScenarioAssertion], result: &AggregateResult) -> Result<()> {
    for assertion in assertions {
        match assertion {
            ScenarioAssertion::MeanCollisions { min, max } => {
                if let Some(min) = min
                    && result.mean_collisions < *min
                {
                    return Err(anyhow!(
                        "Assertion Failed: mean collisions {:.3} < expected min {}",
                        result.mean_collisions,
                        min
                    ));
                }
                if let Some(max) = max
                    && result.mean_collisions > *max
                {
                    return Err(anyhow!(
                        "Assertion Failed: mean collisions {:.3} > expected max {}",
                        result.mean_collisions,
                        max
                    ));
                }
            }
            ScenarioAssertion::TotalSuccessful { min, max } => {
                if result.total_successful < *min {
                    return Err(anyhow!(
                        "Assertion Failed: {} successful transmissions, expected min {}",
                        result.total_successful,
                        min
                    ));
                }
                if let Some(max) = max
                    && result.total_successful > *max
                {
                    return Err(anyhow!(
                        "Assertion Failed: {} successful transmissions, expected max {}",
                        result.total_successful,
                        max
                    ));
                }
            }
            ScenarioAssertion::MaxCollisionsPerTrial { max } => {
                if let Some(point) = result.series.iter().find(|p| p.collisions > *max) {
                    return Err(anyhow!(
                        "Assertion Failed: trial {} had {} collisions, expected max {}",
                        point.trial_index,
                        point.collisions,
                        max
                    ));
                }
            }
        }
    }
    Ok(())
}

fn write_report(path: &Path, report: &SimulationReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("Failed to write report to {:?}", path))?;
    info!("Report written to {:?}", path);
    Ok(())
}
