use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kingdom_sim::{
    config::MONTHS_PER_YEAR, snapshot::SnapshotWriter, Engine, Scenario, ScenarioLoader,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless kingdom settlement simulation")]
struct Cli {
    /// Scenario YAML file (the built-in Windsor kingdom when omitted)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Override the scenario's random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Real seconds fed to the engine per step
    #[arg(long, default_value_t = 1.0 / 60.0)]
    frame_dt: f64,

    /// Write a snapshot every N simulated months (0 disables)
    #[arg(long, default_value_t = 0)]
    snapshot_interval: u64,

    /// Directory for snapshots
    #[arg(long, default_value = "snapshots")]
    snapshot_dir: PathBuf,

    /// Write the end-of-run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if !(cli.frame_dt.is_finite() && cli.frame_dt > 0.0) {
        anyhow::bail!("--frame-dt must be a positive number of seconds, got {}", cli.frame_dt);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kingdom_sim={}", cli.log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut scenario = match &cli.scenario {
        Some(path) => ScenarioLoader::new(".").load(path)?,
        None => Scenario::windsor(),
    };
    if let Some(seed) = cli.seed {
        scenario.seed = seed;
    }

    let mut engine = Engine::from_scenario(&scenario)?;
    let writer = SnapshotWriter::new(&cli.snapshot_dir, cli.snapshot_interval);
    let mut months: u64 = 0;
    let mut write_error = None;

    engine.run_to_completion(cli.frame_dt, |engine, summary| {
        months += 1;
        if summary.month == 1 {
            tracing::info!(
                time = %engine.time_label(),
                carts = engine.active_carts().len(),
                alive = summary.alive,
                score = summary.score,
                "year closed"
            );
        }
        if write_error.is_none() {
            if let Err(err) = writer.maybe_write(months, &engine.snapshot()) {
                write_error = Some(err);
            }
        }
    });
    if let Some(err) = write_error {
        return Err(err);
    }

    let report = engine.report();
    println!(
        "Scenario '{}' finished at {} after {} months ({} years). Score: {}. Survivors: {}/{}. Trades: {}. Disasters: {}.",
        report.scenario,
        report.final_time,
        months,
        months / u64::from(MONTHS_PER_YEAR),
        report.final_score,
        report.survivors.len(),
        report.survivors.len() + report.collapsed.len(),
        report.total_trades,
        report.disasters.len(),
    );

    if let Some(path) = &cli.report {
        report.write_json(path)?;
        tracing::info!(path = %path.display(), "report written");
    }
    Ok(())
}
