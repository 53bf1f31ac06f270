//! qc-run: apply a test configuration to a time series frame.
//!
//! Reads the data frame as JSON and the test table as YAML, runs every test
//! and writes the flag export and the (possibly interpolated) data back out.
//! Flags from an earlier run (`--state-out`) can be fed back in with
//! `--flags-in`; they are merged under the flags of this run.
//! Runtime settings come from `QC_*` environment variables (see `.env`).

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use tsqc_core::config::load_dotenv;
use tsqc_core::{QcSettings, TimeSeriesFrame};
use tsqc_rules::{ConfigTable, FlagTable, QcRunner};

// ── CLI ─────────────────────────────────────────────────────────────

/// Run configured quality-control tests over a time series.
#[derive(Parser, Debug)]
#[command(name = "qc-run", version, about)]
struct Cli {
    /// JSON data frame: `{"index": [...], "columns": {...}}`.
    #[arg(long, env = "QC_DATA")]
    data: PathBuf,

    /// YAML test configuration table.
    #[arg(long, env = "QC_CONFIG")]
    config: PathBuf,

    /// Flag state of an earlier run, as written by `--state-out`.
    #[arg(long, env = "QC_FLAGS_IN")]
    flags_in: Option<PathBuf>,

    /// Where to write the flag export (stdout when omitted).
    #[arg(long)]
    flags_out: Option<PathBuf>,

    /// Where to write the processed data frame.
    #[arg(long)]
    data_out: Option<PathBuf>,

    /// Where to write the full flag state for a later `--flags-in`.
    #[arg(long)]
    state_out: Option<PathBuf>,
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let settings = QcSettings::from_env();
    settings.log_summary();

    let raw = fs::read_to_string(&cli.data)
        .with_context(|| format!("failed to read data file {}", cli.data.display()))?;
    let data = TimeSeriesFrame::from_json_str(&raw).context("failed to parse data frame")?;
    let config = ConfigTable::from_yaml_file(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    let prior = match &cli.flags_in {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read flags file {}", path.display()))?;
            let flags = FlagTable::from_json_str(&raw).context("failed to parse prior flags")?;
            info!(path = %path.display(), samples = flags.len(), "loaded prior flags");
            Some(flags)
        }
        None => None,
    };

    let mut runner = QcRunner::from_settings(&settings);
    let output = runner.run(&config, data, prior)?;

    let export = output.flags.export(runner.flagger())?;
    let flags_json = serde_json::to_string_pretty(&export)?;
    match &cli.flags_out {
        Some(path) => {
            fs::write(path, flags_json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote flags");
        }
        None => println!("{flags_json}"),
    }

    if let Some(path) = &cli.data_out {
        fs::write(path, output.data.to_json_string()?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote data");
    }

    if let Some(path) = &cli.state_out {
        fs::write(path, output.flags.to_json_string()?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote flag state");
    }

    info!(
        run_id = %output.report.run_id,
        evaluated = output.report.cells_evaluated,
        skipped = output.report.skipped.len(),
        "done"
    );
    Ok(())
}
