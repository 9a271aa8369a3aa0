//! coincrank CLI

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use cr_core::{RankingStatistic, TriggerBatch};
use cr_rank::{CalibrationStore, Statistic, StatisticKind};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "coincrank")]
#[command(about = "coincrank - Coincident-detection ranking statistics")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered statistics
    List,

    /// Compute single-detector features for one trigger batch
    Single {
        /// Statistic name (see `coincrank list`)
        #[arg(short, long)]
        stat: String,

        /// Trigger batch (JSON)
        #[arg(short, long)]
        trigs: PathBuf,

        /// Calibration tables (JSON); repeat for several files
        #[arg(short, long)]
        calibration: Vec<PathBuf>,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rank coincidences between two aligned trigger batches
    Coinc {
        /// Statistic name (see `coincrank list`)
        #[arg(short, long)]
        stat: String,

        /// Trigger batch of the first detector (JSON)
        #[arg(long)]
        first: PathBuf,

        /// Trigger batch of the second detector (JSON), aligned with `--first`
        #[arg(long)]
        second: PathBuf,

        /// Per-coincidence slide multiples (JSON array of integers)
        #[arg(long, conflicts_with = "slide_value")]
        slide: Option<PathBuf>,

        /// Slide multiple applied to every coincidence
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        slide_value: i64,

        /// Time-slide step (seconds)
        #[arg(long, default_value = "0.0")]
        step: f64,

        /// Calibration tables (JSON); repeat for several files
        #[arg(short, long)]
        calibration: Vec<PathBuf>,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::List => cmd_list(),
        Commands::Single { stat, trigs, calibration, output } => {
            cmd_single(&stat, &trigs, &calibration, output.as_ref())
        }
        Commands::Coinc {
            stat,
            first,
            second,
            slide,
            slide_value,
            step,
            calibration,
            output,
        } => cmd_coinc(
            &stat,
            &first,
            &second,
            slide.as_ref(),
            slide_value,
            step,
            &calibration,
            output.as_ref(),
        ),
        Commands::Version => {
            println!("coincrank {}", cr_core::VERSION);
            Ok(())
        }
    }
}

fn cmd_list() -> Result<()> {
    for kind in StatisticKind::ALL {
        let note = if kind.needs_calibration() { "  (requires calibration)" } else { "" };
        println!("{}{note}", kind.name());
    }
    Ok(())
}

fn cmd_single(
    stat: &str,
    trigs: &PathBuf,
    calibration: &[PathBuf],
    output: Option<&PathBuf>,
) -> Result<()> {
    let statistic = load_statistic(stat, calibration)?;
    let batch = load_trigs(trigs)?;
    let features = statistic.single(&batch)?;
    tracing::info!(stat = statistic.name(), n_events = features.len(), "single features computed");

    let output_json = serde_json::json!({
        "stat": statistic.name(),
        "ifo": batch.ifo(),
        "n_events": features.len(),
        "features": features,
    });
    write_json(output, output_json)
}

#[allow(clippy::too_many_arguments)]
fn cmd_coinc(
    stat: &str,
    first: &PathBuf,
    second: &PathBuf,
    slide: Option<&PathBuf>,
    slide_value: i64,
    step: f64,
    calibration: &[PathBuf],
    output: Option<&PathBuf>,
) -> Result<()> {
    let statistic = load_statistic(stat, calibration)?;
    let b1 = load_trigs(first)?;
    let b2 = load_trigs(second)?;
    if b1.n_events() != b2.n_events() {
        bail!(
            "trigger batches are not aligned: {} has {} triggers, {} has {}",
            first.display(),
            b1.n_events(),
            second.display(),
            b2.n_events()
        );
    }

    let slide = match slide {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read slide file {}", path.display()))?;
            serde_json::from_str::<Vec<i64>>(&text)
                .with_context(|| format!("parse slide file {}", path.display()))?
        }
        None => vec![slide_value],
    };

    let s1 = statistic.single(&b1)?;
    let s2 = statistic.single(&b2)?;
    let ranked = statistic.coinc(&s1, &s2, &slide, step)?;
    tracing::info!(stat = statistic.name(), n_coincs = ranked.len(), "coincidences ranked");

    let output_json = serde_json::json!({
        "stat": statistic.name(),
        "ifos": [b1.ifo(), b2.ifo()],
        "n_coincs": ranked.len(),
        "step": step,
        "ranking": ranked,
    });
    write_json(output, output_json)
}

fn load_statistic(name: &str, calibration: &[PathBuf]) -> Result<Statistic> {
    let kind: StatisticKind = name.parse()?;
    tracing::info!(stat = %kind, n_files = calibration.len(), "loading statistic");
    let store = CalibrationStore::open(calibration)?;
    Ok(Statistic::from_store(kind, &store)?)
}

fn load_trigs(path: &PathBuf) -> Result<TriggerBatch> {
    tracing::info!(path = %path.display(), "loading trigger batch");
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("read trigger batch {}", path.display()))?;
    let batch: TriggerBatch = serde_json::from_str(&json)
        .with_context(|| format!("parse trigger batch {}", path.display()))?;
    tracing::debug!(n_events = batch.n_events(), ifo = ?batch.ifo(), "trigger batch loaded");
    Ok(batch)
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
