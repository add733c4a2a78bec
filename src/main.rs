//! serial-recall: console front end for the recall experiments.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use recall_core::ModeKind;
use recall_experiment::{ExperimentConfig, SessionMachine};
use recall_log::{ResultLogger, allocate_participant, summarize_file};
use recall_timing::HighPrecisionTimer;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod console;

use app::App;
use console::Console;

#[derive(Parser)]
#[command(name = "serial-recall", version, about = "Serial recall memory experiments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one session
    Run {
        /// normal, speed, pattern, letters, clusters or words
        #[arg(long, default_value = "normal")]
        mode: ModeKind,

        /// TOML file overriding the default timings
        #[arg(long)]
        config: Option<PathBuf>,

        /// Where logs and participant ids are kept
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Fixed rng seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Summarize a mode's log
    Summary {
        #[arg(long)]
        mode: ModeKind,

        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Run {
            mode,
            config,
            data_dir,
            seed,
        } => run(mode, config.as_deref(), data_dir, seed),
        Commands::Summary { mode, data_dir } => summary(mode, &data_dir),
    }
}

fn run(mode: ModeKind, config: Option<&Path>, data_dir: PathBuf, seed: Option<u64>) -> Result<()> {
    let config = match config {
        Some(path) => ExperimentConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ExperimentConfig::default(),
    };
    let participant = allocate_participant(&data_dir).context("allocating participant id")?;
    let log = ResultLogger::csv(data_dir.clone())
        .with_context(|| format!("opening log directory {}", data_dir.display()))?;
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    info!(%mode, %participant, ?seed, "starting");

    let machine =
        SessionMachine::new(config, HighPrecisionTimer::new(), rng, log).with_participant(participant);
    let stdout = io::stdout();
    let clear = stdout.is_terminal();
    let mut app = App::new(machine, Console::new(stdout.lock(), clear), io::stdin().lock());
    app.run(mode)
}

fn summary(mode: ModeKind, data_dir: &Path) -> Result<()> {
    let path = recall_log::logger::log_path(data_dir, mode);
    match summarize_file(&path).with_context(|| format!("reading {}", path.display()))? {
        Some(summary) => println!("{mode} ({})\n{summary}", path.display()),
        None => println!("{mode}: no trials logged yet"),
    }
    Ok(())
}
