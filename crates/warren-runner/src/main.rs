//! Headless driver for the rabbits-and-grass simulation.

mod telemetry;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use warren_core::{Error, SimulationConfig};
use warren_world::SimulationEngine;

#[derive(Parser)]
#[command(name = "warren")]
#[command(version)]
#[command(about = "Rabbits eating grass on a torus")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and print its summary as JSON
    Run {
        /// Configuration file (JSON); defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of ticks to simulate (overrides the config)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Random seed (overrides the config)
        #[arg(long)]
        seed: Option<u64>,

        /// Log population metrics every N ticks (overrides the config)
        #[arg(long)]
        report_every: Option<u64>,
    },

    /// Write the default configuration to a file
    Init {
        /// Output path
        #[arg(short, long, default_value = "warren.json")]
        output: PathBuf,
    },

    /// Check a configuration file and list every problem with it
    Validate {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_telemetry(cli.json_logs)?;

    match cli.command {
        Commands::Run {
            config,
            ticks,
            seed,
            report_every,
        } => run_simulation(config.as_deref(), ticks, seed, report_every),
        Commands::Init { output } => write_default_config(&output),
        Commands::Validate { config } => validate_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    match path {
        Some(path) => {
            info!("Loading config from {}", path.display());
            SimulationConfig::from_file(path)
                .with_context(|| format!("reading config {}", path.display()))
        }
        None => {
            info!("Using default configuration");
            Ok(SimulationConfig::default())
        }
    }
}

fn run_simulation(
    config_path: Option<&Path>,
    ticks: Option<u64>,
    seed: Option<u64>,
    report_every: Option<u64>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(ticks) = ticks {
        config.num_ticks = ticks;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }
    if let Some(interval) = report_every {
        config.report_interval = interval;
    }

    let num_ticks = config.num_ticks;
    let mut engine = match SimulationEngine::new(config) {
        Ok(engine) => engine,
        Err(Error::InvalidConfig(violations)) => {
            for violation in &violations {
                error!("{}", violation);
            }
            bail!("refusing to start: {} invalid parameter(s)", violations.len());
        }
        Err(e) => return Err(e.into()),
    };

    let summary = engine.run(num_ticks);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn write_default_config(output: &Path) -> Result<()> {
    SimulationConfig::default()
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;
    info!("Wrote default configuration to {}", output.display());
    Ok(())
}

fn validate_config(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;
    let violations = config.violations();
    if violations.is_empty() {
        println!("{}: ok", path.display());
        return Ok(());
    }

    for violation in &violations {
        println!("{}: {}", path.display(), violation);
    }
    bail!("{} invalid parameter(s)", violations.len())
}
