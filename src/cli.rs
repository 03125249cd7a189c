//! The command line interface for the simulation.
use crate::log;
use crate::model::Model;
use crate::output::{
    BASE_SCENARIO_NAME, DataWriter, create_output_directory, get_output_dir, write_metadata,
    write_summary,
};
use crate::settings::Settings;
use crate::simulation::{BatchResult, run_batch, run_scenarios};
use ::log::{info, warn};
use anyhow::{Context, Result, ensure};
use clap::{Args, CommandFactory, Parser, Subcommand};
use indexmap::IndexMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};

pub mod settings;
use settings::SettingsSubcommands;

/// The largest seed that can be written to the TOML output files
const MAX_SEED: u64 = i64::MAX as u64;

/// The command line interface for the simulation.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to write the outcomes of every student to file
    #[arg(long)]
    pub debug_model: bool,
    /// Number of runs per batch (overrides `num_sims` in the model)
    #[arg(long)]
    pub num_sims: Option<u32>,
    /// Seed for the first run (overrides `seed` in the model)
    #[arg(long, value_parser = clap::value_parser!(u64).range(..=MAX_SEED))]
    pub seed: Option<u64>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a simulation model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Validate a model.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and execute the requested command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let mut settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // These settings can be overridden by command-line arguments
    if opts.debug_model {
        settings.debug_model = true;
    }
    if opts.overwrite {
        settings.overwrite = true;
    }

    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(model_path)?;
        &pathbuf
    };

    let overwrite =
        create_output_directory(output_path, settings.overwrite).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    log::init(Some(&settings.log_level), Some(output_path))
        .context("Failed to initialise logging.")?;

    let model = Model::from_path(model_path).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    let num_sims = opts.num_sims.unwrap_or(model.parameters.num_sims);
    let base_seed = opts
        .seed
        .or(model.parameters.seed)
        .unwrap_or_else(draw_base_seed);
    check_seed(base_seed)?;
    info!("Running {num_sims} simulations per batch with base seed {base_seed}");

    let batches = run_model(&model, num_sims, base_seed)?;
    write_outputs(
        output_path,
        model_path,
        &batches,
        base_seed,
        num_sims,
        settings.debug_model,
    )?;
    info!("Simulation complete!");

    Ok(())
}

/// Check that a seed can be recorded in the output files
fn check_seed(seed: u64) -> Result<()> {
    ensure!(
        seed <= MAX_SEED,
        "Seed {seed} is too large: seeds must be no greater than {MAX_SEED}"
    );

    Ok(())
}

/// A random base seed, small enough to be written to TOML
fn draw_base_seed() -> u64 {
    u64::from(ChaCha8Rng::from_entropy().r#gen::<u32>())
}

/// Run the base model and every scenario
fn run_model(
    model: &Model,
    num_sims: u32,
    base_seed: u64,
) -> Result<IndexMap<String, BatchResult>> {
    let config = model.simulation_config();

    let base = run_batch(&config, num_sims, base_seed)?;
    log_summary(BASE_SCENARIO_NAME, &base);

    let mut batches = IndexMap::new();
    batches.insert(BASE_SCENARIO_NAME.to_string(), base);
    for (name, batch) in run_scenarios(&config, &model.scenarios, num_sims, base_seed)? {
        log_summary(&name, &batch);
        batches.insert(name, batch);
    }

    Ok(batches)
}

fn log_summary(name: &str, batch: &BatchResult) {
    let summary = &batch.summary;
    info!(
        "[{name}] IRR: median {:.2}% (p10 {:.2}%, p90 {:.2}%); real IRR median {:.2}%",
        summary.irr.p50 * 100.0,
        summary.irr.p10 * 100.0,
        summary.irr.p90 * 100.0,
        summary.real_irr.p50 * 100.0
    );
    info!(
        "[{name}] Students funded: {:.1}, educated: {:.1}; exits: {:.1} payment cap, {:.1} years \
         cap, {:.1} home return, {:.1} default",
        summary.students_funded.mean,
        summary.students_educated.mean,
        summary.exits.payment_cap,
        summary.exits.years_cap,
        summary.exits.home_return,
        summary.exits.default
    );
    info!(
        "[{name}] Average utility gain per graduate: {:.3} ({:.3} including health and migration)",
        summary.avg_total_utility_gain.mean, summary.avg_total_utility_gain_with_extras.mean
    );
}

fn write_outputs(
    output_path: &Path,
    model_path: &Path,
    batches: &IndexMap<String, BatchResult>,
    base_seed: u64,
    num_sims: u32,
    debug_model: bool,
) -> Result<()> {
    let mut writer = DataWriter::create(output_path, debug_model)?;
    for (name, batch) in batches {
        writer.write_batch(name, batch)?;
    }
    writer.flush()?;

    write_summary(output_path, base_seed, num_sims, batches)?;
    write_metadata(output_path, model_path, base_seed, num_sims)
        .context("Failed to save metadata")?;

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // We won't save log files when running the validate command
    log::init(Some(&settings.log_level), None).context("Failed to initialise logging.")?;

    Model::from_path(model_path).context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}
