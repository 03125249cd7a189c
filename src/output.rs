//! The module responsible for writing output data to disk.
use crate::contract::ExitReason;
use crate::simulation::{BatchResult, BatchSummary};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

pub mod metadata;
pub use metadata::write_metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "isa_impact_results";

/// The output file name for per-period pool snapshots
const PERIODS_FILE_NAME: &str = "periods.csv";

/// The output file name for per-period means across runs
const PERIOD_MEANS_FILE_NAME: &str = "period_means.csv";

/// The output file name for contract exit counts
const EXITS_FILE_NAME: &str = "exits.csv";

/// The output file name for per-student impact
const STUDENTS_FILE_NAME: &str = "debug_students.csv";

/// The output file name for the summary of every batch
const SUMMARY_FILE_NAME: &str = "summary.toml";

/// Name given to the batch for the model's own degree mix
pub const BASE_SCENARIO_NAME: &str = "base";

/// Get the output folder for the model at the specified path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory.
///
/// A folder which already holds files is only reused if `allow_overwrite` is set, in which case
/// its contents are deleted.
///
/// # Returns
///
/// Whether an existing folder was overwritten
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete it, choose a different \
             folder or use the --overwrite option."
        );
        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Identifies the run a row of output belongs to
#[derive(Serialize, Debug, PartialEq)]
struct RunRow<'a> {
    scenario: &'a str,
    run: u32,
    seed: u64,
}

/// Represents a row in the exits CSV file
#[derive(Serialize, Debug, PartialEq)]
struct ExitRow {
    exit_reason: ExitReason,
    count: u32,
}

/// Represents a row in the period means CSV file
#[derive(Serialize, Debug, PartialEq)]
struct ScenarioRow<'a> {
    scenario: &'a str,
}

/// An object for writing batch results to file
pub struct DataWriter {
    periods_writer: csv::Writer<File>,
    period_means_writer: csv::Writer<File>,
    exits_writer: csv::Writer<File>,
    students_writer: Option<csv::Writer<File>>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to also write the outcomes of every student
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let students_writer = if save_debug_info {
            Some(new_writer(STUDENTS_FILE_NAME)?)
        } else {
            None
        };

        Ok(Self {
            periods_writer: new_writer(PERIODS_FILE_NAME)?,
            period_means_writer: new_writer(PERIOD_MEANS_FILE_NAME)?,
            exits_writer: new_writer(EXITS_FILE_NAME)?,
            students_writer,
        })
    }

    /// Write every run of a batch
    pub fn write_batch(&mut self, scenario: &str, batch: &BatchResult) -> Result<()> {
        for (run, (seed, result)) in batch.runs.iter().enumerate() {
            let run_row = || RunRow {
                scenario,
                run: run as u32,
                seed: *seed,
            };

            for snapshot in &result.periods {
                self.periods_writer.serialize((run_row(), snapshot))?;
            }

            for reason in ExitReason::iter() {
                let exit_row = ExitRow {
                    exit_reason: reason,
                    count: result.exit_counts.get(reason),
                };
                self.exits_writer.serialize((run_row(), exit_row))?;
            }

            if let Some(wtr) = &mut self.students_writer {
                for student in &result.students {
                    wtr.serialize((run_row(), student))?;
                }
            }
        }

        for period in &batch.summary.periods {
            self.period_means_writer
                .serialize((ScenarioRow { scenario }, period))?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.periods_writer.flush()?;
        self.period_means_writer.flush()?;
        self.exits_writer.flush()?;
        if let Some(wtr) = &mut self.students_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

/// The contents of the summary file
#[derive(Serialize)]
struct SummaryFile<'a> {
    base_seed: u64,
    num_sims: u32,
    scenarios: IndexMap<&'a str, &'a BatchSummary>,
}

/// Write the summary of every batch to a TOML file.
///
/// # Arguments
///
/// * `output_path` - Folder where the file will be saved
/// * `base_seed` - The seed every batch started from
/// * `num_sims` - Number of runs in each batch
/// * `batches` - Batch results, keyed by scenario name
pub fn write_summary(
    output_path: &Path,
    base_seed: u64,
    num_sims: u32,
    batches: &IndexMap<String, BatchResult>,
) -> Result<()> {
    let summary = SummaryFile {
        base_seed,
        num_sims,
        scenarios: batches
            .iter()
            .map(|(name, batch)| (name.as_str(), &batch.summary))
            .collect(),
    };

    let file_path = output_path.join(SUMMARY_FILE_NAME);
    let contents = toml::to_string(&summary).context("Could not convert summary to TOML")?;
    fs::write(&file_path, contents)
        .with_context(|| format!("Could not write {}", file_path.display()))?;

    Ok(())
}
