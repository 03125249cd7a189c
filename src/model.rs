//! The model represents the static input data provided by the user.
use crate::degree::DegreeMix;
use crate::input::degree::read_degrees;
use crate::simulation::{Scenario, SimulationConfig, percentile_scenarios};
use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};

pub mod parameters;
pub use parameters::{IsaOverrides, ModelParameters, ScenarioParameters};

/// Model definition
#[derive(Debug, Clone)]
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// The career tracks students are enrolled on
    pub degrees: DegreeMix,
    /// Alternative degree mixes to run alongside the base model
    pub scenarios: Vec<Scenario>,
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model or an error if any of its files are missing or invalid.
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        let model_dir = model_dir.as_ref();
        let parameters = ModelParameters::from_path(model_dir)?;

        let degrees = match read_degrees(model_dir)? {
            Some(degrees) => degrees,
            None => {
                info!(
                    "No degrees CSV file provided; using the default mix for the '{}' program",
                    parameters.program
                );
                parameters
                    .program
                    .default_degree_mix(parameters.home_return_probability)?
            }
        };

        let mut scenarios = parameters
            .scenarios
            .iter()
            .map(|scenario| -> Result<Scenario> {
                let scenario_degrees = degrees
                    .reweighted(&scenario.weights)
                    .with_context(|| format!("Invalid weights for scenario {}", scenario.name))?;

                Ok(Scenario {
                    name: scenario.name.clone(),
                    degrees: scenario_degrees,
                    earnings_shift: scenario.earnings_shift,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if parameters.percentile_scenarios {
            scenarios.extend(percentile_scenarios()?);
        }

        let model = Model {
            model_path: model_dir.to_path_buf(),
            parameters,
            degrees,
            scenarios,
        };
        model.simulation_config().validate()?;

        Ok(model)
    }

    /// The configuration for a run of the base model
    pub fn simulation_config(&self) -> SimulationConfig {
        let params = &self.parameters;

        SimulationConfig {
            program: params.program,
            initial_investment: params.initial_investment,
            num_years: params.num_years,
            isa: params.isa.resolve(params.program),
            economy: params.economy.clone(),
            degrees: self.degrees.clone(),
            completion_delays: params.completion_delays.clone(),
            student: params.student.clone(),
            counterfactual: params.counterfactual.clone(),
            language: params.language.clone(),
            impact: params.impact.clone(),
            pool: params.pool.clone(),
        }
    }
}
