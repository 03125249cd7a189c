//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::contract::IsaTerms;
use crate::degree::CompletionDelays;
use crate::economy::EconomicParams;
use crate::impact::{CounterfactualParams, ImpactParams};
use crate::input::{
    define_param_default, define_unit_param_default, deserialise_proportion, input_err_msg,
    read_toml,
};
use crate::output::BASE_SCENARIO_NAME;
use crate::pool::PoolParams;
use crate::program::ProgramType;
use crate::student::{LanguageParams, StudentParams};
use crate::units::{Dimensionless, HostMoney};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::warn;
use serde::Deserialize;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

define_param_default!(default_num_sims, u32, 1);
define_unit_param_default!(default_home_return_probability, Dimensionless, 0.1);

/// Agreement terms from the `[isa]` table.
///
/// Terms left out are taken from the program's defaults.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct IsaOverrides {
    pub percentage: Option<Dimensionless>,
    pub cap: Option<HostMoney>,
    pub threshold: Option<HostMoney>,
    pub max_payment_years: Option<u32>,
    pub default_unemployment_years: Option<u32>,
    pub price_per_student: Option<HostMoney>,
}

impl IsaOverrides {
    /// Fill in the gaps with the program's default terms
    pub fn resolve(&self, program: ProgramType) -> IsaTerms {
        let defaults = program.default_terms();
        IsaTerms {
            percentage: self.percentage.unwrap_or(defaults.percentage),
            cap: self.cap.unwrap_or(defaults.cap),
            threshold: self.threshold.unwrap_or(defaults.threshold),
            max_payment_years: self.max_payment_years.unwrap_or(defaults.max_payment_years),
            default_unemployment_years: self
                .default_unemployment_years
                .unwrap_or(defaults.default_unemployment_years),
            price_per_student: self.price_per_student.unwrap_or(defaults.price_per_student),
        }
    }
}

/// A named reweighting of the model's degree mix, from a `[[scenarios]]` entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioParameters {
    pub name: String,
    /// Weight for each degree ID. Degrees left out are given no students.
    pub weights: IndexMap<String, Dimensionless>,
    /// Starting salaries are shifted by this many standard deviations
    #[serde(default)]
    pub earnings_shift: Option<Dimensionless>,
}

/// Represents the contents of the entire model file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelParameters {
    /// The kind of program being funded
    pub program: ProgramType,
    /// Cash in the pool at the start
    pub initial_investment: HostMoney,
    /// Number of periods (years) to simulate
    pub num_years: u32,
    /// Number of Monte Carlo runs
    #[serde(default = "default_num_sims")]
    pub num_sims: u32,
    /// Base seed. If left out, one is drawn at random and reported.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Probability that graduates of the program's default tracks return home
    #[serde(default = "default_home_return_probability")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub home_return_probability: Dimensionless,
    #[serde(default)]
    pub isa: IsaOverrides,
    #[serde(default)]
    pub economy: EconomicParams,
    #[serde(default)]
    pub impact: ImpactParams,
    #[serde(default)]
    pub counterfactual: CounterfactualParams,
    #[serde(default)]
    pub pool: PoolParams,
    #[serde(default)]
    pub student: StudentParams,
    #[serde(default)]
    pub language: Option<LanguageParams>,
    #[serde(default)]
    pub completion_delays: CompletionDelays,
    #[serde(default)]
    pub scenarios: Vec<ScenarioParameters>,
    /// Also run the five built-in percentile scenarios
    #[serde(default)]
    pub percentile_scenarios: bool,
}

/// Check that the `initial_investment` parameter is valid
fn check_initial_investment(value: HostMoney) -> Result<()> {
    ensure!(
        value.is_finite() && value > HostMoney(0.0),
        "initial_investment must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that scenario names are unique and non-empty
fn check_scenario_names(scenarios: &[ScenarioParameters]) -> Result<()> {
    for (i, scenario) in scenarios.iter().enumerate() {
        ensure!(!scenario.name.is_empty(), "Scenario names cannot be empty");
        ensure!(
            scenario.name != BASE_SCENARIO_NAME,
            "Scenario name {BASE_SCENARIO_NAME} is reserved for the base model"
        );
        ensure!(
            !scenarios[..i].iter().any(|other| other.name == scenario.name),
            "Duplicate scenario name {}",
            scenario.name
        );
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_initial_investment(self.initial_investment)?;
        ensure!(self.num_years > 0, "num_years cannot be zero");
        ensure!(self.num_sims > 0, "num_sims cannot be zero");

        self.isa
            .resolve(self.program)
            .validate()
            .context("Invalid ISA terms")?;
        self.economy
            .validate()
            .context("Invalid economic parameters")?;
        self.impact.validate().context("Invalid impact parameters")?;
        self.counterfactual
            .validate()
            .context("Invalid counterfactual parameters")?;
        self.pool.validate().context("Invalid pool parameters")?;
        self.student
            .validate()
            .context("Invalid student parameters")?;
        if let Some(language) = &self.language {
            language
                .validate()
                .context("Invalid language parameters")?;
        }
        self.completion_delays.validate()?;
        check_scenario_names(&self.scenarios)?;

        if self.percentile_scenarios && self.program == ProgramType::University {
            warn!(
                "The percentile scenarios describe vocational and nursing tracks, but the program \
                 is 'university'"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_model_file(dir: &Path, contents: &str) {
        let mut file = File::create(dir.join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[test]
    fn test_model_params_from_path() {
        let dir = tempdir().unwrap();
        write_model_file(
            dir.path(),
            "program = \"nurse\"\ninitial_investment = 1000000\nnum_years = 20",
        );

        let params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(params.program, ProgramType::Nurse);
        assert_eq!(params.initial_investment, HostMoney(1000000.0));
        assert_eq!(params.num_sims, 1);
        assert_eq!(params.seed, None);
        assert_eq!(params.home_return_probability, Dimensionless(0.1));
        assert_eq!(params.economy, EconomicParams::default());
        assert!(params.scenarios.is_empty());
    }

    #[test]
    fn test_model_params_tables() {
        let dir = tempdir().unwrap();
        write_model_file(
            dir.path(),
            r#"program = "trade"
initial_investment = 500000
num_years = 30
num_sims = 10
seed = 42

[isa]
percentage = 0.1

[economy]
initial_inflation_rate = 0.03

[economy.policy]
unemployment_bounds = [0.02, 0.3]

[pool]
reinvestment_cutoff_years = 10
performance_fee = 0.15

[language]
pass_probability = 0.8
study_years = 1

[[scenarios]]
name = "optimistic"
weights = {TRADE = 0.6, ASST = 0.4}
earnings_shift = 0.5
"#,
        );

        let params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(params.seed, Some(42));
        assert_eq!(params.economy.initial_inflation_rate, Dimensionless(0.03));
        assert_eq!(
            params.economy.policy.unemployment_bounds,
            (Dimensionless(0.02), Dimensionless(0.3))
        );
        assert_eq!(params.pool.reinvestment_cutoff_years, 10);
        assert_eq!(params.pool.performance_fee, Dimensionless(0.15));
        assert_eq!(params.language.unwrap().study_years, 1);
        assert_eq!(params.scenarios[0].weights.len(), 2);

        let terms = params.isa.resolve(params.program);
        assert_eq!(terms.percentage, Dimensionless(0.1));
        assert_eq!(terms.cap, HostMoney(45000.0));
    }

    #[test]
    fn test_unknown_program() {
        let dir = tempdir().unwrap();
        write_model_file(
            dir.path(),
            "program = \"law\"\ninitial_investment = 1000000\nnum_years = 20",
        );
        assert!(ModelParameters::from_path(dir.path()).is_err());
    }

    #[rstest]
    #[case(1.0, true)]
    #[case(0.0, false)]
    #[case(-1.0, false)]
    #[case(f64::INFINITY, false)]
    #[case(f64::NAN, false)]
    fn test_check_initial_investment(#[case] value: f64, #[case] expected_valid: bool) {
        assert_eq!(
            check_initial_investment(HostMoney(value)).is_ok(),
            expected_valid
        );
    }

    #[test]
    fn test_check_scenario_names() {
        let scenario = |name: &str| ScenarioParameters {
            name: name.into(),
            weights: IndexMap::new(),
            earnings_shift: None,
        };

        assert!(check_scenario_names(&[scenario("a"), scenario("b")]).is_ok());
        assert_error!(
            check_scenario_names(&[scenario("a"), scenario("a")]),
            "Duplicate scenario name a"
        );
        assert_error!(
            check_scenario_names(&[scenario("")]),
            "Scenario names cannot be empty"
        );
        assert_error!(
            check_scenario_names(&[scenario("base")]),
            "Scenario name base is reserved for the base model"
        );
    }

    #[test]
    fn test_invalid_isa_override() {
        let dir = tempdir().unwrap();
        write_model_file(
            dir.path(),
            "program = \"nurse\"\ninitial_investment = 1000000\nnum_years = 20\n\n\
             [isa]\npercentage = 0",
        );
        assert!(ModelParameters::from_path(dir.path()).is_err());
    }
}
