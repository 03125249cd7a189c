//! Named degree-mix scenarios, run as separate batches with a common seed.
use super::batch::{BatchResult, run_batch};
use super::SimulationConfig;
use crate::degree::{CompletionTier, DegreeMix, DegreeProfile};
use crate::units::Dimensionless;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::info;

/// A named alternative degree mix, optionally with shifted starting salaries
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub degrees: DegreeMix,
    /// Starting salaries are shifted by this many standard deviations
    pub earnings_shift: Option<Dimensionless>,
}

impl Scenario {
    /// A copy of `config` with this scenario's degree mix
    pub fn apply(&self, config: &SimulationConfig) -> Result<SimulationConfig> {
        let degrees = match self.earnings_shift {
            Some(z) => self.degrees.with_earnings_shift(z)?,
            None => self.degrees.clone(),
        };

        Ok(SimulationConfig {
            degrees,
            ..config.clone()
        })
    }
}

/// The vocational/nursing outcome distribution at five percentiles, from pessimistic to
/// optimistic
pub fn percentile_scenarios() -> Result<Vec<Scenario>> {
    const SCENARIOS: [(&str, [f64; 3], f64); 5] = [
        ("P10", [0.4, 0.1, 0.5], -1.28),
        ("P25", [0.5, 0.15, 0.35], -0.67),
        ("P50", [0.5, 0.3, 0.2], 0.0),
        ("P75", [0.55, 0.4, 0.05], 0.67),
        ("P90", [0.3, 0.65, 0.05], 1.28),
    ];

    SCENARIOS
        .iter()
        .map(|(name, [voc, nurse, na], shift)| {
            let middle = CompletionTier::Middle;
            let degrees = DegreeMix::new([
                (
                    DegreeProfile::new("VOC", 31500.0, 4800.0, 0.01, 3, 0.15, middle),
                    Dimensionless(*voc),
                ),
                (
                    DegreeProfile::new("NURSE", 44000.0, 8000.0, 0.03, 4, 0.05, middle),
                    Dimensionless(*nurse),
                ),
                (
                    DegreeProfile::non_completion("NA", 2200.0, 500.0, 0.01, 0),
                    Dimensionless(*na),
                ),
            ])
            .with_context(|| format!("Invalid degree mix for scenario {name}"))?;

            Ok(Scenario {
                name: (*name).into(),
                degrees,
                earnings_shift: Some(Dimensionless(*shift)),
            })
        })
        .collect()
}

/// Run a batch for every scenario, all with the same base seed.
///
/// # Arguments
///
/// * `config` - The base configuration, whose degree mix each scenario replaces
/// * `scenarios` - The scenarios to run
/// * `num_sims` - Number of runs per scenario
/// * `base_seed` - Seed for the first run of every batch
pub fn run_scenarios(
    config: &SimulationConfig,
    scenarios: &[Scenario],
    num_sims: u32,
    base_seed: u64,
) -> Result<IndexMap<String, BatchResult>> {
    let mut results = IndexMap::new();
    for scenario in scenarios {
        info!("Running scenario {}", scenario.name);
        let scenario_config = scenario.apply(config)?;
        let batch = run_batch(&scenario_config, num_sims, base_seed)
            .with_context(|| format!("Scenario {} failed", scenario.name))?;
        results.insert(scenario.name.clone(), batch);
    }

    Ok(results)
}
