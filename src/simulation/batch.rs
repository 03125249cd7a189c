//! Running many independently seeded simulations and summarising their outcomes.
use super::{RunResult, SimulationConfig, run};
use crate::contract::ExitReason;
use anyhow::{Result, ensure};
use itertools::Itertools;
use log::{error, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use strum::IntoEnumIterator;

/// Summary statistics over a set of runs
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

impl Stats {
    /// Calculate statistics for the given values.
    ///
    /// NaN values are excluded. Infinite values are kept, so a batch in which a pool ran out of
    /// cash reports an IRR of `-inf` rather than hiding the loss. If there are no values, every
    /// statistic is NaN.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let sorted: Vec<f64> = values
            .into_iter()
            .filter(|value| !value.is_nan())
            .sorted_by(f64::total_cmp)
            .collect();
        if sorted.is_empty() {
            return Self {
                mean: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
                p10: f64::NAN,
                p50: f64::NAN,
                p90: f64::NAN,
            };
        }

        Self {
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p10: percentile(&sorted, 10.0),
            p50: percentile(&sorted, 50.0),
            p90: percentile(&sorted, 90.0),
        }
    }
}

/// Linearly interpolated percentile of sorted, non-empty data.
///
/// Interpolating towards an infinite neighbour gives that infinity.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let (low, high) = (sorted[lower], sorted[upper]);

    if lower == upper || low == high || low.is_infinite() {
        low
    } else if high.is_infinite() {
        high
    } else {
        low + (high - low) * (rank - lower as f64)
    }
}

/// Per-period averages across runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub period: u32,
    pub mean_cash: f64,
    pub mean_returns: f64,
    pub mean_active_contracts: f64,
    pub mean_cumulative_exits: f64,
}

/// Mean number of exits for each reason
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MeanExits {
    pub payment_cap: f64,
    pub years_cap: f64,
    pub home_return: f64,
    pub default: f64,
}

/// Aggregate outcomes of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub num_runs: u32,
    pub irr: Stats,
    pub real_irr: Stats,
    pub final_cash: Stats,
    pub real_final_cash: Stats,
    pub students_funded: Stats,
    pub students_educated: Stats,
    pub total_payments: Stats,
    pub operator_fees: Stats,
    pub graduation_rate: Stats,
    pub avg_total_utility_gain: Stats,
    pub avg_total_utility_gain_with_extras: Stats,
    pub avg_earnings_gain: Stats,
    pub exits: MeanExits,
    #[serde(skip)]
    pub periods: Vec<PeriodSummary>,
}

impl BatchSummary {
    /// Summarise successful runs
    pub fn from_runs(runs: &[RunResult]) -> Self {
        let stats = |f: fn(&RunResult) -> f64| Stats::from_values(runs.iter().map(f));
        let num_runs = runs.len() as f64;
        let mean_exits = |reason| {
            runs.iter()
                .map(|run| f64::from(run.exit_counts.get(reason)))
                .sum::<f64>()
                / num_runs
        };

        let num_periods = runs.iter().map(|run| run.periods.len()).max().unwrap_or(0);
        let periods = (0..num_periods)
            .map(|index| {
                let snapshots: Vec<_> = runs
                    .iter()
                    .filter_map(|run| run.periods.get(index))
                    .collect();
                let n = snapshots.len() as f64;
                PeriodSummary {
                    period: index as u32,
                    mean_cash: snapshots.iter().map(|s| s.cash.value()).sum::<f64>() / n,
                    mean_returns: snapshots.iter().map(|s| s.returns.value()).sum::<f64>() / n,
                    mean_active_contracts: snapshots
                        .iter()
                        .map(|s| f64::from(s.active_contracts))
                        .sum::<f64>()
                        / n,
                    mean_cumulative_exits: snapshots
                        .iter()
                        .map(|s| f64::from(s.cumulative_exits))
                        .sum::<f64>()
                        / n,
                }
            })
            .collect();

        Self {
            num_runs: runs.len() as u32,
            irr: stats(|run| run.irr),
            real_irr: stats(|run| run.real_irr),
            final_cash: stats(|run| run.final_cash.value()),
            real_final_cash: stats(|run| run.real_final_cash.value()),
            students_funded: stats(|run| f64::from(run.total_students)),
            students_educated: stats(|run| f64::from(run.students_educated)),
            total_payments: stats(|run| run.total_payments.value()),
            operator_fees: stats(|run| run.operator_fees.value()),
            graduation_rate: stats(|run| run.graduation_rate().value()),
            avg_total_utility_gain: stats(|run| run.cohort.avg_total_utility_gain.value()),
            avg_total_utility_gain_with_extras: stats(|run| {
                run.cohort.avg_total_utility_gain_with_extras.value()
            }),
            avg_earnings_gain: stats(|run| run.cohort.avg_earnings_gain.value()),
            exits: MeanExits {
                payment_cap: mean_exits(ExitReason::PaymentCap),
                years_cap: mean_exits(ExitReason::YearsCap),
                home_return: mean_exits(ExitReason::HomeReturn),
                default: mean_exits(ExitReason::Default),
            },
            periods,
        }
    }
}

/// A run that could not be completed
#[derive(Debug, Clone, PartialEq)]
pub struct FailedRun {
    pub seed: u64,
    pub message: String,
}

/// The outcome of a batch of runs
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub base_seed: u64,
    /// Successful runs, paired with their seeds
    pub runs: Vec<(u64, RunResult)>,
    pub failures: Vec<FailedRun>,
    pub summary: BatchSummary,
}

/// Run the simulation `num_sims` times.
///
/// Run `i` is seeded with `base_seed + i`, so a batch can always be reproduced from its base seed.
/// Runs that fail are logged and left out of the summary.
///
/// # Arguments
///
/// * `config` - The simulation configuration
/// * `num_sims` - Number of runs
/// * `base_seed` - Seed for the first run
///
/// # Returns
///
/// The batch result, or an error if no runs were requested or every run failed.
pub fn run_batch(config: &SimulationConfig, num_sims: u32, base_seed: u64) -> Result<BatchResult> {
    ensure!(num_sims > 0, "num_sims cannot be zero");
    config.validate()?;

    let mut runs = Vec::with_capacity(num_sims as usize);
    let mut failures = Vec::new();
    for i in 0..num_sims {
        let seed = base_seed.wrapping_add(u64::from(i));
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        match run(config, &mut rng) {
            Ok(result) => runs.push((seed, result)),
            Err(err) => {
                error!("Simulation run {i} (seed {seed}) failed: {err:?}");
                failures.push(FailedRun {
                    seed,
                    message: format!("{err:#}"),
                });
            }
        }
    }

    ensure!(!runs.is_empty(), "All {num_sims} simulation runs failed");
    if !failures.is_empty() {
        info!(
            "{} of {num_sims} simulation runs failed and were skipped",
            failures.len()
        );
    }

    let results: Vec<_> = runs.iter().map(|(_, run)| run.clone()).collect();
    let summary = BatchSummary::from_runs(&results);
    info!(
        "Completed {} runs: median IRR {:.4}, median final cash {:.2}",
        summary.num_runs, summary.irr.p50, summary.final_cash.p50
    );

    Ok(BatchResult {
        base_seed,
        runs,
        failures,
        summary,
    })
}

impl BatchResult {
    /// Number of exits for each reason, summed over every run
    pub fn total_exits(&self) -> Vec<(ExitReason, u32)> {
        ExitReason::iter()
            .map(|reason| {
                let count = self
                    .runs
                    .iter()
                    .map(|(_, run)| run.exit_counts.get(reason))
                    .sum();
                (reason, count)
            })
            .collect()
    }
}
