//! The macroeconomic environment in which students work and repay their agreements.
//!
//! Inflation and unemployment follow mean-reverting stochastic processes. Each period the ISA cap
//! and threshold are indexed to inflation, and a cumulative deflator is kept so that nominal
//! amounts can be converted back to period-0 terms.
use crate::input::{define_param_default, define_unit_param_default};
use crate::units::{Dimensionless, HostMoney};
use anyhow::{Result, ensure};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::Deserialize;

define_unit_param_default!(default_stable_inflation_weight, Dimensionless, 0.45);
define_unit_param_default!(default_current_inflation_weight, Dimensionless, 0.5);
define_unit_param_default!(default_inflation_shock_stdev, Dimensionless, 0.01);
define_unit_param_default!(default_stable_unemployment_weight, Dimensionless, 0.7);
define_unit_param_default!(default_current_unemployment_weight, Dimensionless, 0.2);
define_param_default!(default_unemployment_shock_mu, f64, -4.0);
define_param_default!(default_unemployment_shock_sigma, f64, 0.5);
define_param_default!(
    default_unemployment_bounds,
    (Dimensionless, Dimensionless),
    (Dimensionless(0.02), Dimensionless(0.15))
);
define_unit_param_default!(default_initial_inflation_rate, Dimensionless, 0.02);
define_unit_param_default!(default_initial_unemployment_rate, Dimensionless, 0.1);

/// Blend weights, shock sizes and bounds for the inflation and unemployment processes
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EconomicPolicy {
    /// Weight given to the stable inflation rate
    #[serde(default = "default_stable_inflation_weight")]
    pub stable_inflation_weight: Dimensionless,
    /// Weight given to last period's inflation rate
    #[serde(default = "default_current_inflation_weight")]
    pub current_inflation_weight: Dimensionless,
    /// Standard deviation of the normally distributed inflation shock
    #[serde(default = "default_inflation_shock_stdev")]
    pub inflation_shock_stdev: Dimensionless,
    /// Optional lower and upper bounds for inflation
    #[serde(default)]
    pub inflation_bounds: Option<(Dimensionless, Dimensionless)>,
    /// Weight given to the stable unemployment rate
    #[serde(default = "default_stable_unemployment_weight")]
    pub stable_unemployment_weight: Dimensionless,
    /// Weight given to last period's unemployment rate
    #[serde(default = "default_current_unemployment_weight")]
    pub current_unemployment_weight: Dimensionless,
    /// Location parameter of the log-normal unemployment shock
    #[serde(default = "default_unemployment_shock_mu")]
    pub unemployment_shock_mu: f64,
    /// Scale parameter of the log-normal unemployment shock
    #[serde(default = "default_unemployment_shock_sigma")]
    pub unemployment_shock_sigma: f64,
    /// Lower and upper bounds for unemployment
    #[serde(default = "default_unemployment_bounds")]
    pub unemployment_bounds: (Dimensionless, Dimensionless),
}

impl Default for EconomicPolicy {
    fn default() -> Self {
        Self {
            stable_inflation_weight: default_stable_inflation_weight(),
            current_inflation_weight: default_current_inflation_weight(),
            inflation_shock_stdev: default_inflation_shock_stdev(),
            inflation_bounds: None,
            stable_unemployment_weight: default_stable_unemployment_weight(),
            current_unemployment_weight: default_current_unemployment_weight(),
            unemployment_shock_mu: default_unemployment_shock_mu(),
            unemployment_shock_sigma: default_unemployment_shock_sigma(),
            unemployment_bounds: default_unemployment_bounds(),
        }
    }
}

impl EconomicPolicy {
    /// Check that the policy parameters are usable
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.inflation_shock_stdev >= Dimensionless(0.0),
            "inflation_shock_stdev cannot be negative"
        );
        ensure!(
            self.unemployment_shock_sigma >= 0.0,
            "unemployment_shock_sigma cannot be negative"
        );
        if let Some((lower, upper)) = self.inflation_bounds {
            ensure!(
                lower <= upper,
                "inflation_bounds are inverted ({lower} > {upper})"
            );
        }

        let (lower, upper) = self.unemployment_bounds;
        ensure!(
            lower <= upper,
            "unemployment_bounds are inverted ({lower} > {upper})"
        );
        ensure!(
            lower >= Dimensionless(0.0) && upper <= Dimensionless(1.0),
            "unemployment_bounds must lie between 0 and 1"
        );

        Ok(())
    }
}

/// Initial macroeconomic conditions, as read from the `[economy]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EconomicParams {
    /// Inflation rate in the first period
    #[serde(default = "default_initial_inflation_rate")]
    pub initial_inflation_rate: Dimensionless,
    /// Unemployment rate in the first period
    #[serde(default = "default_initial_unemployment_rate")]
    pub initial_unemployment_rate: Dimensionless,
    /// Long-run inflation rate (defaults to the initial rate)
    #[serde(default)]
    pub stable_inflation_rate: Option<Dimensionless>,
    /// Long-run unemployment rate (defaults to the initial rate)
    #[serde(default)]
    pub stable_unemployment_rate: Option<Dimensionless>,
    /// How the rates evolve
    #[serde(default)]
    pub policy: EconomicPolicy,
}

impl Default for EconomicParams {
    fn default() -> Self {
        Self {
            initial_inflation_rate: default_initial_inflation_rate(),
            initial_unemployment_rate: default_initial_unemployment_rate(),
            stable_inflation_rate: None,
            stable_unemployment_rate: None,
            policy: EconomicPolicy::default(),
        }
    }
}

impl EconomicParams {
    /// Check that the initial conditions and policy are valid
    pub fn validate(&self) -> Result<()> {
        let unemployment = [
            Some(self.initial_unemployment_rate),
            self.stable_unemployment_rate,
        ];
        for rate in unemployment.into_iter().flatten() {
            ensure!(
                (0.0..=1.0).contains(&rate.value()),
                "Unemployment rates must be between 0 and 1 (got {rate})"
            );
        }

        self.policy.validate()
    }
}

/// The state of the economy in a single period
#[derive(Debug, Clone, PartialEq)]
pub struct EconomicState {
    /// Index of the current period (0-based)
    pub period: u32,
    /// Inflation over the current period
    pub inflation_rate: Dimensionless,
    /// Long-run inflation rate the process reverts towards
    pub stable_inflation_rate: Dimensionless,
    /// Unemployment rate in the current period
    pub unemployment_rate: Dimensionless,
    /// Long-run unemployment rate the process reverts towards
    pub stable_unemployment_rate: Dimensionless,
    /// Inflation-indexed cap on total ISA payments
    pub isa_cap: HostMoney,
    /// Inflation-indexed income threshold above which payments are due
    pub isa_threshold: HostMoney,
    /// Product of (1 + inflation) over all periods since the start
    pub deflator: Dimensionless,
    policy: EconomicPolicy,
}

impl EconomicState {
    /// Create the economy for period 0
    pub fn new(params: &EconomicParams, isa_cap: HostMoney, isa_threshold: HostMoney) -> Self {
        Self {
            period: 0,
            inflation_rate: params.initial_inflation_rate,
            stable_inflation_rate: params
                .stable_inflation_rate
                .unwrap_or(params.initial_inflation_rate),
            unemployment_rate: params.initial_unemployment_rate,
            stable_unemployment_rate: params
                .stable_unemployment_rate
                .unwrap_or(params.initial_unemployment_rate),
            isa_cap,
            isa_threshold,
            deflator: Dimensionless(1.0),
            policy: params.policy.clone(),
        }
    }

    /// Move the economy on by one period.
    ///
    /// Draws new inflation and unemployment rates, then indexes the ISA cap, threshold and
    /// deflator by the new inflation rate.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let policy = &self.policy;

        let shock: f64 = rng.sample(StandardNormal);
        let mut inflation = policy.stable_inflation_weight * self.stable_inflation_rate
            + policy.current_inflation_weight * self.inflation_rate
            + policy.inflation_shock_stdev * Dimensionless(shock);
        if let Some((lower, upper)) = policy.inflation_bounds {
            inflation = Dimensionless(inflation.value().clamp(lower.value(), upper.value()));
        }

        let z: f64 = rng.sample(StandardNormal);
        let unemployment_shock =
            (policy.unemployment_shock_mu + policy.unemployment_shock_sigma * z).exp();
        let (lower, upper) = policy.unemployment_bounds;
        let unemployment = (policy.stable_unemployment_weight * self.stable_unemployment_rate
            + policy.current_unemployment_weight * self.unemployment_rate)
            .value()
            + unemployment_shock;

        self.period += 1;
        self.inflation_rate = inflation;
        self.unemployment_rate =
            Dimensionless(unemployment.clamp(lower.value(), upper.value()));

        let growth = Dimensionless(1.0) + inflation;
        self.isa_cap = self.isa_cap * growth;
        self.isa_threshold = self.isa_threshold * growth;
        self.deflator = self.deflator * growth;
    }

    /// Convert a nominal amount in the current period to period-0 terms
    pub fn deflate(&self, amount: HostMoney) -> HostMoney {
        amount / self.deflator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, economic_params, rng};
    use float_cmp::assert_approx_eq;
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;

    #[rstest]
    fn test_period_zero_uses_initial_conditions(economic_params: EconomicParams) {
        let state = EconomicState::new(&economic_params, HostMoney(50000.0), HostMoney(27000.0));
        assert_eq!(state.period, 0);
        assert_eq!(state.inflation_rate, Dimensionless(0.02));
        assert_eq!(state.unemployment_rate, Dimensionless(0.08));
        assert_eq!(state.deflator, Dimensionless(1.0));
    }

    #[rstest]
    fn test_deflator_is_product_of_inflation(
        economic_params: EconomicParams,
        mut rng: ChaCha8Rng,
    ) {
        let mut state =
            EconomicState::new(&economic_params, HostMoney(50000.0), HostMoney(27000.0));
        let mut product = 1.0;
        for _ in 0..50 {
            state.advance(&mut rng);
            product *= 1.0 + state.inflation_rate.value();
            assert_approx_eq!(f64, state.deflator.value(), product, epsilon = 1e-9);
            assert_approx_eq!(f64, state.isa_cap.value(), 50000.0 * product, epsilon = 1e-6);
            assert_approx_eq!(
                f64,
                state.isa_threshold.value(),
                27000.0 * product,
                epsilon = 1e-6
            );
        }
        assert_eq!(state.period, 50);
    }

    #[rstest]
    fn test_unemployment_stays_within_bounds(
        economic_params: EconomicParams,
        mut rng: ChaCha8Rng,
    ) {
        let mut state =
            EconomicState::new(&economic_params, HostMoney(50000.0), HostMoney(27000.0));
        for _ in 0..200 {
            state.advance(&mut rng);
            assert!((0.02..=0.15).contains(&state.unemployment_rate.value()));
        }
    }

    #[rstest]
    fn test_inflation_bounds(mut economic_params: EconomicParams, mut rng: ChaCha8Rng) {
        economic_params.policy.inflation_bounds = Some((Dimensionless(0.0), Dimensionless(0.03)));
        let mut state =
            EconomicState::new(&economic_params, HostMoney(50000.0), HostMoney(27000.0));
        for _ in 0..200 {
            state.advance(&mut rng);
            assert!((0.0..=0.03).contains(&state.inflation_rate.value()));
        }
    }

    #[test]
    fn test_policy_validate_inverted_bounds() {
        let policy = EconomicPolicy {
            unemployment_bounds: (Dimensionless(0.3), Dimensionless(0.1)),
            ..EconomicPolicy::default()
        };
        assert_error!(
            policy.validate(),
            "unemployment_bounds are inverted (0.3 > 0.1)"
        );
    }

    #[test]
    fn test_params_from_toml_defaults() {
        let params: EconomicParams = toml::from_str("initial_unemployment_rate = 0.05").unwrap();
        assert_eq!(params.initial_inflation_rate, Dimensionless(0.02));
        assert_eq!(params.initial_unemployment_rate, Dimensionless(0.05));
        assert_eq!(params.policy, EconomicPolicy::default());
        assert!(params.validate().is_ok());
    }
}
