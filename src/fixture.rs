//! Fixtures for tests

use crate::contract::IsaTerms;
use crate::economy::EconomicParams;
use crate::program::ProgramType;
use crate::simulation::SimulationConfig;
use crate::units::{Dimensionless, HostMoney};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A seeded random number generator
#[fixture]
pub fn rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(1234)
}

#[fixture]
pub fn economic_params() -> EconomicParams {
    EconomicParams {
        initial_inflation_rate: Dimensionless(0.02),
        initial_unemployment_rate: Dimensionless(0.08),
        ..EconomicParams::default()
    }
}

#[fixture]
pub fn isa_terms() -> IsaTerms {
    IsaTerms {
        percentage: Dimensionless(0.12),
        cap: HostMoney(50000.0),
        threshold: HostMoney(27000.0),
        max_payment_years: 10,
        default_unemployment_years: 2,
        price_per_student: HostMoney(16650.0),
    }
}

/// A nursing program funded with one million over twenty years
#[fixture]
pub fn simulation_config(economic_params: EconomicParams) -> SimulationConfig {
    let mut config = SimulationConfig::new(
        ProgramType::Nurse,
        HostMoney(1_000_000.0),
        20,
        Dimensionless(0.1),
    )
    .unwrap();
    config.economy = economic_params;

    config
}
