//! The programs a pool can fund, each with its own agreement terms and mix of career tracks.
use crate::contract::IsaTerms;
use crate::degree::{CompletionTier, DegreeMix, DegreeProfile};
use crate::units::{Dimensionless, HostMoney};
use anyhow::Result;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// Income threshold shared by every program
const ISA_THRESHOLD: HostMoney = HostMoney(27000.0);

/// Maximum number of payments shared by every program
const MAX_PAYMENT_YEARS: u32 = 10;

/// A contract defaults after more than this many consecutive years of unemployment
const DEFAULT_UNEMPLOYMENT_YEARS: u32 = 2;

/// The kind of program students are funded through
#[derive(
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
)]
pub enum ProgramType {
    /// Bachelor's and master's degrees
    #[string = "university"]
    University,
    /// Nursing and nursing-assistant training
    #[string = "nurse"]
    Nurse,
    /// Trade apprenticeships
    #[string = "trade"]
    Trade,
}

impl ProgramType {
    /// The agreement terms used unless overridden
    pub fn default_terms(self) -> IsaTerms {
        let (percentage, cap, price) = match self {
            Self::University => (0.14, 72500.0, 29000.0),
            Self::Nurse => (0.12, 49950.0, 16650.0),
            Self::Trade => (0.12, 45000.0, 15000.0),
        };

        IsaTerms {
            percentage: Dimensionless(percentage),
            cap: HostMoney(cap),
            threshold: ISA_THRESHOLD,
            max_payment_years: MAX_PAYMENT_YEARS,
            default_unemployment_years: DEFAULT_UNEMPLOYMENT_YEARS,
            price_per_student: HostMoney(price),
        }
    }

    /// The career tracks students are enrolled on unless a degree file is given.
    ///
    /// # Arguments
    ///
    /// * `home_return_probability` - Probability that graduates of completion tracks return home
    pub fn default_degree_mix(self, home_return_probability: Dimensionless) -> Result<DegreeMix> {
        let h = home_return_probability.value();
        let middle = CompletionTier::Middle;
        let assistant = || DegreeProfile::new("ASST", 31500.0, 2800.0, 0.005, 3, h, middle);
        let non_completion = || DegreeProfile::non_completion("NA", 2200.0, 640.0, 0.01, 2);

        let entries = match self {
            Self::University => vec![
                (
                    DegreeProfile::new("BA", 41300.0, 6000.0, 0.03, 4, h, CompletionTier::Upper),
                    0.7,
                ),
                (
                    DegreeProfile::new("MA", 46709.0, 6600.0, 0.04, 6, h, CompletionTier::Upper),
                    0.3,
                ),
            ],
            Self::Nurse => vec![
                (
                    DegreeProfile::new("NURSE", 40000.0, 4000.0, 0.02, 4, h, middle),
                    0.25,
                ),
                (assistant(), 0.6),
                (non_completion(), 0.15),
            ],
            Self::Trade => vec![
                (
                    DegreeProfile::new("TRADE", 35000.0, 3000.0, 0.02, 3, h, middle),
                    0.4,
                ),
                (assistant(), 0.4),
                (non_completion(), 0.2),
            ],
        };

        DegreeMix::new(
            entries
                .into_iter()
                .map(|(degree, weight)| (degree, Dimensionless(weight))),
        )
    }
}
