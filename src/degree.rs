//! Career tracks that students can be enrolled on and the mix of tracks a pool funds.
use crate::id::{HasID, IDCollection, define_id_getter, define_id_type};
use crate::input::{check_proportion, check_values_sum_to_one};
use crate::units::{Dimensionless, HostMoney};
use anyhow::{Context, Result, ensure};
use indexmap::{IndexMap, IndexSet};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::rc::Rc;

define_id_type! {DegreeID}

/// The lowest initial salary a completion track can be shifted down to
const MIN_SHIFTED_EARNINGS: HostMoney = HostMoney(15000.0);

/// The largest completion delay (in years) that can be drawn
pub const MAX_COMPLETION_DELAY: usize = 4;

/// How likely students on a track are to finish late
#[derive(DeserializeLabeledStringEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTier {
    /// Every student finishes on time
    #[string = "on_time"]
    OnTime,
    /// Academic degrees
    #[string = "upper"]
    Upper,
    /// Vocational qualifications
    #[string = "middle"]
    Middle,
    /// Non-completion tracks
    #[string = "lower"]
    Lower,
}

/// Probabilities of finishing 0, 1, 2, 3 or 4 years late, for each completion tier
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompletionDelays {
    /// Delay probabilities for the `upper` tier
    #[serde(default = "default_upper_delays")]
    pub upper: Vec<Dimensionless>,
    /// Delay probabilities for the `middle` tier
    #[serde(default = "default_middle_delays")]
    pub middle: Vec<Dimensionless>,
    /// Delay probabilities for the `lower` tier
    #[serde(default = "default_lower_delays")]
    pub lower: Vec<Dimensionless>,
}

fn default_upper_delays() -> Vec<Dimensionless> {
    [0.75, 0.2, 0.025, 0.025, 0.0].map(Dimensionless).to_vec()
}

fn default_middle_delays() -> Vec<Dimensionless> {
    [0.6, 0.25, 0.1, 0.05, 0.0].map(Dimensionless).to_vec()
}

fn default_lower_delays() -> Vec<Dimensionless> {
    [0.5, 0.25, 0.125, 0.0625, 0.0625].map(Dimensionless).to_vec()
}

impl Default for CompletionDelays {
    fn default() -> Self {
        Self {
            upper: default_upper_delays(),
            middle: default_middle_delays(),
            lower: default_lower_delays(),
        }
    }
}

impl CompletionDelays {
    /// Check that every tier has a valid probability distribution
    pub fn validate(&self) -> Result<()> {
        for (name, probabilities) in [
            ("upper", &self.upper),
            ("middle", &self.middle),
            ("lower", &self.lower),
        ] {
            check_delay_probabilities(probabilities)
                .with_context(|| format!("Invalid completion delays for tier {name}"))?;
        }

        Ok(())
    }

    /// Weighted samplers for every tier's delay distribution
    pub fn sampler(&self) -> Result<DelaySampler> {
        self.validate()?;
        let index = |probabilities: &[Dimensionless]| {
            WeightedIndex::new(probabilities.iter().map(|probability| probability.value()))
                .context("Invalid completion delays")
        };

        Ok(DelaySampler {
            upper: index(&self.upper)?,
            middle: index(&self.middle)?,
            lower: index(&self.lower)?,
        })
    }
}

/// Draws completion delays for each tier
#[derive(Debug, Clone)]
pub struct DelaySampler {
    upper: WeightedIndex<f64>,
    middle: WeightedIndex<f64>,
    lower: WeightedIndex<f64>,
}

impl DelaySampler {
    /// Draw a completion delay in years for a student on the given tier
    pub fn sample<R: Rng + ?Sized>(&self, tier: CompletionTier, rng: &mut R) -> u32 {
        let index = match tier {
            CompletionTier::OnTime => return 0,
            CompletionTier::Upper => &self.upper,
            CompletionTier::Middle => &self.middle,
            CompletionTier::Lower => &self.lower,
        };

        index.sample(rng) as u32
    }
}

fn check_delay_probabilities(probabilities: &[Dimensionless]) -> Result<()> {
    ensure!(
        !probabilities.is_empty() && probabilities.len() <= MAX_COMPLETION_DELAY + 1,
        "Between 1 and {} delay probabilities must be given",
        MAX_COMPLETION_DELAY + 1
    );
    for probability in probabilities {
        check_proportion("Delay probability", *probability)?;
    }

    check_values_sum_to_one(probabilities.iter().copied())
}

/// An immutable description of a career track
#[derive(Debug, Clone, PartialEq)]
pub struct DegreeProfile {
    /// Short name for the track (e.g. `BA`)
    pub id: DegreeID,
    /// Mean salary on first employment, in period-0 terms
    pub mean_initial_earnings: HostMoney,
    /// Standard deviation of the salary on first employment
    pub earnings_stdev: HostMoney,
    /// Real earnings growth per year of employment
    pub annual_growth_rate: Dimensionless,
    /// Nominal length of study in years
    pub years_to_complete: u32,
    /// Probability that a graduate returns to their home country
    pub home_return_probability: Dimensionless,
    /// Earnings cannot exceed this multiple of the (indexed) mean initial salary
    pub max_earnings_multiple: Dimensionless,
    /// Which distribution completion delays are drawn from
    pub completion_tier: CompletionTier,
    /// Whether students on this track can graduate at all
    pub completes: bool,
}
define_id_getter! {DegreeProfile, DegreeID}

impl DegreeProfile {
    /// Create a completion track with the usual earnings cap
    pub fn new(
        id: &str,
        mean_initial_earnings: f64,
        earnings_stdev: f64,
        annual_growth_rate: f64,
        years_to_complete: u32,
        home_return_probability: f64,
        completion_tier: CompletionTier,
    ) -> Self {
        Self {
            id: id.into(),
            mean_initial_earnings: HostMoney(mean_initial_earnings),
            earnings_stdev: HostMoney(earnings_stdev),
            annual_growth_rate: Dimensionless(annual_growth_rate),
            years_to_complete,
            home_return_probability: Dimensionless(home_return_probability),
            max_earnings_multiple: Dimensionless(1.5),
            completion_tier,
            completes: true,
        }
    }

    /// Create a track whose students never graduate
    pub fn non_completion(
        id: &str,
        mean_initial_earnings: f64,
        earnings_stdev: f64,
        annual_growth_rate: f64,
        years_to_complete: u32,
    ) -> Self {
        Self {
            home_return_probability: Dimensionless(1.0),
            completes: false,
            ..Self::new(
                id,
                mean_initial_earnings,
                earnings_stdev,
                annual_growth_rate,
                years_to_complete,
                1.0,
                CompletionTier::Lower,
            )
        }
    }

    /// Check that the profile's parameters are sensible
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.mean_initial_earnings >= HostMoney(0.0) && self.mean_initial_earnings.is_finite(),
            "mean_initial_earnings must be a finite, non-negative number"
        );
        ensure!(
            self.earnings_stdev >= HostMoney(0.0) && self.earnings_stdev.is_finite(),
            "earnings_stdev must be a finite, non-negative number"
        );
        ensure!(
            self.max_earnings_multiple > Dimensionless(0.0),
            "max_earnings_multiple must be greater than zero"
        );
        check_proportion("home_return_probability", self.home_return_probability)
    }

    /// Shift the mean initial salary by `z` standard deviations.
    ///
    /// Completion tracks are not shifted below a minimum salary.
    pub fn with_earnings_shift(&self, z: Dimensionless) -> Self {
        let mut shifted = self.mean_initial_earnings + z * self.earnings_stdev;
        shifted = if self.completes {
            shifted.max(MIN_SHIFTED_EARNINGS)
        } else {
            shifted.max(HostMoney(0.0))
        };

        Self {
            mean_initial_earnings: shifted,
            ..self.clone()
        }
    }
}

/// A weighted set of career tracks that new students are drawn from
#[derive(Debug, Clone)]
pub struct DegreeMix {
    degrees: IndexMap<DegreeID, (Rc<DegreeProfile>, Dimensionless)>,
    index: WeightedIndex<f64>,
}

impl DegreeMix {
    /// Create a new mix from (profile, weight) pairs.
    ///
    /// # Arguments
    ///
    /// * `entries` - Career tracks with the proportion of students enrolled on each
    ///
    /// # Returns
    ///
    /// The degree mix or an error if the profiles are invalid, IDs are repeated or the weights do
    /// not sum to one.
    pub fn new<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (DegreeProfile, Dimensionless)>,
    {
        let mut degrees = IndexMap::new();
        for (degree, weight) in entries {
            degree
                .validate()
                .with_context(|| format!("Invalid parameters for degree {}", degree.id))?;
            check_proportion("Degree weight", weight)?;

            let id = degree.get_id().clone();
            ensure!(
                degrees
                    .insert(id.clone(), (Rc::new(degree), weight))
                    .is_none(),
                "Duplicate degree ID {id}"
            );
        }

        ensure!(!degrees.is_empty(), "At least one degree must be given");
        check_values_sum_to_one(degrees.values().map(|(_, weight)| *weight))
            .context("Invalid degree weights")?;

        let index = WeightedIndex::new(degrees.values().map(|(_, weight)| weight.value()))
            .context("Invalid degree weights")?;

        Ok(Self { degrees, index })
    }

    /// Draw the career track for a new student
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Rc<DegreeProfile> {
        let (_, (degree, _)) = self
            .degrees
            .get_index(self.index.sample(rng))
            .expect("Weighted index out of range");

        Rc::clone(degree)
    }

    /// Look up a career track by ID
    pub fn get(&self, id: &DegreeID) -> Option<&Rc<DegreeProfile>> {
        self.degrees.get(id).map(|(degree, _)| degree)
    }

    /// The IDs of all tracks in the mix
    pub fn ids(&self) -> IndexSet<DegreeID> {
        self.degrees.keys().cloned().collect()
    }

    /// Iterate over tracks and their weights
    pub fn iter(&self) -> impl Iterator<Item = (&Rc<DegreeProfile>, Dimensionless)> {
        self.degrees.values().map(|(degree, weight)| (degree, *weight))
    }

    /// A new mix with the same tracks, reweighted.
    ///
    /// Tracks not named in `weights` are given a weight of zero.
    pub fn reweighted(&self, weights: &IndexMap<String, Dimensionless>) -> Result<Self> {
        let ids = self.ids();
        for id in weights.keys() {
            ids.get_id_by_str(id)?;
        }

        Self::new(self.iter().map(|(degree, _)| {
            let weight = weights
                .get(degree.id.0.as_ref())
                .copied()
                .unwrap_or_default();
            (DegreeProfile::clone(degree), weight)
        }))
    }

    /// A new mix with every initial salary shifted by `z` standard deviations
    pub fn with_earnings_shift(&self, z: Dimensionless) -> Result<Self> {
        Self::new(
            self.iter()
                .map(|(degree, weight)| (degree.with_earnings_shift(z), weight)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, rng};
    use float_cmp::assert_approx_eq;
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;

    fn mix() -> DegreeMix {
        DegreeMix::new([
            (
                DegreeProfile::new("BA", 41300.0, 6000.0, 0.03, 4, 0.1, CompletionTier::Upper),
                Dimensionless(0.7),
            ),
            (
                DegreeProfile::new("MA", 46709.0, 6600.0, 0.04, 6, 0.1, CompletionTier::Upper),
                Dimensionless(0.3),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_default_delays_valid() {
        assert!(CompletionDelays::default().validate().is_ok());
    }

    #[test]
    fn test_delays_not_summing_to_one() {
        let delays = CompletionDelays {
            upper: vec![Dimensionless(0.5), Dimensionless(0.25)],
            ..CompletionDelays::default()
        };
        assert_error!(delays.validate(), "Invalid completion delays for tier upper");
    }

    #[rstest]
    fn test_sample_delay(mut rng: ChaCha8Rng) {
        let delays = CompletionDelays::default().sampler().unwrap();
        for _ in 0..1000 {
            assert_eq!(delays.sample(CompletionTier::OnTime, &mut rng), 0);
            assert!(delays.sample(CompletionTier::Upper, &mut rng) <= 3);
            assert!(delays.sample(CompletionTier::Lower, &mut rng) <= 4);
        }
    }

    #[rstest]
    fn test_sample_delay_on_time_fraction(mut rng: ChaCha8Rng) {
        let delays = CompletionDelays::default().sampler().unwrap();
        let n = 20_000;
        let on_time = (0..n)
            .filter(|_| delays.sample(CompletionTier::Middle, &mut rng) == 0)
            .count();
        assert_approx_eq!(f64, on_time as f64 / n as f64, 0.6, epsilon = 0.02);
    }

    #[rstest]
    fn test_sample_delay_skips_zero_probabilities(mut rng: ChaCha8Rng) {
        let delays = CompletionDelays {
            upper: [0.0, 0.0, 1.0].map(Dimensionless).to_vec(),
            ..CompletionDelays::default()
        };
        let sampler = delays.sampler().unwrap();
        for _ in 0..100 {
            assert_eq!(sampler.sample(CompletionTier::Upper, &mut rng), 2);
        }
    }

    #[test]
    fn test_sampler_rejects_invalid_delays() {
        let delays = CompletionDelays {
            lower: vec![Dimensionless(0.5)],
            ..CompletionDelays::default()
        };
        assert_error!(delays.sampler(), "Invalid completion delays for tier lower");
    }

    #[test]
    fn test_mix_weights_must_sum_to_one() {
        let result = DegreeMix::new([(
            DegreeProfile::new("BA", 41300.0, 6000.0, 0.03, 4, 0.1, CompletionTier::Upper),
            Dimensionless(0.5),
        )]);
        assert_error!(result, "Invalid degree weights");
    }

    #[test]
    fn test_mix_duplicate_ids() {
        let degree =
            DegreeProfile::new("BA", 41300.0, 6000.0, 0.03, 4, 0.1, CompletionTier::Upper);
        let result = DegreeMix::new([
            (degree.clone(), Dimensionless(0.5)),
            (degree, Dimensionless(0.5)),
        ]);
        assert_error!(result, "Duplicate degree ID BA");
    }

    #[rstest]
    fn test_mix_sample_shares_profiles(mut rng: ChaCha8Rng) {
        let mix = mix();
        let first = mix.sample(&mut rng);
        let again = mix.get(&first.id).unwrap();
        assert!(Rc::ptr_eq(&first, again));
    }

    #[test]
    fn test_reweighted() {
        let weights = [("MA".to_string(), Dimensionless(1.0))].into_iter().collect();
        let mix = mix().reweighted(&weights).unwrap();
        let weights: Vec<_> = mix.iter().map(|(_, weight)| weight).collect();
        assert_eq!(weights, [Dimensionless(0.0), Dimensionless(1.0)]);

        let weights = [("PHD".to_string(), Dimensionless(1.0))].into_iter().collect();
        assert_error!(mix.reweighted(&weights), "Unknown ID PHD found");
    }

    #[rstest]
    #[case(-1.28, 41300.0 - 1.28 * 6000.0)]
    #[case(0.0, 41300.0)]
    #[case(-10.0, 15000.0)]
    fn test_with_earnings_shift(#[case] z: f64, #[case] expected: f64) {
        let degree =
            DegreeProfile::new("BA", 41300.0, 6000.0, 0.03, 4, 0.1, CompletionTier::Upper);
        let shifted = degree.with_earnings_shift(Dimensionless(z));
        assert_approx_eq!(f64, shifted.mean_initial_earnings.value(), expected);
    }

    #[test]
    fn test_non_completion_shift_not_floored() {
        let degree = DegreeProfile::non_completion("NA", 2200.0, 500.0, 0.01, 0);
        let shifted = degree.with_earnings_shift(Dimensionless(-1.28));
        assert_approx_eq!(f64, shifted.mean_initial_earnings.value(), 1560.0);
        assert!(!shifted.completes);
    }
}
