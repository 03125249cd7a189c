//! The career of a single funded student.
//!
//! A student studies for the nominal length of their course plus a randomly drawn delay, then
//! either graduates or (for non-completion tracks and failed language exams) returns home without
//! a qualification. Graduates may also choose to return home. Those who stay in the host country
//! look for work every period, and their earnings grow with experience and inflation.
use crate::degree::{DegreeProfile, DelaySampler};
use crate::economy::EconomicState;
use crate::impact::CounterfactualParams;
use crate::input::{check_proportion, define_param_default, define_unit_param_default};
use crate::units::{Dimensionless, HomeMoney, HostMoney};
use anyhow::{Result, ensure};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

define_param_default!(default_starting_age, u32, 22);
define_param_default!(default_retirement_age, u32, 65);
define_param_default!(default_experience_penalty, u32, 3);
define_unit_param_default!(default_min_earnings_power, HostMoney, 100.0);

/// A unique identifier for a student within a single run
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    derive_more::Display,
    Serialize,
)]
#[serde(transparent)]
pub struct StudentID(pub u32);

/// Parameters shared by every student, from the `[student]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StudentParams {
    /// Age on enrolment
    #[serde(default = "default_starting_age")]
    pub starting_age: u32,
    /// No earnings accrue from this age onwards
    #[serde(default = "default_retirement_age")]
    pub retirement_age: u32,
    /// Stipend received while studying, in period-0 terms
    #[serde(default)]
    pub study_income: HostMoney,
    /// Extra annual income of graduates who return home, in period-0 terms
    #[serde(default)]
    pub home_treatment_effect: HomeMoney,
    /// Years of experience lost for each year out of work
    #[serde(default = "default_experience_penalty")]
    pub unemployment_experience_penalty: u32,
    /// Lowest salary that can be drawn on first employment
    #[serde(default = "default_min_earnings_power")]
    pub min_earnings_power: HostMoney,
}

impl Default for StudentParams {
    fn default() -> Self {
        Self {
            starting_age: default_starting_age(),
            retirement_age: default_retirement_age(),
            study_income: HostMoney(0.0),
            home_treatment_effect: HomeMoney(0.0),
            unemployment_experience_penalty: default_experience_penalty(),
            min_earnings_power: default_min_earnings_power(),
        }
    }
}

impl StudentParams {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.retirement_age > self.starting_age,
            "retirement_age must be greater than starting_age"
        );
        ensure!(
            self.study_income >= HostMoney(0.0),
            "study_income cannot be negative"
        );
        ensure!(
            self.min_earnings_power >= HostMoney(0.0),
            "min_earnings_power cannot be negative"
        );

        Ok(())
    }
}

/// An optional language course students must pass before graduating, from `[language]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LanguageParams {
    /// Probability of passing the final exam
    pub pass_probability: Dimensionless,
    /// Extra years of study the course adds
    #[serde(default)]
    pub study_years: u32,
}

impl LanguageParams {
    pub fn validate(&self) -> Result<()> {
        check_proportion("pass_probability", self.pass_probability)
    }
}

/// Everything a student needs to know about the world beyond the economy
#[derive(Debug, Clone, Copy)]
pub struct StudentContext<'a> {
    pub params: &'a StudentParams,
    pub counterfactual: &'a CounterfactualParams,
    pub language: Option<&'a LanguageParams>,
}

/// What happened to a student in one period
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodRecord {
    /// The (absolute) simulation period
    pub period: u32,
    /// Nominal earnings in the host country
    pub host_earnings: HostMoney,
    /// Nominal earnings after returning home
    pub home_earnings: HomeMoney,
    /// Nominal income without the program
    pub counterfactual_earnings: HomeMoney,
    /// Whether the student was employed in the host country
    pub employed: bool,
    /// ISA payment made in the period
    pub payment: HostMoney,
}

/// The evolving state of one student
#[derive(Debug, Clone, PartialEq)]
pub struct StudentTrajectory {
    pub id: StudentID,
    pub degree: Rc<DegreeProfile>,
    /// First period of study
    pub enrollment_period: u32,
    /// Years of study beyond the nominal course length
    pub completion_delay: u32,
    /// Total years of study, including delays and any language course
    pub study_years: u32,
    pub years_experience: u32,
    /// Current salary if employed
    pub earnings_power: HostMoney,
    pub is_graduated: bool,
    /// The period in which the student graduated
    pub graduation_period: Option<u32>,
    pub is_employed: bool,
    pub is_home: bool,
    pub will_return_home: bool,
    /// Outcome of the language exam, if there was one
    pub language_passed: Option<bool>,
    /// Consecutive periods out of work
    pub unemployment_spell: u32,
    pub years_paid: u32,
    pub hit_payment_cap: bool,
    completion_resolved: bool,
    history: Vec<PeriodRecord>,
}

impl StudentTrajectory {
    /// Enrol a new student, drawing how late they will finish their course.
    ///
    /// # Arguments
    ///
    /// * `id` - The student's ID
    /// * `degree` - The career track the student is enrolled on
    /// * `enrollment_period` - The first period of study
    /// * `delays` - Draws completion delays
    /// * `language` - The language course, if there is one
    /// * `rng` - Random number generator
    pub fn new<R: Rng + ?Sized>(
        id: StudentID,
        degree: Rc<DegreeProfile>,
        enrollment_period: u32,
        delays: &DelaySampler,
        language: Option<&LanguageParams>,
        rng: &mut R,
    ) -> Self {
        let completion_delay = delays.sample(degree.completion_tier, rng);
        let language_years = language.map_or(0, |language| language.study_years);

        Self {
            id,
            study_years: degree.years_to_complete + completion_delay + language_years,
            degree,
            enrollment_period,
            completion_delay,
            years_experience: 0,
            earnings_power: HostMoney(0.0),
            is_graduated: false,
            graduation_period: None,
            is_employed: false,
            is_home: false,
            will_return_home: false,
            language_passed: None,
            unemployment_spell: 0,
            years_paid: 0,
            hit_payment_cap: false,
            completion_resolved: false,
            history: Vec::new(),
        }
    }

    /// Simulate one period of the student's life.
    ///
    /// Must be called once for every period from `enrollment_period` onwards, in order.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        economy: &EconomicState,
        ctx: &StudentContext,
        rng: &mut R,
    ) -> PeriodRecord {
        let period = economy.period;
        let relative = self.history.len() as u32;
        let retired = ctx.params.starting_age + relative >= ctx.params.retirement_age;

        let counterfactual = if retired {
            HomeMoney(0.0)
        } else {
            ctx.counterfactual.sample_income(economy.deflator, rng)
        };

        let (host_earnings, home_earnings) = if retired {
            self.is_employed = false;
            (HostMoney(0.0), HomeMoney(0.0))
        } else if relative < self.study_years {
            (ctx.params.study_income * economy.deflator, HomeMoney(0.0))
        } else {
            if !self.completion_resolved {
                self.resolve_completion(period, ctx.language, rng);
            }

            if self.is_home {
                self.is_employed = false;
                let mut home = counterfactual;
                if self.is_graduated {
                    home += ctx.params.home_treatment_effect * economy.deflator;
                }
                (HostMoney(0.0), home)
            } else {
                (self.work(economy, ctx.params, rng), HomeMoney(0.0))
            }
        };

        let record = PeriodRecord {
            period,
            host_earnings,
            home_earnings,
            counterfactual_earnings: counterfactual,
            employed: self.is_employed,
            payment: HostMoney(0.0),
        };
        self.history.push(record);

        record
    }

    /// Decide whether the student graduates and, if so, whether they go home
    fn resolve_completion<R: Rng + ?Sized>(
        &mut self,
        period: u32,
        language: Option<&LanguageParams>,
        rng: &mut R,
    ) {
        self.completion_resolved = true;
        if !self.degree.completes {
            self.is_home = true;
            return;
        }

        if let Some(language) = language {
            let passed = rng.r#gen::<f64>() < language.pass_probability.value();
            self.language_passed = Some(passed);
            if !passed {
                self.is_home = true;
                return;
            }
        }

        self.is_graduated = true;
        self.graduation_period = Some(period);
        self.will_return_home = rng.r#gen::<f64>() < self.degree.home_return_probability.value();
        self.is_home = self.will_return_home;
    }

    /// Look for work in the host country and return this period's earnings
    fn work<R: Rng + ?Sized>(
        &mut self,
        economy: &EconomicState,
        params: &StudentParams,
        rng: &mut R,
    ) -> HostMoney {
        let unemployment = economy.unemployment_rate.value();
        self.is_employed = unemployment < 1.0 && rng.r#gen::<f64>() < 1.0 - unemployment;

        if !self.is_employed {
            self.unemployment_spell += 1;
            self.years_experience = self
                .years_experience
                .saturating_sub(params.unemployment_experience_penalty);
            return HostMoney(0.0);
        }

        self.unemployment_spell = 0;
        let degree = &self.degree;
        if self.earnings_power == HostMoney(0.0) {
            let z: f64 = rng.sample(StandardNormal);
            let drawn = (degree.mean_initial_earnings + degree.earnings_stdev * Dimensionless(z))
                * economy.deflator;
            self.earnings_power = drawn.max(params.min_earnings_power);
        } else {
            let growth = Dimensionless(1.0) + degree.annual_growth_rate + economy.inflation_rate;
            self.earnings_power = self.earnings_power * growth;
        }

        let max_earnings =
            degree.mean_initial_earnings * degree.max_earnings_multiple * economy.deflator;
        self.earnings_power = self.earnings_power.min(max_earnings);
        self.years_experience += 1;

        self.earnings_power
    }

    /// Record an ISA payment made in the most recent period
    pub fn record_payment(&mut self, amount: HostMoney) {
        if let Some(record) = self.history.last_mut() {
            record.payment += amount;
            self.years_paid += 1;
        }
    }

    /// Every period simulated so far
    pub fn history(&self) -> &[PeriodRecord] {
        &self.history
    }

    /// The most recent period
    pub fn latest(&self) -> Option<&PeriodRecord> {
        self.history.last()
    }

    /// Number of periods employed in the host country
    pub fn years_employed(&self) -> u32 {
        self.history.iter().filter(|record| record.employed).count() as u32
    }

    /// Total ISA payments made
    pub fn total_payments(&self) -> HostMoney {
        self.history.iter().map(|record| record.payment).sum()
    }

    /// Whether the student has yet to finish their course
    pub fn is_studying(&self) -> bool {
        !self.completion_resolved
    }
}
