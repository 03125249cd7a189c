//! Social-welfare accounting for funded students.
//!
//! All functions here are pure. Income is converted into real home-country purchasing-power terms
//! before any logarithm is taken, and every yearly quantity is discounted back to period 0 of the
//! simulation.
use crate::contract::{Contract, ExitReason};
use crate::degree::DegreeID;
use crate::input::{check_proportion, define_param_default, define_unit_param_default};
use crate::student::{StudentID, StudentTrajectory};
use crate::units::{Dimensionless, HomeMoney, HostMoney, Utility};
use anyhow::{Result, ensure};
use rand::Rng;
use serde::{Deserialize, Serialize};

define_unit_param_default!(default_discount_rate, Dimensionless, 0.05);
define_unit_param_default!(default_ppp_multiplier, Dimensionless, 0.42);
define_unit_param_default!(default_moral_weight, Dimensionless, 1.44);
define_unit_param_default!(default_remittance_rate, Dimensionless, 0.15);
define_unit_param_default!(default_base_consumption, HomeMoney, 511.0);
define_param_default!(default_num_recipients, u32, 4);
define_unit_param_default!(default_household_multiplier, Dimensionless, 1.2);
define_unit_param_default!(default_health_utility, Utility, 3.0);
define_unit_param_default!(default_migration_influence_factor, Dimensionless, 0.05);
define_unit_param_default!(default_control_income, HomeMoney, 2400.0);
define_unit_param_default!(default_income_multiplier, Dimensionless, 1.0);
define_unit_param_default!(default_household_size, Dimensionless, 1.0);
define_unit_param_default!(default_employment_rate, Dimensionless, 0.9);

/// Parameters of the welfare calculation, from the `[impact]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImpactParams {
    /// Annual rate used to discount future utility
    #[serde(default = "default_discount_rate")]
    pub discount_rate: Dimensionless,
    /// Converts host-currency amounts to home-country purchasing power
    #[serde(default = "default_ppp_multiplier")]
    pub ppp_multiplier: Dimensionless,
    /// Multiplier on the log-utility of a student's own income
    #[serde(default = "default_moral_weight")]
    pub moral_weight: Dimensionless,
    /// Share of a student's host-country income sent home
    #[serde(default = "default_remittance_rate")]
    pub remittance_rate: Dimensionless,
    /// Annual consumption of each remittance recipient
    #[serde(default = "default_base_consumption")]
    pub base_consumption: HomeMoney,
    /// Number of people sharing each remittance
    #[serde(default = "default_num_recipients")]
    pub num_recipients: u32,
    /// Multiplier applied to recipients' utility gain
    #[serde(default = "default_household_multiplier")]
    pub household_multiplier: Dimensionless,
    /// One-off health utility for each graduate
    #[serde(default = "default_health_utility")]
    pub health_utility: Utility,
    /// Additional migrants inspired by each graduate who stays abroad
    #[serde(default = "default_migration_influence_factor")]
    pub migration_influence_factor: Dimensionless,
}

impl Default for ImpactParams {
    fn default() -> Self {
        Self {
            discount_rate: default_discount_rate(),
            ppp_multiplier: default_ppp_multiplier(),
            moral_weight: default_moral_weight(),
            remittance_rate: default_remittance_rate(),
            base_consumption: default_base_consumption(),
            num_recipients: default_num_recipients(),
            household_multiplier: default_household_multiplier(),
            health_utility: default_health_utility(),
            migration_influence_factor: default_migration_influence_factor(),
        }
    }
}

impl ImpactParams {
    /// Check that the parameters are usable
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.discount_rate > Dimensionless(-1.0),
            "discount_rate must be greater than -1"
        );
        ensure!(
            self.ppp_multiplier > Dimensionless(0.0),
            "ppp_multiplier must be greater than zero"
        );
        ensure!(
            self.base_consumption > HomeMoney(0.0),
            "base_consumption must be greater than zero"
        );
        ensure!(self.num_recipients > 0, "num_recipients cannot be zero");
        check_proportion("remittance_rate", self.remittance_rate)
    }
}

/// The household a student would have lived in without the program, from `[counterfactual]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CounterfactualParams {
    /// Annual income of the main earner when employed, in period-0 terms
    #[serde(default = "default_control_income")]
    pub control_income: HomeMoney,
    /// Multiplier on the main earner's income
    #[serde(default = "default_income_multiplier")]
    pub income_multiplier: Dimensionless,
    /// Income from the rest of the household
    #[serde(default)]
    pub other_earners_income: HomeMoney,
    /// Number of people the household income is shared between
    #[serde(default = "default_household_size")]
    pub household_size: Dimensionless,
    /// Probability that the main earner is employed in a given year
    #[serde(default = "default_employment_rate")]
    pub employment_rate: Dimensionless,
    /// Share of counterfactual income sent to relatives
    #[serde(default = "default_remittance_rate")]
    pub remittance_rate: Dimensionless,
}

impl Default for CounterfactualParams {
    fn default() -> Self {
        Self {
            control_income: default_control_income(),
            income_multiplier: default_income_multiplier(),
            other_earners_income: HomeMoney(0.0),
            household_size: default_household_size(),
            employment_rate: default_employment_rate(),
            remittance_rate: default_remittance_rate(),
        }
    }
}

impl CounterfactualParams {
    /// Check that the household model is usable
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.household_size > Dimensionless(0.0),
            "household_size must be greater than zero"
        );
        check_proportion("employment_rate", self.employment_rate)?;
        check_proportion("Counterfactual remittance_rate", self.remittance_rate)
    }

    /// Per-person household income for one period, in nominal home-currency terms
    pub fn household_income(&self, employed: bool, deflator: Dimensionless) -> HomeMoney {
        let control = if employed {
            self.control_income * self.income_multiplier
        } else {
            HomeMoney(0.0)
        };

        (control + self.other_earners_income) / self.household_size * deflator
    }

    /// Draw the main earner's employment and return per-person household income
    pub fn sample_income<R: Rng + ?Sized>(
        &self,
        deflator: Dimensionless,
        rng: &mut R,
    ) -> HomeMoney {
        let employed = rng.r#gen::<f64>() < self.employment_rate.value();
        self.household_income(employed, deflator)
    }
}

/// Log-utility of an income, floored at one unit
pub fn log_utility(income: HomeMoney, moral_weight: Dimensionless) -> Utility {
    Utility(moral_weight.value() * income.value().max(1.0).ln())
}

/// Utility gained by a household from receiving a remittance.
///
/// The remittance is shared equally between recipients, each of whom gains
/// `ln(base + share) - ln(base)`.
pub fn remittance_utility(remittance: HomeMoney, params: &ImpactParams) -> Utility {
    if remittance <= HomeMoney(0.0) {
        return Utility(0.0);
    }

    let recipients = params.num_recipients as f64;
    let base = params.base_consumption.value();
    let share = remittance.value() / recipients;
    let per_person = (base + share).ln() - base.ln();

    Utility(per_person * recipients * params.household_multiplier.value())
}

/// The factor discounting a quantity in `period` back to period 0
pub fn discount_factor(discount_rate: Dimensionless, period: u32) -> Dimensionless {
    (Dimensionless(1.0) + discount_rate).powi(-(period as i32))
}

/// Welfare quantities for one student in one period, before discounting
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeriodImpact {
    /// Real income in home purchasing-power terms
    pub income: HomeMoney,
    /// Real counterfactual income
    pub counterfactual_income: HomeMoney,
    /// Real remittances sent
    pub remittance: HomeMoney,
    /// Real remittances that would have been sent without the program
    pub counterfactual_remittance: HomeMoney,
    /// The student's own utility
    pub student_utility: Utility,
    /// The student's counterfactual utility
    pub counterfactual_utility: Utility,
    /// Recipients' utility from remittances
    pub remittance_utility: Utility,
    /// Recipients' counterfactual utility from remittances
    pub counterfactual_remittance_utility: Utility,
}

impl PeriodImpact {
    /// Assess one period of a student's life.
    ///
    /// # Arguments
    ///
    /// * `host_earnings` - Nominal earnings in the host country
    /// * `home_earnings` - Nominal earnings in the home country
    /// * `counterfactual` - Nominal counterfactual income
    /// * `deflator` - The cumulative deflator for the period
    /// * `params` - Welfare parameters
    /// * `counterfactual_remittance_rate` - Share of home income sent to relatives
    pub fn assess(
        host_earnings: HostMoney,
        home_earnings: HomeMoney,
        counterfactual: HomeMoney,
        deflator: Dimensionless,
        params: &ImpactParams,
        counterfactual_remittance_rate: Dimensionless,
    ) -> Self {
        let host = host_earnings.to_home(params.ppp_multiplier) / deflator;
        let home = home_earnings / deflator;
        let income = host + home;
        let remittance =
            host * params.remittance_rate + home * counterfactual_remittance_rate;

        let counterfactual_income = counterfactual / deflator;
        let counterfactual_remittance = counterfactual_income * counterfactual_remittance_rate;

        Self {
            income,
            counterfactual_income,
            remittance,
            counterfactual_remittance,
            student_utility: log_utility(income - remittance, params.moral_weight),
            counterfactual_utility: log_utility(
                counterfactual_income - counterfactual_remittance,
                params.moral_weight,
            ),
            remittance_utility: remittance_utility(remittance, params),
            counterfactual_remittance_utility: remittance_utility(
                counterfactual_remittance,
                params,
            ),
        }
    }
}

/// Present-value welfare outcomes for a single student
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentImpact {
    pub student_id: StudentID,
    pub degree: DegreeID,
    pub graduated: bool,
    pub is_home: bool,
    /// Real earnings gain in home purchasing-power terms
    pub earnings_gain: HomeMoney,
    /// The earnings gain expressed in host currency
    pub host_earnings_gain: HostMoney,
    pub remittance_gain: HomeMoney,
    pub student_utility_gain: Utility,
    pub remittance_utility_gain: Utility,
    /// Student and remittance utility gains combined
    pub total_utility_gain: Utility,
    pub health_utility: Utility,
    pub migration_utility: Utility,
    pub total_utility_gain_with_extras: Utility,
    pub years_employed: u32,
    pub total_payments: HostMoney,
    pub years_paid: u32,
    pub hit_payment_cap: bool,
}

impl StudentImpact {
    /// Assess a student's whole history.
    ///
    /// # Arguments
    ///
    /// * `student` - The student's trajectory
    /// * `contract` - The student's agreement
    /// * `deflators` - Cumulative deflator for every period of the simulation
    /// * `params` - Welfare parameters
    /// * `counterfactual` - The counterfactual household model
    pub fn assess(
        student: &StudentTrajectory,
        contract: &Contract,
        deflators: &[Dimensionless],
        params: &ImpactParams,
        counterfactual: &CounterfactualParams,
    ) -> Self {
        let mut earnings_gain = HomeMoney(0.0);
        let mut remittance_gain = HomeMoney(0.0);
        let mut student_utility_gain = Utility(0.0);
        let mut remittance_utility_gain = Utility(0.0);

        for record in student.history() {
            let Some(deflator) = deflators.get(record.period as usize) else {
                break;
            };
            let period = PeriodImpact::assess(
                record.host_earnings,
                record.home_earnings,
                record.counterfactual_earnings,
                *deflator,
                params,
                counterfactual.remittance_rate,
            );
            let factor = discount_factor(params.discount_rate, record.period);

            earnings_gain += (period.income - period.counterfactual_income) * factor;
            remittance_gain += (period.remittance - period.counterfactual_remittance) * factor;
            student_utility_gain +=
                (period.student_utility - period.counterfactual_utility) * factor;
            remittance_utility_gain += (period.remittance_utility
                - period.counterfactual_remittance_utility)
                * factor;
        }

        let total_utility_gain = student_utility_gain + remittance_utility_gain;
        let health_utility = match student.graduation_period {
            Some(period) => params.health_utility * discount_factor(params.discount_rate, period),
            None => Utility(0.0),
        };
        let migration_utility = if student.is_graduated && !student.is_home {
            total_utility_gain * params.migration_influence_factor
        } else {
            Utility(0.0)
        };

        Self {
            student_id: student.id,
            degree: student.degree.id.clone(),
            graduated: student.is_graduated,
            is_home: student.is_home,
            earnings_gain,
            host_earnings_gain: earnings_gain.to_host(params.ppp_multiplier),
            remittance_gain,
            student_utility_gain,
            remittance_utility_gain,
            total_utility_gain,
            health_utility,
            migration_utility,
            total_utility_gain_with_extras: total_utility_gain + health_utility + migration_utility,
            years_employed: student.years_employed(),
            total_payments: contract.cumulative_payments,
            years_paid: contract.payments_made(),
            hit_payment_cap: contract.exit_reason == Some(ExitReason::PaymentCap),
        }
    }
}

/// Shares of total utility from each source, as percentages
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UtilityBreakdown {
    pub direct_income_pct: f64,
    pub remittance_pct: f64,
    pub health_pct: f64,
    pub migration_pct: f64,
}

/// Welfare outcomes averaged over every graduate in a run
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CohortImpact {
    pub num_graduated: u32,
    pub avg_student_utility_gain: Utility,
    pub avg_remittance_utility_gain: Utility,
    pub avg_health_utility: Utility,
    pub avg_migration_utility: Utility,
    pub avg_total_utility_gain: Utility,
    pub avg_total_utility_gain_with_extras: Utility,
    pub avg_earnings_gain: HomeMoney,
    pub avg_host_earnings_gain: HostMoney,
    pub avg_remittance_gain: HomeMoney,
    /// Only present when total utility is positive
    pub breakdown: Option<UtilityBreakdown>,
}

impl CohortImpact {
    /// Average the outcomes of the graduates among `students`.
    ///
    /// With no graduates every average is zero.
    pub fn from_students<'a, I>(students: I) -> Self
    where
        I: IntoIterator<Item = &'a StudentImpact>,
    {
        let graduates: Vec<_> = students.into_iter().filter(|s| s.graduated).collect();
        if graduates.is_empty() {
            return Self::default();
        }

        let n = Dimensionless(graduates.len() as f64);
        let student: Utility = graduates.iter().map(|s| s.student_utility_gain).sum();
        let remittance: Utility = graduates.iter().map(|s| s.remittance_utility_gain).sum();
        let health: Utility = graduates.iter().map(|s| s.health_utility).sum();
        let migration: Utility = graduates.iter().map(|s| s.migration_utility).sum();
        let earnings: HomeMoney = graduates.iter().map(|s| s.earnings_gain).sum();
        let host_earnings: HostMoney = graduates.iter().map(|s| s.host_earnings_gain).sum();
        let remittance_gain: HomeMoney = graduates.iter().map(|s| s.remittance_gain).sum();

        let total = student + remittance + health + migration;
        let breakdown = (total > Utility(0.0)).then(|| {
            let pct = |part: Utility| (part / total).value() * 100.0;
            UtilityBreakdown {
                direct_income_pct: pct(student),
                remittance_pct: pct(remittance),
                health_pct: pct(health),
                migration_pct: pct(migration),
            }
        });

        Self {
            num_graduated: graduates.len() as u32,
            avg_student_utility_gain: student / n,
            avg_remittance_utility_gain: remittance / n,
            avg_health_utility: health / n,
            avg_migration_utility: migration / n,
            avg_total_utility_gain: (student + remittance) / n,
            avg_total_utility_gain_with_extras: total / n,
            avg_earnings_gain: earnings / n,
            avg_host_earnings_gain: host_earnings / n,
            avg_remittance_gain: remittance_gain / n,
            breakdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::degree::{CompletionDelays, CompletionTier, DegreeProfile};
    use crate::economy::{EconomicParams, EconomicState};
    use crate::student::{StudentContext, StudentParams};
    use float_cmp::assert_approx_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;
    use std::rc::Rc;

    #[rstest]
    #[case(HomeMoney(0.0))]
    #[case(HomeMoney(-50.0))]
    #[case(HomeMoney(1.0))]
    fn test_log_utility_floored(#[case] income: HomeMoney) {
        assert_eq!(log_utility(income, Dimensionless(1.44)), Utility(0.0));
    }

    #[test]
    fn test_log_utility() {
        let utility = log_utility(HomeMoney(1000.0), Dimensionless(2.0));
        assert_approx_eq!(Utility, utility, Utility(2.0 * 1000f64.ln()));
    }

    #[test]
    fn test_remittance_utility() {
        let params = ImpactParams::default();
        assert_eq!(remittance_utility(HomeMoney(0.0), &params), Utility(0.0));
        assert_eq!(remittance_utility(HomeMoney(-1.0), &params), Utility(0.0));

        let expected = ((511.0 + 250.0f64).ln() - 511f64.ln()) * 4.0 * 1.2;
        assert_approx_eq!(
            Utility,
            remittance_utility(HomeMoney(1000.0), &params),
            Utility(expected)
        );
    }

    #[rstest]
    #[case(0)]
    #[case(7)]
    #[case(40)]
    fn test_zero_discount_rate_keeps_value(#[case] period: u32) {
        let factor = discount_factor(Dimensionless(0.0), period);
        assert_eq!(Utility(12.5) * factor, Utility(12.5));
    }

    #[test]
    fn test_discount_factor() {
        assert_approx_eq!(
            Dimensionless,
            discount_factor(Dimensionless(0.05), 2),
            Dimensionless(1.0 / 1.1025)
        );
    }

    #[test]
    fn test_household_income() {
        let params = CounterfactualParams {
            other_earners_income: HomeMoney(600.0),
            household_size: Dimensionless(3.0),
            ..CounterfactualParams::default()
        };
        assert_eq!(
            params.household_income(true, Dimensionless(1.0)),
            HomeMoney(1000.0)
        );
        assert_eq!(
            params.household_income(false, Dimensionless(2.0)),
            HomeMoney(400.0)
        );
    }

    #[test]
    fn test_period_impact_converts_currency_before_utility() {
        let params = ImpactParams {
            remittance_rate: Dimensionless(0.0),
            ..ImpactParams::default()
        };
        let impact = PeriodImpact::assess(
            HostMoney(10000.0),
            HomeMoney(0.0),
            HomeMoney(2400.0),
            Dimensionless(1.0),
            &params,
            Dimensionless(0.0),
        );
        assert_approx_eq!(HomeMoney, impact.income, HomeMoney(4200.0));
        assert_approx_eq!(
            Utility,
            impact.student_utility,
            Utility(1.44 * 4200f64.ln())
        );
        assert_approx_eq!(
            Utility,
            impact.counterfactual_utility,
            Utility(1.44 * 2400f64.ln())
        );
        assert_eq!(impact.remittance_utility, Utility(0.0));
    }

    #[test]
    fn test_period_impact_deflates() {
        let params = ImpactParams::default();
        let impact = PeriodImpact::assess(
            HostMoney(0.0),
            HomeMoney(2400.0),
            HomeMoney(2400.0),
            Dimensionless(1.2),
            &params,
            Dimensionless(0.15),
        );
        assert_approx_eq!(HomeMoney, impact.income, HomeMoney(2000.0));
        assert_approx_eq!(HomeMoney, impact.remittance, HomeMoney(300.0));
        assert_eq!(impact.student_utility, impact.counterfactual_utility);
    }

    fn impact(graduated: bool, student: f64, remittance: f64) -> StudentImpact {
        let health = if graduated { 3.0 } else { 0.0 };
        StudentImpact {
            student_id: StudentID(0),
            degree: "BA".into(),
            graduated,
            is_home: false,
            earnings_gain: HomeMoney(1000.0),
            host_earnings_gain: HostMoney(1000.0 / 0.42),
            remittance_gain: HomeMoney(100.0),
            student_utility_gain: Utility(student),
            remittance_utility_gain: Utility(remittance),
            total_utility_gain: Utility(student + remittance),
            health_utility: Utility(health),
            migration_utility: Utility(0.0),
            total_utility_gain_with_extras: Utility(student + remittance + health),
            years_employed: 5,
            total_payments: HostMoney(0.0),
            years_paid: 0,
            hit_payment_cap: false,
        }
    }

    #[test]
    fn test_cohort_averages_over_graduates_only() {
        let students = [
            impact(true, 10.0, 4.0),
            impact(true, 20.0, 2.0),
            impact(false, 1000.0, 1000.0),
        ];
        let cohort = CohortImpact::from_students(&students);
        assert_eq!(cohort.num_graduated, 2);
        assert_approx_eq!(Utility, cohort.avg_student_utility_gain, Utility(15.0));
        assert_approx_eq!(Utility, cohort.avg_total_utility_gain, Utility(18.0));
        assert_approx_eq!(
            Utility,
            cohort.avg_total_utility_gain_with_extras,
            Utility(21.0)
        );

        let breakdown = cohort.breakdown.unwrap();
        assert_approx_eq!(f64, breakdown.direct_income_pct, 30.0 / 42.0 * 100.0);
        assert_approx_eq!(
            f64,
            breakdown.direct_income_pct
                + breakdown.remittance_pct
                + breakdown.health_pct
                + breakdown.migration_pct,
            100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_cohort_without_graduates() {
        let cohort = CohortImpact::from_students(&[impact(false, 5.0, 5.0)]);
        assert_eq!(cohort, CohortImpact::default());
        assert!(cohort.breakdown.is_none());
    }

    /// Simulate a single nurse for five years after graduating and assess their outcomes
    fn assess_student(years_to_complete: u32, home_return_probability: f64) -> StudentImpact {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let economic_params = EconomicParams {
            initial_unemployment_rate: Dimensionless(0.0),
            ..EconomicParams::default()
        };
        let student_params = StudentParams::default();
        let counterfactual = CounterfactualParams::default();
        let ctx = StudentContext {
            params: &student_params,
            counterfactual: &counterfactual,
            language: None,
        };
        let degree = DegreeProfile::new(
            "NURSE",
            40000.0,
            0.0,
            0.0,
            years_to_complete,
            home_return_probability,
            CompletionTier::OnTime,
        );
        let mut student = StudentTrajectory::new(
            StudentID(0),
            Rc::new(degree),
            0,
            &CompletionDelays::default().sampler().unwrap(),
            None,
            &mut rng,
        );

        let mut economy =
            EconomicState::new(&economic_params, HostMoney(50000.0), HostMoney(27000.0));
        let mut deflators = Vec::new();
        for period in 0..years_to_complete + 5 {
            if period > 0 {
                economy.advance(&mut rng);
            }
            deflators.push(economy.deflator);
            student.step(&economy, &ctx, &mut rng);
        }

        let contract = Contract::new(student.id, HostMoney(16650.0), 0, 10);
        StudentImpact::assess(
            &student,
            &contract,
            &deflators,
            &ImpactParams::default(),
            &counterfactual,
        )
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    #[case(6)]
    fn test_graduate_who_stays(#[case] years_to_complete: u32) {
        let impact = assess_student(years_to_complete, 0.0);
        assert!(impact.graduated);
        assert!(!impact.is_home);
        assert_ne!(impact.total_utility_gain, Utility(0.0));

        // Migration spillover is a fixed share of the student's own gain
        assert_approx_eq!(
            Utility,
            impact.migration_utility,
            impact.total_utility_gain * Dimensionless(0.05),
            epsilon = 1e-12
        );

        // The health benefit is realised when the student graduates
        assert_approx_eq!(
            Utility,
            impact.health_utility,
            Utility(3.0 * 1.05f64.powi(-(years_to_complete as i32))),
            epsilon = 1e-12
        );
        assert_approx_eq!(
            Utility,
            impact.total_utility_gain_with_extras,
            impact.total_utility_gain + impact.health_utility + impact.migration_utility,
            epsilon = 1e-12
        );
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    fn test_graduate_who_returns_home(#[case] years_to_complete: u32) {
        let impact = assess_student(years_to_complete, 1.0);
        assert!(impact.graduated);
        assert!(impact.is_home);
        assert_eq!(impact.migration_utility, Utility(0.0));
        assert_approx_eq!(
            Utility,
            impact.health_utility,
            Utility(3.0 * 1.05f64.powi(-(years_to_complete as i32))),
            epsilon = 1e-12
        );
        assert_eq!(impact.total_payments, HostMoney(0.0));
    }
}
