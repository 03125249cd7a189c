//! Functionality for running the simulation.
use crate::contract::{ExitCounts, ExitReason, IsaTerms};
use crate::degree::{CompletionDelays, DegreeMix, DelaySampler};
use crate::economy::{EconomicParams, EconomicState};
use crate::impact::{CohortImpact, CounterfactualParams, ImpactParams, StudentImpact};
use crate::pool::{InvestmentPool, PoolParams};
use crate::program::ProgramType;
use crate::student::{
    LanguageParams, PeriodRecord, StudentContext, StudentID, StudentParams, StudentTrajectory,
};
use crate::units::{Dimensionless, HostMoney};
use anyhow::{Context, Result, ensure};
use log::{debug, warn};
use rand::Rng;
use serde::Serialize;

pub mod batch;
pub use batch::{BatchResult, BatchSummary, run_batch};
pub mod scenario;
pub use scenario::{Scenario, percentile_scenarios, run_scenarios};

/// Everything needed to run the simulation once
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// The kind of program being funded
    pub program: ProgramType,
    /// Cash in the pool at the start
    pub initial_investment: HostMoney,
    /// Number of periods (years) to simulate
    pub num_years: u32,
    /// Agreement terms
    pub isa: IsaTerms,
    /// Initial economic conditions
    pub economy: EconomicParams,
    /// Career tracks that new students are drawn from
    pub degrees: DegreeMix,
    /// Completion delay distributions
    pub completion_delays: CompletionDelays,
    pub student: StudentParams,
    pub counterfactual: CounterfactualParams,
    /// Optional language course
    pub language: Option<LanguageParams>,
    pub impact: ImpactParams,
    pub pool: PoolParams,
}

impl SimulationConfig {
    /// A configuration using the program's default terms and degree mix.
    ///
    /// # Arguments
    ///
    /// * `program` - The program being funded
    /// * `initial_investment` - Cash in the pool at the start
    /// * `num_years` - Number of periods to simulate
    /// * `home_return_probability` - Probability that graduates return home
    pub fn new(
        program: ProgramType,
        initial_investment: HostMoney,
        num_years: u32,
        home_return_probability: Dimensionless,
    ) -> Result<Self> {
        Ok(Self {
            program,
            initial_investment,
            num_years,
            isa: program.default_terms(),
            economy: EconomicParams::default(),
            degrees: program.default_degree_mix(home_return_probability)?,
            completion_delays: CompletionDelays::default(),
            student: StudentParams::default(),
            counterfactual: CounterfactualParams::default(),
            language: None,
            impact: ImpactParams::default(),
            pool: PoolParams::default(),
        })
    }

    /// Check that the configuration can be run
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.initial_investment > HostMoney(0.0) && self.initial_investment.is_finite(),
            "initial_investment must be a finite number greater than zero"
        );
        ensure!(self.num_years > 0, "num_years cannot be zero");

        self.isa.validate().context("Invalid ISA terms")?;
        self.economy
            .validate()
            .context("Invalid economic parameters")?;
        self.completion_delays.validate()?;
        self.student
            .validate()
            .context("Invalid student parameters")?;
        self.counterfactual
            .validate()
            .context("Invalid counterfactual parameters")?;
        if let Some(language) = &self.language {
            language
                .validate()
                .context("Invalid language parameters")?;
        }
        self.impact
            .validate()
            .context("Invalid impact parameters")?;
        self.pool.validate().context("Invalid pool parameters")?;

        if self.pool.reinvestment_cutoff_years == 0 {
            warn!(
                "reinvestment_cutoff_years is zero: students funded in the final period will \
                 never be simulated"
            );
        } else if self.pool.reinvestment_cutoff_years >= self.num_years {
            warn!(
                "reinvestment_cutoff_years ({}) is not less than num_years ({}): payments will \
                 never be reinvested",
                self.pool.reinvestment_cutoff_years, self.num_years
            );
        }
        if self.initial_cohort_size() == 0 {
            warn!("The initial investment cannot fund any students");
        }

        Ok(())
    }

    /// Number of students funded in period 0
    pub fn initial_cohort_size(&self) -> u32 {
        self.pool.initial_cohort_size.unwrap_or_else(|| {
            let budget = self.initial_investment - self.pool.cash_reserve(self.initial_investment);
            (budget / self.isa.price_per_student).value().floor().max(0.0) as u32
        })
    }

    fn student_context(&self) -> StudentContext<'_> {
        StudentContext {
            params: &self.student,
            counterfactual: &self.counterfactual,
            language: self.language.as_ref(),
        }
    }
}

/// The state of the pool at the end of one period
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodSnapshot {
    pub period: u32,
    /// Cash after reinvestment
    pub cash: HostMoney,
    pub total_contracts: u32,
    pub active_contracts: u32,
    /// Payments credited to the pool during the period, net of the performance fee
    pub returns: HostMoney,
    /// Contracts that have ended so far
    pub cumulative_exits: u32,
    pub inflation_rate: Dimensionless,
    pub unemployment_rate: Dimensionless,
    pub deflator: Dimensionless,
}

/// The outcome of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub initial_investment: HostMoney,
    /// Nominal cash at the end of the horizon
    pub final_cash: HostMoney,
    /// Final cash in period-0 terms
    pub real_final_cash: HostMoney,
    pub irr: f64,
    pub real_irr: f64,
    /// Number of students funded
    pub total_students: u32,
    /// Number of students who graduated
    pub students_educated: u32,
    pub exit_counts: ExitCounts,
    /// Nominal payments made by students over the whole horizon
    pub total_payments: HostMoney,
    /// The part of `total_payments` credited to the pool
    pub investor_payments: HostMoney,
    /// The part of `total_payments` kept by the operator as a performance fee
    pub operator_fees: HostMoney,
    pub periods: Vec<PeriodSnapshot>,
    /// Welfare outcomes averaged over graduates
    pub cohort: CohortImpact,
    /// Welfare outcomes of every student
    pub students: Vec<StudentImpact>,
}

impl RunResult {
    /// Share of funded students who graduated
    pub fn graduation_rate(&self) -> Dimensionless {
        if self.total_students == 0 {
            return Dimensionless(0.0);
        }

        Dimensionless(self.students_educated as f64 / self.total_students as f64)
    }
}

/// Run the simulation once.
///
/// # Arguments
///
/// * `config` - The simulation configuration
/// * `rng` - Random number generator for the run
pub fn run<R: Rng + ?Sized>(config: &SimulationConfig, rng: &mut R) -> Result<RunResult> {
    run_with_callback(config, rng, |_| {})
}

/// Run the simulation once, passing a snapshot of the pool to `callback` after every period.
///
/// # Arguments
///
/// * `config` - The simulation configuration
/// * `rng` - Random number generator for the run
/// * `callback` - Called at the end of each period
pub fn run_with_callback<R, F>(
    config: &SimulationConfig,
    rng: &mut R,
    mut callback: F,
) -> Result<RunResult>
where
    R: Rng + ?Sized,
    F: FnMut(&PeriodSnapshot),
{
    config.validate()?;

    let ctx = config.student_context();
    let delays = config.completion_delays.sampler()?;
    let mut economy = EconomicState::new(&config.economy, config.isa.cap, config.isa.threshold);
    let mut pool = InvestmentPool::new(config.initial_investment)
        .with_performance_fee(config.pool.performance_fee);
    let mut deflators = Vec::with_capacity(config.num_years as usize);
    let mut periods = Vec::with_capacity(config.num_years as usize);

    fund_initial_cohort(config, &delays, &mut pool, rng);

    for period in 0..config.num_years {
        if period > 0 {
            economy.advance(rng);
        }
        deflators.push(economy.deflator);

        step_students(config, &ctx, &economy, &mut pool, rng);
        let returns = pool.end_year();
        reinvest(config, &ctx, &delays, &economy, &mut pool, rng);

        let snapshot = PeriodSnapshot {
            period,
            cash: pool.available_cash(),
            total_contracts: pool.total_contracts(),
            active_contracts: pool.active_contracts(),
            returns,
            cumulative_exits: pool.exit_counts().total(),
            inflation_rate: economy.inflation_rate,
            unemployment_rate: economy.unemployment_rate,
            deflator: economy.deflator,
        };
        debug!(
            "Period {period}: cash {:.2}, returns {:.2}, {} of {} contracts active",
            snapshot.cash.value(),
            returns.value(),
            snapshot.active_contracts,
            snapshot.total_contracts
        );
        callback(&snapshot);
        periods.push(snapshot);
    }

    pool.sweep_remaining(economy.isa_cap, config.num_years - 1);
    pool.verify_exit_accounting()?;

    let final_cash = pool.available_cash();
    let real_final_cash = economy.deflate(final_cash);
    let students: Vec<_> = pool
        .students()
        .iter()
        .zip(pool.contracts())
        .map(|(student, contract)| {
            StudentImpact::assess(
                student,
                contract,
                &deflators,
                &config.impact,
                &config.counterfactual,
            )
        })
        .collect();

    let result = RunResult {
        initial_investment: config.initial_investment,
        final_cash,
        real_final_cash,
        irr: pool.irr(final_cash, config.num_years),
        real_irr: pool.irr(real_final_cash, config.num_years),
        total_students: pool.total_contracts(),
        students_educated: pool.students().iter().filter(|s| s.is_graduated).count() as u32,
        exit_counts: pool.exit_counts(),
        total_payments: pool.total_payments(),
        investor_payments: pool.investor_payments(),
        operator_fees: pool.operator_fees(),
        periods,
        cohort: CohortImpact::from_students(&students),
        students,
    };
    debug!(
        "Run finished: final cash {:.2}, IRR {:.4}, {} students funded",
        result.final_cash.value(),
        result.irr,
        result.total_students
    );

    Ok(result)
}

/// Fund the students who start in period 0
fn fund_initial_cohort<R: Rng + ?Sized>(
    config: &SimulationConfig,
    delays: &DelaySampler,
    pool: &mut InvestmentPool,
    rng: &mut R,
) {
    let cohort_size = config.initial_cohort_size();
    let ctx = config.student_context();
    for _ in 0..cohort_size {
        let student = enrol(config, &ctx, delays, pool, 0, rng);
        if !pool.invest(
            config.isa.price_per_student,
            student,
            0,
            config.isa.max_payment_years,
        ) {
            warn!(
                "Initial investment only covers {} of {cohort_size} students",
                pool.total_contracts()
            );
            break;
        }
    }
}

fn enrol<R: Rng + ?Sized>(
    config: &SimulationConfig,
    ctx: &StudentContext,
    delays: &DelaySampler,
    pool: &InvestmentPool,
    enrollment_period: u32,
    rng: &mut R,
) -> StudentTrajectory {
    let degree = config.degrees.sample(rng);
    StudentTrajectory::new(
        pool.next_student_id(),
        degree,
        enrollment_period,
        delays,
        ctx.language,
        rng,
    )
}

/// Advance every enrolled student by one period and settle their contracts
fn step_students<R: Rng + ?Sized>(
    config: &SimulationConfig,
    ctx: &StudentContext,
    economy: &EconomicState,
    pool: &mut InvestmentPool,
    rng: &mut R,
) {
    for index in 0..pool.total_contracts() {
        let id = StudentID(index);
        if pool.student(id).enrollment_period > economy.period {
            continue;
        }

        let record = pool.student_mut(id).step(economy, ctx, rng);
        settle_contract(&config.isa, economy, pool, id, &record);
    }
}

/// Collect any payment due from a student and end their contract if it has run its course
fn settle_contract(
    terms: &IsaTerms,
    economy: &EconomicState,
    pool: &mut InvestmentPool,
    id: StudentID,
    record: &PeriodRecord,
) {
    let period = economy.period;
    if !pool.contract(id).is_active() {
        return;
    }

    let student = pool.student(id);
    if student.is_home {
        pool.mark_contract_exit(id, ExitReason::HomeReturn, period);
        return;
    }
    if !student.is_graduated {
        return;
    }
    if student.unemployment_spell > terms.default_unemployment_years {
        pool.mark_contract_exit(id, ExitReason::Default, period);
        return;
    }
    if record.host_earnings <= economy.isa_threshold {
        return;
    }

    let due = record.host_earnings * terms.percentage;
    let remaining_cap =
        (economy.isa_cap - pool.contract(id).cumulative_payments).max(HostMoney(0.0));
    let capped = remaining_cap <= due;
    pool.record_payment(id, due.min(remaining_cap));

    if capped {
        pool.mark_contract_exit(id, ExitReason::PaymentCap, period);
    } else if pool.contract(id).remaining_payment_periods == 0 {
        pool.mark_contract_exit(id, ExitReason::YearsCap, period);
    }
}

/// Fund new students from surplus cash, if enough of the horizon remains
fn reinvest<R: Rng + ?Sized>(
    config: &SimulationConfig,
    ctx: &StudentContext,
    delays: &DelaySampler,
    economy: &EconomicState,
    pool: &mut InvestmentPool,
    rng: &mut R,
) {
    let period = economy.period;
    let price = config.isa.price_per_student * economy.deflator;
    if period + config.pool.reinvestment_cutoff_years >= config.num_years
        || pool.available_cash() <= price
    {
        return;
    }

    let reserve = config.pool.cash_reserve(config.initial_investment);
    let new_students = pool.funding_capacity(price, reserve);
    let mut funded = 0;
    for _ in 0..new_students {
        // New students begin studying in the following period
        let student = enrol(config, ctx, delays, pool, period + 1, rng);
        if !pool.invest(price, student, period, config.isa.max_payment_years) {
            break;
        }
        funded += 1;
    }

    if funded > 0 {
        debug!(
            "Period {period}: reinvested {:.2} in {funded} new students at {:.2} each",
            (price * Dimensionless(funded as f64)).value(),
            price.value()
        );
    }
}
