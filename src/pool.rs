//! The investment pool: cash, the contracts it has bought and the students behind them.
use crate::contract::{Contract, ExitCounts, ExitReason};
use crate::input::{check_proportion, define_param_default, define_unit_param_default};
use crate::student::{StudentID, StudentTrajectory};
use crate::units::{Dimensionless, HostMoney};
use anyhow::{Result, bail, ensure};
use log::trace;
use serde::Deserialize;

define_unit_param_default!(default_cash_reserve_fraction, Dimensionless, 0.02);
define_param_default!(default_reinvestment_cutoff_years, u32, 15);
define_unit_param_default!(default_performance_fee, Dimensionless, 0.0);

/// Share of the current cap a student must have paid for an unresolved contract to count as
/// having reached the years cap at the end of the horizon
const SWEEP_YEARS_CAP_FRACTION: Dimensionless = Dimensionless(0.5);

/// How the pool spends its cash, from the `[pool]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PoolParams {
    /// Number of students funded in period 0 (by default as many as the investment allows)
    #[serde(default)]
    pub initial_cohort_size: Option<u32>,
    /// Share of the initial investment kept back as a cash buffer
    #[serde(default = "default_cash_reserve_fraction")]
    pub cash_reserve_fraction: Dimensionless,
    /// No new students are funded once fewer than this many periods remain
    #[serde(default = "default_reinvestment_cutoff_years")]
    pub reinvestment_cutoff_years: u32,
    /// Share of every payment kept by the program operator rather than credited to the pool
    #[serde(default = "default_performance_fee")]
    pub performance_fee: Dimensionless,
}

impl Default for PoolParams {
    fn default() -> Self {
        Self {
            initial_cohort_size: None,
            cash_reserve_fraction: default_cash_reserve_fraction(),
            reinvestment_cutoff_years: default_reinvestment_cutoff_years(),
            performance_fee: default_performance_fee(),
        }
    }
}

impl PoolParams {
    pub fn validate(&self) -> Result<()> {
        check_proportion("cash_reserve_fraction", self.cash_reserve_fraction)?;
        check_proportion("performance_fee", self.performance_fee)
    }

    /// Cash kept back from reinvestment
    pub fn cash_reserve(&self, initial_investment: HostMoney) -> HostMoney {
        initial_investment * self.cash_reserve_fraction
    }
}

/// Holds the cash, contracts and student roster of a single run
#[derive(Debug, Clone)]
pub struct InvestmentPool {
    initial_investment: HostMoney,
    available_cash: HostMoney,
    period_returns: HostMoney,
    performance_fee: Dimensionless,
    operator_fees: HostMoney,
    cash_history: Vec<HostMoney>,
    roster: Vec<StudentTrajectory>,
    contracts: Vec<Contract>,
    exit_counts: ExitCounts,
}

impl InvestmentPool {
    /// Create a pool holding only cash
    pub fn new(initial_investment: HostMoney) -> Self {
        Self {
            initial_investment,
            available_cash: initial_investment,
            period_returns: HostMoney(0.0),
            performance_fee: Dimensionless(0.0),
            operator_fees: HostMoney(0.0),
            cash_history: vec![initial_investment],
            roster: Vec::new(),
            contracts: Vec::new(),
            exit_counts: ExitCounts::default(),
        }
    }

    /// Pass this share of every payment to the operator instead of the pool
    pub fn with_performance_fee(mut self, performance_fee: Dimensionless) -> Self {
        self.performance_fee = performance_fee;
        self
    }

    /// The amount originally invested
    pub fn initial_investment(&self) -> HostMoney {
        self.initial_investment
    }

    /// Cash not yet invested
    pub fn available_cash(&self) -> HostMoney {
        self.available_cash
    }

    /// Cash at the start and at the end of every period so far
    pub fn cash_history(&self) -> &[HostMoney] {
        &self.cash_history
    }

    /// The ID the next funded student will be given
    pub fn next_student_id(&self) -> StudentID {
        StudentID(self.roster.len() as u32)
    }

    /// Buy a contract for `student` at the given price.
    ///
    /// If there is not enough cash, nothing changes and `false` is returned.
    ///
    /// # Arguments
    ///
    /// * `amount` - Price of the contract
    /// * `student` - The student to fund. Its ID must be [`Self::next_student_id`].
    /// * `start_period` - The period in which the contract is bought
    /// * `max_payment_periods` - Maximum number of payments the contract allows
    pub fn invest(
        &mut self,
        amount: HostMoney,
        student: StudentTrajectory,
        start_period: u32,
        max_payment_periods: u32,
    ) -> bool {
        if self.available_cash < amount {
            return false;
        }

        debug_assert_eq!(student.id, self.next_student_id());
        self.available_cash -= amount;
        self.contracts.push(Contract::new(
            student.id,
            amount,
            start_period,
            max_payment_periods,
        ));
        self.roster.push(student);

        true
    }

    /// How many students the available cash can fund, keeping `reserve` back
    pub fn funding_capacity(&self, price: HostMoney, reserve: HostMoney) -> u32 {
        let surplus = (self.available_cash - reserve).max(HostMoney(0.0));
        (surplus / price).value().floor() as u32
    }

    /// Record a payment against the student's contract and credit the investor's share of it.
    ///
    /// The whole amount counts towards the contract's cap; the performance fee goes to the
    /// operator. Payments against inactive contracts are ignored and `false` is returned.
    pub fn record_payment(&mut self, id: StudentID, amount: HostMoney) -> bool {
        let index = id.0 as usize;
        if !self.contracts[index].record_payment(amount) {
            return false;
        }

        self.roster[index].record_payment(amount);
        let fee = amount * self.performance_fee;
        self.operator_fees += fee;
        self.available_cash += amount - fee;
        self.period_returns += amount - fee;

        true
    }

    /// End the student's contract for the given reason.
    ///
    /// Already-ended contracts are left alone and not counted again; `false` is returned.
    pub fn mark_contract_exit(&mut self, id: StudentID, reason: ExitReason, period: u32) -> bool {
        let index = id.0 as usize;
        if !self.contracts[index].mark_exit(reason, period) {
            return false;
        }

        if reason == ExitReason::PaymentCap {
            self.roster[index].hit_payment_cap = true;
        }
        self.exit_counts.increment(reason);
        trace!("Contract for student {id} exited in period {period}: {reason}");

        true
    }

    /// Close the books for the period, returning the investor's share of the payments received
    /// during it
    pub fn end_year(&mut self) -> HostMoney {
        self.cash_history.push(self.available_cash);

        std::mem::take(&mut self.period_returns)
    }

    /// Resolve every contract still active at the end of the horizon.
    ///
    /// Students who have paid at least half of the current cap count as having reached the years
    /// cap, students at home as having returned home, and everyone else as having defaulted.
    pub fn sweep_remaining(&mut self, current_cap: HostMoney, period: u32) {
        let threshold = current_cap * SWEEP_YEARS_CAP_FRACTION;
        let unresolved: Vec<_> = self
            .contracts
            .iter()
            .filter(|contract| contract.is_active())
            .map(|contract| contract.student_id)
            .collect();

        for id in unresolved {
            let contract = &self.contracts[id.0 as usize];
            let student = &self.roster[id.0 as usize];
            let reason = if contract.cumulative_payments >= threshold {
                ExitReason::YearsCap
            } else if student.is_home {
                ExitReason::HomeReturn
            } else {
                ExitReason::Default
            };
            self.mark_contract_exit(id, reason, period);
        }
    }

    /// Check that every contract has ended and the exit counts add up.
    ///
    /// Should be called after [`Self::sweep_remaining`].
    pub fn verify_exit_accounting(&self) -> Result<()> {
        if let Some(contract) = self.contracts.iter().find(|contract| contract.is_active()) {
            bail!(
                "Contract for student {} is still active after the end-of-horizon sweep",
                contract.student_id
            );
        }

        for reason in [
            ExitReason::PaymentCap,
            ExitReason::YearsCap,
            ExitReason::HomeReturn,
            ExitReason::Default,
        ] {
            let count = self
                .contracts
                .iter()
                .filter(|contract| contract.exit_reason == Some(reason))
                .count() as u32;
            ensure!(
                count == self.exit_counts.get(reason),
                "Exit count for {reason} ({}) does not match the number of contracts ending that \
                 way ({count})",
                self.exit_counts.get(reason)
            );
        }

        ensure!(
            self.exit_counts.total() as usize == self.contracts.len(),
            "Total exits ({}) do not match total contracts ({})",
            self.exit_counts.total(),
            self.contracts.len()
        );

        Ok(())
    }

    /// Annualised log return on the initial investment.
    ///
    /// `-inf` if the pool ends with no cash.
    pub fn irr(&self, final_cash: HostMoney, num_years: u32) -> f64 {
        if final_cash <= HostMoney(0.0) || self.initial_investment <= HostMoney(0.0) {
            return f64::NEG_INFINITY;
        }
        if num_years == 0 {
            return 0.0;
        }

        (final_cash / self.initial_investment).value().ln() / num_years as f64
    }

    /// Per-reason exit counts
    pub fn exit_counts(&self) -> ExitCounts {
        self.exit_counts
    }

    /// Number of contracts ever bought
    pub fn total_contracts(&self) -> u32 {
        self.contracts.len() as u32
    }

    /// Number of contracts still active
    pub fn active_contracts(&self) -> u32 {
        self.contracts.iter().filter(|c| c.is_active()).count() as u32
    }

    pub fn contracts(&self) -> &[Contract] {
        &self.contracts
    }

    pub fn contract(&self, id: StudentID) -> &Contract {
        &self.contracts[id.0 as usize]
    }

    pub fn students(&self) -> &[StudentTrajectory] {
        &self.roster
    }

    pub fn student(&self, id: StudentID) -> &StudentTrajectory {
        &self.roster[id.0 as usize]
    }

    pub fn student_mut(&mut self, id: StudentID) -> &mut StudentTrajectory {
        &mut self.roster[id.0 as usize]
    }

    /// Total payments received over the pool's lifetime
    pub fn total_payments(&self) -> HostMoney {
        self.contracts.iter().map(|c| c.cumulative_payments).sum()
    }

    /// Payments kept by the operator over the pool's lifetime
    pub fn operator_fees(&self) -> HostMoney {
        self.operator_fees
    }

    /// Payments credited to the pool over its lifetime
    pub fn investor_payments(&self) -> HostMoney {
        self.total_payments() - self.operator_fees
    }
}
