//! Income-share agreements and the ways they can end.
use crate::input::check_proportion;
use crate::student::StudentID;
use crate::units::{Dimensionless, HostMoney};
use anyhow::{Result, ensure};
use serde::Serialize;
use strum::{Display, EnumIter, IntoEnumIterator};

/// The terms on which students are funded
#[derive(Debug, Clone, PartialEq)]
pub struct IsaTerms {
    /// Share of income paid while above the threshold
    pub percentage: Dimensionless,
    /// Cap on total payments, indexed to inflation over time
    pub cap: HostMoney,
    /// Income threshold, indexed to inflation over time
    pub threshold: HostMoney,
    /// Maximum number of payments
    pub max_payment_years: u32,
    /// A contract defaults once its student has been unemployed for longer than this
    pub default_unemployment_years: u32,
    /// Cost of funding one student, in period-0 terms
    pub price_per_student: HostMoney,
}

impl IsaTerms {
    /// Check that the terms describe a usable agreement
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.percentage > Dimensionless(0.0),
            "ISA percentage must be greater than zero"
        );
        check_proportion("ISA percentage", self.percentage)?;
        ensure!(
            self.cap > HostMoney(0.0) && self.cap.is_finite(),
            "ISA cap must be a finite number greater than zero"
        );
        ensure!(
            self.threshold >= HostMoney(0.0) && self.threshold.is_finite(),
            "ISA threshold must be a finite, non-negative number"
        );
        ensure!(
            self.price_per_student > HostMoney(0.0) && self.price_per_student.is_finite(),
            "Price per student must be a finite number greater than zero"
        );
        ensure!(
            self.max_payment_years > 0,
            "max_payment_years cannot be zero"
        );

        Ok(())
    }
}

/// Why a contract stopped generating payments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Total payments reached the cap
    PaymentCap,
    /// The maximum number of payments was made
    YearsCap,
    /// The student returned to their home country
    HomeReturn,
    /// The student stopped paying
    Default,
}

/// Number of contracts that have ended for each reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExitCounts {
    /// Contracts ending at the payment cap
    pub payment_cap: u32,
    /// Contracts ending at the payment-years cap
    pub years_cap: u32,
    /// Contracts ending with a return home
    pub home_return: u32,
    /// Contracts ending in default
    pub default: u32,
}

impl ExitCounts {
    /// The count for a single exit reason
    pub fn get(&self, reason: ExitReason) -> u32 {
        match reason {
            ExitReason::PaymentCap => self.payment_cap,
            ExitReason::YearsCap => self.years_cap,
            ExitReason::HomeReturn => self.home_return,
            ExitReason::Default => self.default,
        }
    }

    fn get_mut(&mut self, reason: ExitReason) -> &mut u32 {
        match reason {
            ExitReason::PaymentCap => &mut self.payment_cap,
            ExitReason::YearsCap => &mut self.years_cap,
            ExitReason::HomeReturn => &mut self.home_return,
            ExitReason::Default => &mut self.default,
        }
    }

    /// Record one more exit for the given reason
    pub fn increment(&mut self, reason: ExitReason) {
        *self.get_mut(reason) += 1;
    }

    /// Total number of exits
    pub fn total(&self) -> u32 {
        ExitReason::iter().map(|reason| self.get(reason)).sum()
    }
}

/// A single income-share agreement, paired one-to-one with a student
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    /// The student whose income the contract is a share of
    pub student_id: StudentID,
    /// The amount paid for the contract
    pub purchase_price: HostMoney,
    /// The period in which the contract was bought
    pub start_period: u32,
    /// Maximum number of payments
    pub max_payment_periods: u32,
    /// Payments still to be made before the years cap is reached
    pub remaining_payment_periods: u32,
    /// Total (nominal) payments received so far
    pub cumulative_payments: HostMoney,
    /// A linear estimate of the contract's remaining value
    pub current_value: HostMoney,
    /// Why the contract ended, if it has
    pub exit_reason: Option<ExitReason>,
    /// When the contract ended, if it has
    pub exit_period: Option<u32>,
}

impl Contract {
    /// Create a new, active contract
    pub fn new(
        student_id: StudentID,
        purchase_price: HostMoney,
        start_period: u32,
        max_payment_periods: u32,
    ) -> Self {
        Self {
            student_id,
            purchase_price,
            start_period,
            max_payment_periods,
            remaining_payment_periods: max_payment_periods,
            cumulative_payments: HostMoney(0.0),
            current_value: purchase_price,
            exit_reason: None,
            exit_period: None,
        }
    }

    /// Whether the contract can still receive payments
    pub fn is_active(&self) -> bool {
        self.exit_reason.is_none()
    }

    /// Number of payments received so far
    pub fn payments_made(&self) -> u32 {
        self.max_payment_periods - self.remaining_payment_periods
    }

    /// Record a payment from the student.
    ///
    /// Returns `false` without changing anything if the contract is no longer active.
    pub fn record_payment(&mut self, amount: HostMoney) -> bool {
        if !self.is_active() {
            return false;
        }

        self.cumulative_payments += amount;
        self.remaining_payment_periods = self.remaining_payment_periods.saturating_sub(1);
        self.current_value = self.purchase_price
            * Dimensionless(
                self.remaining_payment_periods as f64 / self.max_payment_periods as f64,
            );

        true
    }

    /// End the contract.
    ///
    /// Returns `false` if the contract had already ended, in which case it is left untouched.
    pub fn mark_exit(&mut self, reason: ExitReason, period: u32) -> bool {
        if !self.is_active() {
            return false;
        }

        self.exit_reason = Some(reason);
        self.exit_period = Some(period);
        self.current_value = HostMoney(0.0);

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, isa_terms};
    use rstest::rstest;

    #[test]
    fn test_record_payment() {
        let mut contract = Contract::new(StudentID(0), HostMoney(16650.0), 0, 10);
        assert!(contract.record_payment(HostMoney(4800.0)));
        assert_eq!(contract.cumulative_payments, HostMoney(4800.0));
        assert_eq!(contract.remaining_payment_periods, 9);
        assert_eq!(contract.payments_made(), 1);
        assert_eq!(contract.current_value, HostMoney(16650.0 * 0.9));
    }

    #[test]
    fn test_no_payments_after_exit() {
        let mut contract = Contract::new(StudentID(0), HostMoney(16650.0), 0, 10);
        contract.record_payment(HostMoney(100.0));
        assert!(contract.mark_exit(ExitReason::Default, 3));
        assert_eq!(contract.current_value, HostMoney(0.0));

        assert!(!contract.record_payment(HostMoney(100.0)));
        assert_eq!(contract.cumulative_payments, HostMoney(100.0));
        assert_eq!(contract.current_value, HostMoney(0.0));
    }

    #[test]
    fn test_mark_exit_is_one_shot() {
        let mut contract = Contract::new(StudentID(0), HostMoney(16650.0), 0, 10);
        assert!(contract.mark_exit(ExitReason::HomeReturn, 4));
        assert!(!contract.mark_exit(ExitReason::Default, 5));
        assert_eq!(contract.exit_reason, Some(ExitReason::HomeReturn));
        assert_eq!(contract.exit_period, Some(4));
    }

    #[test]
    fn test_exit_counts() {
        let mut counts = ExitCounts::default();
        counts.increment(ExitReason::Default);
        counts.increment(ExitReason::Default);
        counts.increment(ExitReason::PaymentCap);
        assert_eq!(counts.get(ExitReason::Default), 2);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_exit_reason_display() {
        assert_eq!(ExitReason::PaymentCap.to_string(), "payment_cap");
        assert_eq!(ExitReason::HomeReturn.to_string(), "home_return");
    }

    #[rstest]
    fn test_terms_validate(isa_terms: IsaTerms) {
        assert!(isa_terms.validate().is_ok());
    }

    #[rstest]
    #[case(0.0, "ISA percentage must be greater than zero")]
    #[case(1.5, "ISA percentage must be between 0 and 1 (got 1.5)")]
    fn test_terms_invalid_percentage(
        mut isa_terms: IsaTerms,
        #[case] percentage: f64,
        #[case] msg: &str,
    ) {
        isa_terms.percentage = Dimensionless(percentage);
        assert_error!(isa_terms.validate(), msg);
    }

    #[rstest]
    fn test_terms_invalid_price(mut isa_terms: IsaTerms) {
        isa_terms.price_per_student = HostMoney(0.0);
        assert_error!(
            isa_terms.validate(),
            "Price per student must be a finite number greater than zero"
        );
    }
}
