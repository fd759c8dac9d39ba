//! Fixed-payment monthly amortization.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PropertyFinanceError;
use crate::schedule::RateSchedule;
use crate::time_value::{annuity_payment, monthly_rate, validate_rate_and_term};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::PropertyFinanceResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanParameters {
    pub principal: Money,
    pub annual_rate: Rate,
    pub tenure_years: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationEntry {
    pub month: u32,
    pub payment: Money,
    pub principal: Money,
    pub interest: Money,
    pub balance: Money,
    pub cumulative_interest: Money,
}

/// A complete repayment schedule. Built only by [`generate_schedule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    principal: Money,
    annual_rate: Rate,
    tenure_years: u32,
    monthly_payment: Money,
    total_payment: Money,
    total_interest: Money,
    entries: Vec<AmortizationEntry>,
}

impl AmortizationSchedule {
    pub fn principal(&self) -> Money {
        self.principal
    }

    pub fn annual_rate(&self) -> Rate {
        self.annual_rate
    }

    pub fn tenure_years(&self) -> u32 {
        self.tenure_years
    }

    pub fn monthly_payment(&self) -> Money {
        self.monthly_payment
    }

    pub fn total_payment(&self) -> Money {
        self.total_payment
    }

    pub fn total_interest(&self) -> Money {
        self.total_interest
    }

    pub fn entries(&self) -> &[AmortizationEntry] {
        &self.entries
    }

    pub fn months(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Interest paid during loan year `year` (1-based). Zero once the loan is repaid.
    pub fn interest_for_year(&self, year: u32) -> Money {
        self.year_entries(year).map(|e| e.interest).sum()
    }

    pub fn principal_for_year(&self, year: u32) -> Money {
        self.year_entries(year).map(|e| e.principal).sum()
    }

    /// Payment due in `month` (1-based); zero after the final month.
    pub fn payment_for_month(&self, month: u32) -> Money {
        month
            .checked_sub(1)
            .and_then(|i| self.entries.get(i as usize))
            .map_or(Decimal::ZERO, |e| e.payment)
    }

    /// Outstanding balance after `month` payments. Month 0 is the original principal.
    pub fn balance_after_month(&self, month: u32) -> Money {
        if month == 0 {
            return self.principal;
        }
        self.entries
            .get(month as usize - 1)
            .map_or(Decimal::ZERO, |e| e.balance)
    }

    fn year_entries(&self, year: u32) -> impl Iterator<Item = &AmortizationEntry> {
        let first = year.saturating_sub(1) * 12;
        self.entries
            .iter()
            .skip(first as usize)
            .take(if year == 0 { 0 } else { 12 })
    }
}

/// Year-level roll-up of the monthly schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationYear {
    pub year: u32,
    pub principal: Money,
    pub interest: Money,
    pub closing_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MortgageOutput {
    pub monthly_payment: Money,
    pub total_payment: Money,
    pub total_interest: Money,
    pub yearly: Vec<AmortizationYear>,
    pub schedule: AmortizationSchedule,
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Build the month-by-month schedule for a fixed-rate loan.
///
/// The final month pays off whatever balance remains, so the principal
/// components sum to the original principal and the closing balance is
/// exactly zero.
pub fn generate_schedule(
    principal: Money,
    annual_rate: Rate,
    tenure_years: u32,
) -> PropertyFinanceResult<AmortizationSchedule> {
    if principal < Decimal::ZERO {
        return Err(PropertyFinanceError::invalid("principal", "principal cannot be negative"));
    }
    validate_rate_and_term("annual_rate", annual_rate, "tenure_years", tenure_years)?;

    let rate = monthly_rate(annual_rate);
    let total_months = tenure_years * 12;
    let payment = annuity_payment(principal, rate, total_months)?;

    let mut entries = Vec::with_capacity(total_months as usize);
    let mut balance = principal;
    let mut cumulative_interest = Decimal::ZERO;
    let mut total_payment = Decimal::ZERO;

    for month in 1..=total_months {
        let interest = balance * rate;
        let (principal_part, paid) = if month == total_months {
            (balance, balance + interest)
        } else {
            let p = (payment - interest).min(balance);
            (p, p + interest)
        };
        balance -= principal_part;
        cumulative_interest += interest;
        total_payment += paid;

        entries.push(AmortizationEntry {
            month,
            payment: paid,
            principal: principal_part,
            interest,
            balance,
            cumulative_interest,
        });
    }

    Ok(AmortizationSchedule {
        principal,
        annual_rate,
        tenure_years,
        monthly_payment: payment,
        total_payment,
        total_interest: total_payment - principal,
        entries,
    })
}

/// Mortgage repayment summary with the full schedule and yearly roll-up.
pub fn calculate_mortgage(
    input: &LoanParameters,
    schedule: &RateSchedule,
) -> PropertyFinanceResult<ComputationOutput<MortgageOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let amortization = generate_schedule(input.principal, input.annual_rate, input.tenure_years)?;
    if input.principal.is_zero() {
        warnings.push("Principal is zero; schedule contains no repayments".into());
    }

    let yearly = (1..=input.tenure_years)
        .map(|year| AmortizationYear {
            year,
            principal: amortization.principal_for_year(year),
            interest: amortization.interest_for_year(year),
            closing_balance: amortization.balance_after_month(year * 12),
        })
        .collect();

    let output = MortgageOutput {
        monthly_payment: amortization.monthly_payment(),
        total_payment: amortization.total_payment(),
        total_interest: amortization.total_interest(),
        yearly,
        schedule: amortization,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Fixed-rate annuity amortization (monthly compounding)",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "annual_rate": input.annual_rate.to_string(),
            "tenure_years": input.tenure_years,
        }),
        warnings,
        &schedule.version,
        elapsed,
        output,
    ))
}
