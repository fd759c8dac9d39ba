//! Maximum affordable price under TDSR, MSR, LTV and cash/CPF sufficiency.
//!
//! The debt-ratio cap is solved in closed form: the largest monthly
//! repayment the ratios allow is turned into a loan by inverting the annuity
//! formula, and the loan into a price by dividing by the LTV limit. The cash
//! cap is found by bisection, since tiered BSD makes the upfront bill
//! piecewise in price. The lower cap wins; equal caps are attributed to the
//! cash side.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::debt_servicing::{
    effective_income, evaluate_msr, evaluate_tdsr, gross_income, ApplicantIncome,
};
use crate::error::PropertyFinanceError;
use crate::schedule::{LtvRule, RateSchedule};
use crate::stamp_duty::{compute_absd, compute_bsd};
use crate::time_value::{
    annuity_payment, annuity_present_value, monthly_rate, validate_rate_and_term,
};
use crate::types::{
    round_money, with_metadata, ComputationOutput, ConstraintResult, Money, PropertyType, Rate,
    Residency,
};
use crate::PropertyFinanceResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Bisection stops once the bracket is narrower than one cent.
const BISECTION_TOL: Decimal = dec!(0.01);

/// Maximum bisection iterations.
const BISECTION_MAX_ITER: u32 = 200;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    #[serde(flatten)]
    pub income: ApplicantIncome,
    pub age: u32,
}

/// The buyer's financial position as entered by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialProfile {
    pub applicants: Vec<Applicant>,
    #[serde(default)]
    pub existing_monthly_debt: Money,
    pub cash_savings: Money,
    #[serde(default)]
    pub cpf_oa_balance: Money,
    pub residency: Residency,
    #[serde(default)]
    pub properties_owned: u32,
    #[serde(default)]
    pub existing_housing_loans: u32,
    /// Overrides the schedule's variable-income haircut.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_income_haircut: Option<Rate>,
}

impl FinancialProfile {
    pub fn incomes(&self) -> Vec<ApplicantIncome> {
        self.applicants.iter().map(|a| a.income.clone()).collect()
    }

    /// Age used for the loan-age cap: the income-weighted average age of all
    /// applicants, rounded up. Falls back to the plain average when nobody
    /// earns anything.
    pub fn loan_age(&self) -> u32 {
        if self.applicants.is_empty() {
            return 0;
        }
        let weights: Vec<Money> = self
            .applicants
            .iter()
            .map(|a| a.income.fixed_monthly + a.income.variable_monthly)
            .collect();
        let total: Money = weights.iter().copied().sum();

        let average = if total > Decimal::ZERO {
            self.applicants
                .iter()
                .zip(&weights)
                .map(|(a, w)| Decimal::from(a.age) * w)
                .sum::<Decimal>()
                / total
        } else {
            self.applicants
                .iter()
                .map(|a| Decimal::from(a.age))
                .sum::<Decimal>()
                / Decimal::from(self.applicants.len() as u64)
        };
        average.ceil().to_u32().unwrap_or(u32::MAX)
    }

    pub(crate) fn validate(&self) -> PropertyFinanceResult<()> {
        if self.applicants.is_empty() {
            return Err(PropertyFinanceError::invalid(
                "applicants",
                "at least one applicant is required",
            ));
        }
        for (i, a) in self.applicants.iter().enumerate() {
            if a.income.fixed_monthly < Decimal::ZERO || a.income.variable_monthly < Decimal::ZERO {
                return Err(PropertyFinanceError::invalid(
                    format!("applicants[{i}]"),
                    "income cannot be negative",
                ));
            }
        }
        if self.existing_monthly_debt < Decimal::ZERO {
            return Err(PropertyFinanceError::invalid(
                "existing_monthly_debt",
                "cannot be negative",
            ));
        }
        if self.cash_savings < Decimal::ZERO {
            return Err(PropertyFinanceError::invalid("cash_savings", "cannot be negative"));
        }
        if self.cpf_oa_balance < Decimal::ZERO {
            return Err(PropertyFinanceError::invalid("cpf_oa_balance", "cannot be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordabilityInput {
    pub profile: FinancialProfile,
    pub property_type: PropertyType,
    pub annual_rate: Rate,
    pub tenure_years: u32,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingConstraint {
    #[serde(rename = "TDSR")]
    Tdsr,
    #[serde(rename = "MSR")]
    Msr,
    /// The LTV rule's minimum cash down payment exhausts cash on hand.
    #[serde(rename = "LTV")]
    Ltv,
    /// Cash plus usable CPF cannot fund the upfront bill.
    Cash,
    /// No income to service any loan.
    Income,
}

impl fmt::Display for BindingConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BindingConstraint::Tdsr => "TDSR",
            BindingConstraint::Msr => "MSR",
            BindingConstraint::Ltv => "LTV",
            BindingConstraint::Cash => "Cash",
            BindingConstraint::Income => "Income",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenureAdjustment {
    pub requested_years: u32,
    pub effective_years: u32,
    pub loan_age: u32,
    pub reason: String,
}

/// Upfront bill at a given price, split by how each part may be paid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownpaymentBreakdown {
    pub price: Money,
    pub loan_amount: Money,
    pub total_down_payment: Money,
    /// Portion of the down payment that must be cash.
    pub cash_down_payment: Money,
    /// Portion of the down payment that may come from CPF OA.
    pub cpf_eligible_down_payment: Money,
    pub bsd: Money,
    pub absd: Money,
    pub legal_fees: Money,
    pub valuation_fees: Money,
    pub total_upfront: Money,
    pub cpf_used: Money,
    pub cash_required: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordabilityOutput {
    pub max_affordable_price: Money,
    pub binding_constraint: BindingConstraint,
    pub price_cap_by_debt_ratio: Money,
    pub price_cap_by_cash: Money,
    pub max_loan: Money,
    /// Repayment at the contract rate for the loan at the resolved price.
    pub monthly_repayment: Money,
    /// Repayment at the servicing (stress) rate, used for TDSR/MSR.
    pub servicing_repayment: Money,
    pub effective_ltv: Rate,
    pub min_cash_down_payment_pct: Rate,
    pub effective_tenure_years: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenure_adjustment: Option<TenureAdjustment>,
    pub tdsr: ConstraintResult,
    /// Absent for property types MSR does not cover.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msr: Option<ConstraintResult>,
    pub ltv: ConstraintResult,
    pub cash: ConstraintResult,
    pub downpayment: DownpaymentBreakdown,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Everything about the purchase that does not depend on price.
struct PurchaseTerms<'a> {
    schedule: &'a RateSchedule,
    rule: &'a LtvRule,
    cash_share: Rate,
    residency: Residency,
    properties_owned: u32,
    legal_fees: Money,
    valuation_fees: Money,
    cash_savings: Money,
    cpf_oa_balance: Money,
}

impl PurchaseTerms<'_> {
    fn breakdown(&self, price: Money) -> PropertyFinanceResult<DownpaymentBreakdown> {
        if price <= Decimal::ZERO {
            return Ok(DownpaymentBreakdown::default());
        }
        let loan_amount = price * self.rule.max_ltv;
        let total_down_payment = price - loan_amount;
        let cash_down_payment = price * self.cash_share;
        let cpf_eligible_down_payment = total_down_payment - cash_down_payment;
        let bsd = compute_bsd(price, self.schedule)?;
        let absd = compute_absd(price, self.residency, self.properties_owned, false, self.schedule)?
            .amount;

        let cash_only = cash_down_payment + self.valuation_fees;
        let cpf_eligible = cpf_eligible_down_payment + bsd + absd + self.legal_fees;
        let cpf_used = cpf_eligible.min(self.cpf_oa_balance);

        Ok(DownpaymentBreakdown {
            price,
            loan_amount,
            total_down_payment,
            cash_down_payment,
            cpf_eligible_down_payment,
            bsd,
            absd,
            legal_fees: self.legal_fees,
            valuation_fees: self.valuation_fees,
            total_upfront: cash_only + cpf_eligible,
            cpf_used,
            cash_required: cash_only + cpf_eligible - cpf_used,
        })
    }

    /// Highest price whose cash-only share fits in cash on hand. Linear, so closed form.
    fn cap_by_cash_only(&self, upper: Money) -> Money {
        let available = self.cash_savings - self.valuation_fees;
        if available < Decimal::ZERO {
            return Decimal::ZERO;
        }
        if self.cash_share.is_zero() {
            return upper;
        }
        (available / self.cash_share).min(upper)
    }

    /// Highest price whose full upfront bill fits in cash plus CPF OA.
    fn cap_by_total_funds(&self, upper: Money) -> PropertyFinanceResult<Money> {
        let funds = self.cash_savings + self.cpf_oa_balance;
        let fits = |price: Money| -> PropertyFinanceResult<bool> {
            Ok(self.breakdown(price)?.total_upfront <= funds)
        };
        if funds < self.legal_fees + self.valuation_fees {
            return Ok(Decimal::ZERO);
        }
        bisect_max(Decimal::ZERO, upper, fits)
    }
}

/// Largest x in [lo, hi] with `feasible(x)`, assuming feasibility is monotone
/// decreasing in x and `feasible(lo)` holds.
fn bisect_max<F>(mut lo: Money, mut hi: Money, feasible: F) -> PropertyFinanceResult<Money>
where
    F: Fn(Money) -> PropertyFinanceResult<bool>,
{
    if feasible(hi)? {
        return Ok(hi);
    }
    for iter in 0..BISECTION_MAX_ITER {
        if hi - lo < BISECTION_TOL {
            log::debug!("bisection converged after {iter} iterations at {lo}");
            return Ok(lo);
        }
        let mid = (lo + hi) / Decimal::TWO;
        if feasible(mid)? {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Err(PropertyFinanceError::ConvergenceFailure {
        function: "bisect_max".into(),
        iterations: BISECTION_MAX_ITER,
        last_delta: hi - lo,
    })
}

fn floor_cents(value: Money) -> Money {
    value.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// The lower of the two caps wins; on a tie the cash side binds. A zero-income
/// debt side short-circuits to a zero price.
fn select_binding(
    debt_cap: Money,
    debt_label: BindingConstraint,
    cash_cap: Money,
    cash_label: BindingConstraint,
) -> (Money, BindingConstraint) {
    if debt_label == BindingConstraint::Income {
        (Decimal::ZERO, BindingConstraint::Income)
    } else if cash_cap <= debt_cap {
        (cash_cap, cash_label)
    } else {
        (debt_cap, debt_label)
    }
}

/// Effective tenure after the loan-age and product caps.
fn resolve_tenure(
    input: &AffordabilityInput,
    schedule: &RateSchedule,
) -> PropertyFinanceResult<(u32, Option<TenureAdjustment>)> {
    let loan_age = input.profile.loan_age();
    let max_loan_age = schedule.loan_limits.max_loan_age;
    if loan_age >= max_loan_age {
        return Err(PropertyFinanceError::invalid(
            "age",
            format!("loan age {loan_age} leaves no tenure before age {max_loan_age}"),
        ));
    }
    let by_age = max_loan_age - loan_age;
    let by_product = schedule.max_tenure_years(input.property_type)?;
    let effective = input.tenure_years.min(by_age).min(by_product);

    let adjustment = if effective < input.tenure_years {
        let reason = if effective == by_age {
            format!("loan must be repaid by age {max_loan_age}")
        } else {
            format!("maximum tenure for {:?} is {by_product} years", input.property_type)
        };
        Some(TenureAdjustment {
            requested_years: input.tenure_years,
            effective_years: effective,
            loan_age,
            reason,
        })
    } else {
        None
    };
    Ok((effective, adjustment))
}

fn validate_input(input: &AffordabilityInput) -> PropertyFinanceResult<()> {
    input.profile.validate()?;
    validate_rate_and_term("annual_rate", input.annual_rate, "tenure_years", input.tenure_years)?;
    if let Some(h) = input.profile.variable_income_haircut {
        if h < Decimal::ZERO || h > Decimal::ONE {
            return Err(PropertyFinanceError::invalid(
                "variable_income_haircut",
                "must be within [0, 1]",
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Resolve the maximum affordable price and the constraint that binds it.
pub fn resolve_affordability(
    input: &AffordabilityInput,
    schedule: &RateSchedule,
) -> PropertyFinanceResult<ComputationOutput<AffordabilityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;
    let profile = &input.profile;
    let incomes = profile.incomes();

    let (tenure_years, tenure_adjustment) = resolve_tenure(input, schedule)?;
    if let Some(adj) = &tenure_adjustment {
        warnings.push(format!(
            "Tenure reduced from {} to {} years: {}",
            adj.requested_years, adj.effective_years, adj.reason
        ));
    }
    let months = tenure_years * 12;

    let rule = schedule.ltv_rule(input.property_type, profile.existing_housing_loans)?;
    let absd_lookup = schedule.absd_rate(profile.residency, profile.properties_owned, false)?;
    if absd_lookup.clamped {
        let msg = format!(
            "{} properties owned exceeds the ABSD table; rate for {} applied",
            profile.properties_owned, absd_lookup.property_count_used
        );
        log::warn!("{msg}");
        warnings.push(msg);
    }

    let terms = PurchaseTerms {
        schedule,
        rule,
        cash_share: rule.min_cash_down_payment.max(schedule.misc_costs.option_fee),
        residency: profile.residency,
        properties_owned: profile.properties_owned,
        legal_fees: schedule.misc_costs.legal_fees.midpoint(),
        valuation_fees: schedule.misc_costs.valuation_fees.midpoint(),
        cash_savings: profile.cash_savings,
        cpf_oa_balance: profile.cpf_oa_balance,
    };

    let haircut = profile
        .variable_income_haircut
        .unwrap_or(schedule.variable_income_haircut);
    let servicing_income = effective_income(&incomes, haircut);
    let msr_applies = input.property_type.msr_applies();

    // -- Degenerate: no income ------------------------------------------------
    let (debt_cap, debt_label, cash_cap, cash_label) = if servicing_income <= Decimal::ZERO {
        warnings.push("No servicing income; maximum affordable price is zero".into());
        log::warn!("affordability resolved against zero income");
        (
            Decimal::ZERO,
            BindingConstraint::Income,
            Decimal::ZERO,
            BindingConstraint::Income,
        )
    } else {
        // -- Debt-ratio cap (closed form) -------------------------------------
        let servicing_rate = monthly_rate(schedule.servicing_rate(input.annual_rate));
        let tdsr_payment =
            (servicing_income * schedule.tdsr_limit - profile.existing_monthly_debt).max(Decimal::ZERO);
        if tdsr_payment.is_zero() {
            warnings.push("Existing debts already use the full TDSR allowance".into());
        }
        let tdsr_cap = annuity_present_value(tdsr_payment, servicing_rate, months)? / rule.max_ltv;

        let (debt_cap, debt_label) = if msr_applies {
            let msr_payment = gross_income(&incomes) * schedule.msr_limit;
            let msr_cap = annuity_present_value(msr_payment, servicing_rate, months)? / rule.max_ltv;
            if msr_cap < tdsr_cap {
                (msr_cap, BindingConstraint::Msr)
            } else {
                (tdsr_cap, BindingConstraint::Tdsr)
            }
        } else {
            (tdsr_cap, BindingConstraint::Tdsr)
        };

        // -- Cash cap (bisection) ---------------------------------------------
        let upper = (profile.cash_savings + profile.cpf_oa_balance)
            / (Decimal::ONE - rule.max_ltv)
            + Decimal::ONE;
        let by_cash_only = terms.cap_by_cash_only(upper);
        let by_funds = terms.cap_by_total_funds(upper)?;
        let (cash_cap, cash_label) = if by_cash_only < by_funds {
            (by_cash_only, BindingConstraint::Ltv)
        } else {
            (by_funds, BindingConstraint::Cash)
        };

        log::debug!(
            "caps: debt={debt_cap} ({debt_label}), cash={cash_cap} ({cash_label}), cash_only={by_cash_only}, funds={by_funds}"
        );
        (floor_cents(debt_cap), debt_label, floor_cents(cash_cap), cash_label)
    };

    let (max_price, binding) = select_binding(debt_cap, debt_label, cash_cap, cash_label);

    // -- Constraint report at the resolved price ------------------------------
    let downpayment = terms.breakdown(max_price)?;
    let loan = downpayment.loan_amount;
    let monthly_repayment = if loan.is_zero() {
        Decimal::ZERO
    } else {
        annuity_payment(loan, monthly_rate(input.annual_rate), months)?
    };
    let servicing_repayment = if loan.is_zero() {
        Decimal::ZERO
    } else {
        annuity_payment(
            loan,
            monthly_rate(schedule.servicing_rate(input.annual_rate)),
            months,
        )?
    };

    let tdsr = evaluate_tdsr(
        &incomes,
        profile.existing_monthly_debt,
        servicing_repayment,
        profile.variable_income_haircut,
        schedule,
    )?
    .to_constraint(binding == BindingConstraint::Tdsr);
    let msr = evaluate_msr(&incomes, servicing_repayment, input.property_type, schedule)?
        .map(|m| m.to_constraint(binding == BindingConstraint::Msr));

    let ltv = ConstraintResult {
        ratio_actual: if max_price.is_zero() {
            Decimal::ZERO
        } else {
            loan / max_price
        },
        limit: rule.max_ltv,
        within_limit: true,
        is_binding: binding == BindingConstraint::Ltv,
    };
    let cash = ConstraintResult {
        ratio_actual: if profile.cash_savings.is_zero() {
            Decimal::ZERO
        } else {
            downpayment.cash_required / profile.cash_savings
        },
        limit: Decimal::ONE,
        within_limit: downpayment.cash_required <= profile.cash_savings,
        is_binding: binding == BindingConstraint::Cash,
    };

    log::debug!("max affordable price {max_price} bound by {binding}");

    let output = AffordabilityOutput {
        max_affordable_price: max_price,
        binding_constraint: binding,
        price_cap_by_debt_ratio: debt_cap,
        price_cap_by_cash: cash_cap,
        max_loan: loan,
        monthly_repayment: round_money(monthly_repayment),
        servicing_repayment: round_money(servicing_repayment),
        effective_ltv: rule.max_ltv,
        min_cash_down_payment_pct: terms.cash_share,
        effective_tenure_years: tenure_years,
        tenure_adjustment,
        tdsr,
        msr,
        ltv,
        cash,
        downpayment,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Affordability: closed-form TDSR/MSR loan inversion, bisection on cash sufficiency",
        &serde_json::json!({
            "annual_rate": input.annual_rate.to_string(),
            "servicing_rate": schedule.servicing_rate(input.annual_rate).to_string(),
            "variable_income_haircut": haircut.to_string(),
            "legal_fees_estimate": terms.legal_fees.to_string(),
            "valuation_fees_estimate": terms.valuation_fees.to_string(),
            "tie_break": "equal caps are attributed to the cash side",
        }),
        warnings,
        &schedule.version,
        elapsed,
        output,
    ))
}
