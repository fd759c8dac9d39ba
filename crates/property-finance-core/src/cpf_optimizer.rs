//! CPF Ordinary Account deployment: maximum CPF, full cash, or an optimized
//! split, each projected to retirement and compared on net wealth.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::{generate_schedule, AmortizationSchedule};
use crate::error::PropertyFinanceError;
use crate::schedule::RateSchedule;
use crate::time_value::{monthly_rate, overflow, MAX_ANNUAL_RATE, MAX_TERM_YEARS};
use crate::types::{with_metadata, ComputationOutput, Money, PropertyType, Rate};
use crate::PropertyFinanceResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default CPF-usage increment for the optimized scenario.
const DEFAULT_SEARCH_STEP: Decimal = dec!(10_000);

/// Upper bound on grid points; the step widens to stay within it.
const MAX_SEARCH_POINTS: u32 = 500;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpfOptimizerInput {
    pub property_price: Money,
    pub loan_amount: Money,
    pub annual_rate: Rate,
    pub tenure_years: u32,
    pub property_type: PropertyType,
    #[serde(default)]
    pub existing_housing_loans: u32,
    pub current_age: u32,
    pub retirement_age: u32,
    pub cpf_oa_balance: Money,
    pub cash_savings: Money,
    /// Ongoing monthly contribution credited to the OA.
    #[serde(default)]
    pub monthly_cpf_oa_contribution: Money,
    /// Return on cash kept invested. Defaults to the schedule's SA rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_return_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_step: Option<Money>,
}

/// The closed set of deployment strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpfScenario {
    /// Deploy all usable OA before cash; service installments from OA.
    MaximumCpf,
    /// Cash only; OA untouched.
    FullCash,
    /// Grid search over the OA split for the highest net wealth.
    Optimized,
}

impl CpfScenario {
    pub const ALL: [CpfScenario; 3] = [
        CpfScenario::MaximumCpf,
        CpfScenario::FullCash,
        CpfScenario::Optimized,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CpfScenario::MaximumCpf => "A: Maximum CPF",
            CpfScenario::FullCash => "B: Full Cash",
            CpfScenario::Optimized => "C: Optimized",
        }
    }

    fn run(self, ctx: &ScenarioContext) -> PropertyFinanceResult<ScenarioResult> {
        match self {
            CpfScenario::MaximumCpf => ctx.project(self, ctx.max_cpf_down_payment, true),
            CpfScenario::FullCash => ctx.project(self, Decimal::ZERO, false),
            CpfScenario::Optimized => ctx.optimize(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancePoint {
    pub age: u32,
    pub cpf_oa_balance: Money,
    pub cash_balance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: CpfScenario,
    pub label: String,
    pub cpf_used_for_down_payment: Money,
    pub installments_from_cpf: bool,
    pub monthly_cash_outflow: Money,
    pub monthly_cpf_installment: Money,
    pub total_interest_paid: Money,
    pub projected_cpf_oa_at_retirement: Money,
    pub projected_cash_at_retirement: Money,
    pub outstanding_loan_at_retirement: Money,
    pub net_wealth_at_retirement: Money,
    /// Cash on hand covers the cash share of the down payment.
    pub feasible: bool,
    pub balance_history: Vec<BalancePoint>,
}

/// Advantage of the recommendation over the two fixed strategies, clamped at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub net_wealth_gain_vs_max_cpf: Money,
    pub net_wealth_gain_vs_full_cash: Money,
    pub cpf_oa_preserved_vs_max_cpf: Money,
    pub monthly_cash_saved_vs_full_cash: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpfOptimizerOutput {
    pub scenarios: Vec<ScenarioResult>,
    pub recommended_scenario: CpfScenario,
    pub comparison: ScenarioComparison,
    pub down_payment: Money,
    pub max_cpf_for_down_payment: Money,
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

struct ScenarioContext {
    amortization: AmortizationSchedule,
    down_payment: Money,
    max_cpf_down_payment: Money,
    min_cpf_down_payment: Money,
    cpf_oa_balance: Money,
    cash_savings: Money,
    monthly_contribution: Money,
    oa_monthly_rate: Rate,
    cash_monthly_rate: Rate,
    current_age: u32,
    retirement_age: u32,
    step: Money,
}

impl ScenarioContext {
    /// Month-by-month projection to retirement. Interest accrues monthly and
    /// is credited at each year end, as the CPF Board does.
    fn project(
        &self,
        scenario: CpfScenario,
        cpf_down: Money,
        from_cpf: bool,
    ) -> PropertyFinanceResult<ScenarioResult> {
        let mut oa = self.cpf_oa_balance - cpf_down;
        let mut cash = self.cash_savings - (self.down_payment - cpf_down);
        let mut oa_accrued = Decimal::ZERO;
        let mut cash_accrued = Decimal::ZERO;
        let mut first_split = (Decimal::ZERO, Decimal::ZERO);

        let mut balance_history = vec![BalancePoint {
            age: self.current_age,
            cpf_oa_balance: oa,
            cash_balance: cash,
        }];

        let months = (self.retirement_age - self.current_age) * 12;
        for month in 1..=months {
            oa += self.monthly_contribution;
            let payment = self.amortization.payment_for_month(month);
            let cpf_part = if from_cpf {
                payment.min(oa.max(Decimal::ZERO))
            } else {
                Decimal::ZERO
            };
            oa -= cpf_part;
            cash -= payment - cpf_part;
            if month == 1 {
                first_split = (payment - cpf_part, cpf_part);
            }

            oa_accrued = accrue(oa_accrued, oa, self.oa_monthly_rate, "cpf_oa_balance")?;
            cash_accrued = accrue(cash_accrued, cash, self.cash_monthly_rate, "cash_return_rate")?;
            if month % 12 == 0 {
                oa = oa.checked_add(oa_accrued).ok_or_else(|| overflow("cpf_oa_balance"))?;
                cash = cash
                    .checked_add(cash_accrued)
                    .ok_or_else(|| overflow("cash_return_rate"))?;
                oa_accrued = Decimal::ZERO;
                cash_accrued = Decimal::ZERO;
                balance_history.push(BalancePoint {
                    age: self.current_age + month / 12,
                    cpf_oa_balance: oa,
                    cash_balance: cash,
                });
            }
        }

        let outstanding = self.amortization.balance_after_month(months);
        Ok(ScenarioResult {
            scenario,
            label: scenario.label().to_string(),
            cpf_used_for_down_payment: cpf_down,
            installments_from_cpf: from_cpf,
            monthly_cash_outflow: first_split.0,
            monthly_cpf_installment: first_split.1,
            total_interest_paid: self.amortization.total_interest(),
            projected_cpf_oa_at_retirement: oa,
            projected_cash_at_retirement: cash,
            outstanding_loan_at_retirement: outstanding,
            net_wealth_at_retirement: oa + cash - outstanding,
            feasible: self.cash_savings >= self.down_payment - cpf_down,
            balance_history,
        })
    }

    /// Grid over [min, max] CPF usage, endpoints included, in both installment modes.
    fn optimize(&self) -> PropertyFinanceResult<ScenarioResult> {
        let (lo, hi) = if self.min_cpf_down_payment <= self.max_cpf_down_payment {
            (self.min_cpf_down_payment, self.max_cpf_down_payment)
        } else {
            (Decimal::ZERO, self.max_cpf_down_payment)
        };

        let mut best: Option<ScenarioResult> = None;
        let mut usage = lo;
        loop {
            for from_cpf in [true, false] {
                let candidate = self.project(CpfScenario::Optimized, usage, from_cpf)?;
                if best.as_ref().map_or(true, |b| is_better(&candidate, b)) {
                    best = Some(candidate);
                }
            }
            if usage >= hi {
                break;
            }
            usage = (usage + self.step).min(hi);
        }

        // The loop body runs at least once.
        match best {
            Some(b) => Ok(b),
            None => self.project(CpfScenario::Optimized, lo, true),
        }
    }
}

/// Add one month's interest on `balance` to the running accrual.
fn accrue(accrued: Money, balance: Money, monthly: Rate, field: &str) -> PropertyFinanceResult<Money> {
    balance
        .checked_mul(monthly)
        .and_then(|interest| accrued.checked_add(interest))
        .ok_or_else(|| overflow(field))
}

/// Higher net wealth wins; ties go to the lower monthly cash outflow.
fn is_better(candidate: &ScenarioResult, incumbent: &ScenarioResult) -> bool {
    candidate.net_wealth_at_retirement > incumbent.net_wealth_at_retirement
        || (candidate.net_wealth_at_retirement == incumbent.net_wealth_at_retirement
            && candidate.monthly_cash_outflow < incumbent.monthly_cash_outflow)
}

fn validate_input(input: &CpfOptimizerInput) -> PropertyFinanceResult<()> {
    if input.retirement_age <= input.current_age {
        return Err(PropertyFinanceError::invalid(
            "retirement_age",
            "retirement_age must be greater than current_age",
        ));
    }
    if input.retirement_age - input.current_age > MAX_TERM_YEARS {
        return Err(PropertyFinanceError::invalid(
            "retirement_age",
            format!("projection horizon cannot exceed {MAX_TERM_YEARS} years"),
        ));
    }
    if input
        .cash_return_rate
        .is_some_and(|r| r < Decimal::ZERO || r > MAX_ANNUAL_RATE)
    {
        return Err(PropertyFinanceError::invalid(
            "cash_return_rate",
            format!("must be within [0, {MAX_ANNUAL_RATE}]"),
        ));
    }
    if input.property_price < Decimal::ZERO {
        return Err(PropertyFinanceError::invalid("property_price", "cannot be negative"));
    }
    if input.loan_amount < Decimal::ZERO {
        return Err(PropertyFinanceError::invalid("loan_amount", "cannot be negative"));
    }
    if input.loan_amount > input.property_price {
        return Err(PropertyFinanceError::invalid(
            "loan_amount",
            "loan cannot exceed the property price",
        ));
    }
    if input.cpf_oa_balance < Decimal::ZERO
        || input.cash_savings < Decimal::ZERO
        || input.monthly_cpf_oa_contribution < Decimal::ZERO
    {
        return Err(PropertyFinanceError::invalid(
            "balances",
            "balances and contributions cannot be negative",
        ));
    }
    if let Some(step) = input.search_step {
        if step <= Decimal::ZERO {
            return Err(PropertyFinanceError::invalid("search_step", "must be positive"));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Compare CPF deployment strategies for one purchase and recommend the best.
pub fn optimize_cpf_usage(
    input: &CpfOptimizerInput,
    schedule: &RateSchedule,
) -> PropertyFinanceResult<ComputationOutput<CpfOptimizerOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let amortization = generate_schedule(input.loan_amount, input.annual_rate, input.tenure_years)?;
    let rule = schedule.ltv_rule(input.property_type, input.existing_housing_loans)?;
    let cash_share = rule.min_cash_down_payment.max(schedule.misc_costs.option_fee);

    let down_payment = input.property_price - input.loan_amount;
    let cpf_eligible = (down_payment - input.property_price * cash_share).max(Decimal::ZERO);
    let max_cpf_down_payment = cpf_eligible.min(input.cpf_oa_balance);
    let min_cpf_down_payment = (down_payment - input.cash_savings).max(Decimal::ZERO);

    let range = max_cpf_down_payment - min_cpf_down_payment;
    let mut step = input.search_step.unwrap_or(DEFAULT_SEARCH_STEP);
    if range > step * Decimal::from(MAX_SEARCH_POINTS) {
        step = range / Decimal::from(MAX_SEARCH_POINTS);
    }

    let cash_return = input
        .cash_return_rate
        .unwrap_or(schedule.cpf_rates.sa_interest_rate);

    let ctx = ScenarioContext {
        amortization,
        down_payment,
        max_cpf_down_payment,
        min_cpf_down_payment,
        cpf_oa_balance: input.cpf_oa_balance,
        cash_savings: input.cash_savings,
        monthly_contribution: input.monthly_cpf_oa_contribution,
        oa_monthly_rate: monthly_rate(schedule.cpf_rates.oa_interest_rate),
        cash_monthly_rate: monthly_rate(cash_return),
        current_age: input.current_age,
        retirement_age: input.retirement_age,
        step,
    };

    let scenarios = CpfScenario::ALL
        .iter()
        .map(|s| s.run(&ctx))
        .collect::<PropertyFinanceResult<Vec<ScenarioResult>>>()?;

    for s in scenarios.iter().filter(|s| !s.feasible) {
        warnings.push(format!(
            "{}: cash savings do not cover the cash share of the down payment",
            s.label
        ));
    }
    if min_cpf_down_payment > max_cpf_down_payment {
        warnings.push("No CPF split makes the down payment affordable with current cash".into());
    }

    let mut recommended = &scenarios[0];
    for candidate in &scenarios[1..] {
        if is_better(candidate, recommended) {
            recommended = candidate;
        }
    }
    let max_cpf = &scenarios[0];
    let full_cash = &scenarios[1];

    let comparison = ScenarioComparison {
        net_wealth_gain_vs_max_cpf: (recommended.net_wealth_at_retirement
            - max_cpf.net_wealth_at_retirement)
            .max(Decimal::ZERO),
        net_wealth_gain_vs_full_cash: (recommended.net_wealth_at_retirement
            - full_cash.net_wealth_at_retirement)
            .max(Decimal::ZERO),
        cpf_oa_preserved_vs_max_cpf: (recommended.projected_cpf_oa_at_retirement
            - max_cpf.projected_cpf_oa_at_retirement)
            .max(Decimal::ZERO),
        monthly_cash_saved_vs_full_cash: (full_cash.monthly_cash_outflow
            - recommended.monthly_cash_outflow)
            .max(Decimal::ZERO),
    };

    log::debug!(
        "CPF optimizer recommends {} (net wealth {})",
        recommended.label,
        recommended.net_wealth_at_retirement
    );

    let output = CpfOptimizerOutput {
        recommended_scenario: recommended.scenario,
        comparison,
        down_payment,
        max_cpf_for_down_payment: max_cpf_down_payment,
        scenarios,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "CPF deployment comparison (monthly accrual, annual crediting, grid search)",
        &serde_json::json!({
            "oa_interest_rate": schedule.cpf_rates.oa_interest_rate.to_string(),
            "cash_return_rate": cash_return.to_string(),
            "search_step": step.to_string(),
            "min_cash_share": cash_share.to_string(),
        }),
        warnings,
        &schedule.version,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::reference;
    use rust_decimal_macros::dec;

    fn default_input() -> CpfOptimizerInput {
        CpfOptimizerInput {
            property_price: dec!(600_000),
            loan_amount: dec!(450_000),
            annual_rate: dec!(0.03),
            tenure_years: 25,
            property_type: PropertyType::Hdb,
            existing_housing_loans: 0,
            current_age: 35,
            retirement_age: 65,
            cpf_oa_balance: dec!(120_000),
            cash_savings: dec!(200_000),
            monthly_cpf_oa_contribution: dec!(1_500),
            cash_return_rate: None,
            search_step: None,
        }
    }

    fn by_kind(out: &CpfOptimizerOutput, kind: CpfScenario) -> &ScenarioResult {
        out.scenarios.iter().find(|s| s.scenario == kind).unwrap()
    }

    #[test]
    fn test_three_scenarios_in_order() {
        let s = reference::singapore_2024();
        let out = optimize_cpf_usage(&default_input(), &s).unwrap().result;
        let kinds: Vec<CpfScenario> = out.scenarios.iter().map(|s| s.scenario).collect();
        assert_eq!(kinds, CpfScenario::ALL.to_vec());
    }

    #[test]
    fn test_full_cash_preserves_more_oa() {
        let s = reference::singapore_2024();
        let out = optimize_cpf_usage(&default_input(), &s).unwrap().result;
        let a = by_kind(&out, CpfScenario::MaximumCpf);
        let b = by_kind(&out, CpfScenario::FullCash);
        assert!(b.projected_cpf_oa_at_retirement >= a.projected_cpf_oa_at_retirement);
        assert_eq!(b.monthly_cpf_installment, Decimal::ZERO);
        assert_eq!(b.cpf_used_for_down_payment, Decimal::ZERO);
    }

    #[test]
    fn test_recommended_dominates_fixed_strategies() {
        let s = reference::singapore_2024();
        for rate in [dec!(0.01), dec!(0.04), dec!(0.08)] {
            let mut input = default_input();
            input.cash_return_rate = Some(rate);
            let out = optimize_cpf_usage(&input, &s).unwrap().result;
            let rec = by_kind(&out, out.recommended_scenario);
            for other in &out.scenarios {
                assert!(rec.net_wealth_at_retirement >= other.net_wealth_at_retirement);
            }
            assert!(out.comparison.net_wealth_gain_vs_max_cpf >= Decimal::ZERO);
            assert!(out.comparison.net_wealth_gain_vs_full_cash >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_zero_oa_collapses_max_cpf_to_full_cash() {
        let s = reference::singapore_2024();
        let mut input = default_input();
        input.cpf_oa_balance = Decimal::ZERO;
        input.monthly_cpf_oa_contribution = Decimal::ZERO;
        let out = optimize_cpf_usage(&input, &s).unwrap().result;
        let a = by_kind(&out, CpfScenario::MaximumCpf);
        let b = by_kind(&out, CpfScenario::FullCash);
        assert_eq!(a.monthly_cash_outflow, b.monthly_cash_outflow);
        assert_eq!(a.monthly_cpf_installment, b.monthly_cpf_installment);
        assert_eq!(a.projected_cpf_oa_at_retirement, b.projected_cpf_oa_at_retirement);
        assert_eq!(a.net_wealth_at_retirement, b.net_wealth_at_retirement);
        assert_eq!(a.balance_history, b.balance_history);
    }

    #[test]
    fn test_high_cash_return_favours_cpf() {
        let s = reference::singapore_2024();
        let mut input = default_input();
        input.cash_return_rate = Some(dec!(0.08));
        let out = optimize_cpf_usage(&input, &s).unwrap().result;
        let a = by_kind(&out, CpfScenario::MaximumCpf);
        let b = by_kind(&out, CpfScenario::FullCash);
        assert!(a.net_wealth_at_retirement > b.net_wealth_at_retirement);
    }

    #[test]
    fn test_low_cash_return_favours_cash() {
        let s = reference::singapore_2024();
        let mut input = default_input();
        input.cash_return_rate = Some(Decimal::ZERO);
        let out = optimize_cpf_usage(&input, &s).unwrap().result;
        let a = by_kind(&out, CpfScenario::MaximumCpf);
        let b = by_kind(&out, CpfScenario::FullCash);
        assert!(b.net_wealth_at_retirement > a.net_wealth_at_retirement);
    }

    #[test]
    fn test_balance_history_covers_each_age() {
        let s = reference::singapore_2024();
        let out = optimize_cpf_usage(&default_input(), &s).unwrap().result;
        let b = by_kind(&out, CpfScenario::FullCash);
        assert_eq!(b.balance_history.len(), 31);
        assert_eq!(b.balance_history[0].age, 35);
        assert_eq!(b.balance_history[30].age, 65);
        assert_eq!(
            b.balance_history[30].cpf_oa_balance,
            b.projected_cpf_oa_at_retirement
        );
    }

    #[test]
    fn test_max_cpf_respects_cash_share() {
        let s = reference::singapore_2024();
        let out = optimize_cpf_usage(&default_input(), &s).unwrap().result;
        // 150k down, 5% of 600k must be cash
        assert_eq!(out.max_cpf_for_down_payment, dec!(120_000));
        let mut input = default_input();
        input.cpf_oa_balance = dec!(500_000);
        let out = optimize_cpf_usage(&input, &s).unwrap().result;
        assert_eq!(out.max_cpf_for_down_payment, dec!(120_000));
    }

    #[test]
    fn test_infeasible_full_cash_warns() {
        let s = reference::singapore_2024();
        let mut input = default_input();
        input.cash_savings = dec!(50_000);
        let out = optimize_cpf_usage(&input, &s).unwrap();
        let b = by_kind(&out.result, CpfScenario::FullCash);
        assert!(!b.feasible);
        assert!(out.warnings.iter().any(|w| w.starts_with("B:")));
        let c = by_kind(&out.result, CpfScenario::Optimized);
        assert!(c.feasible);
    }

    #[test]
    fn test_invalid_ages_rejected() {
        let s = reference::singapore_2024();
        let mut input = default_input();
        input.retirement_age = 35;
        assert!(matches!(
            optimize_cpf_usage(&input, &s),
            Err(PropertyFinanceError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_loan_above_price_rejected() {
        let s = reference::singapore_2024();
        let mut input = default_input();
        input.loan_amount = dec!(700_000);
        assert!(optimize_cpf_usage(&input, &s).is_err());
    }

    #[test]
    fn test_outstanding_loan_when_retiring_early() {
        let s = reference::singapore_2024();
        let mut input = default_input();
        input.retirement_age = 45;
        let out = optimize_cpf_usage(&input, &s).unwrap().result;
        let a = by_kind(&out, CpfScenario::MaximumCpf);
        assert!(a.outstanding_loan_at_retirement > Decimal::ZERO);
        assert_eq!(
            a.net_wealth_at_retirement,
            a.projected_cpf_oa_at_retirement + a.projected_cash_at_retirement
                - a.outstanding_loan_at_retirement
        );
    }

    #[test]
    fn test_out_of_range_horizon_and_returns_rejected() {
        let s = reference::singapore_2024();
        let mut input = default_input();
        input.retirement_age = input.current_age + MAX_TERM_YEARS + 1;
        assert!(matches!(
            optimize_cpf_usage(&input, &s),
            Err(PropertyFinanceError::InvalidInput { .. })
        ));

        let mut input = default_input();
        input.cash_return_rate = Some(dec!(1.5));
        assert!(optimize_cpf_usage(&input, &s).is_err());

        let mut input = default_input();
        input.annual_rate = dec!(2.0);
        input.tenure_years = 35;
        assert!(matches!(
            optimize_cpf_usage(&input, &s),
            Err(PropertyFinanceError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_accrual_overflow_is_error() {
        assert!(accrue(Decimal::ZERO, Decimal::MAX, dec!(2), "cash_return_rate").is_err());
        assert_eq!(
            accrue(dec!(10), dec!(1_200), dec!(0.01), "cash_return_rate").unwrap(),
            dec!(22)
        );
    }
}
