use property_finance_core::affordability::{
    resolve_affordability, AffordabilityInput, Applicant, BindingConstraint, FinancialProfile,
};
use property_finance_core::amortization::generate_schedule;
use property_finance_core::brackets::{evaluate_total, BracketTier};
use property_finance_core::cpf_optimizer::{optimize_cpf_usage, CpfOptimizerInput, CpfScenario};
use property_finance_core::debt_servicing::{evaluate_tdsr, ApplicantIncome};
use property_finance_core::ownership::{project_total_cost, TcoInput};
use property_finance_core::schedule::reference;
use property_finance_core::{PropertyType, PropertyUsage, Residency};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Worked examples
// ===========================================================================

#[test]
fn test_bsd_on_one_and_a_half_million() {
    // 180k@1%, next 180k@2%, next 240k@3%, next 400k@4%, next 400k@5%, rest 6%
    let tiers = vec![
        BracketTier::bounded(dec!(180_000), dec!(0.01)),
        BracketTier::bounded(dec!(360_000), dec!(0.02)),
        BracketTier::bounded(dec!(600_000), dec!(0.03)),
        BracketTier::bounded(dec!(1_000_000), dec!(0.04)),
        BracketTier::bounded(dec!(1_400_000), dec!(0.05)),
        BracketTier::unbounded(dec!(0.06)),
    ];
    // 1800 + 3600 + 7200 + 16000 + 20000 + 6000
    assert_eq!(evaluate_total(&tiers, dec!(1_500_000)).unwrap(), dec!(54_600));
}

#[test]
fn test_tdsr_with_variable_income_haircut() {
    let s = reference::singapore_2024();
    let applicants = [ApplicantIncome {
        fixed_monthly: dec!(8_000),
        variable_monthly: dec!(2_000),
    }];
    let r = evaluate_tdsr(&applicants, dec!(500), dec!(3_000), Some(dec!(0.30)), &s).unwrap();
    assert_eq!(r.income, dec!(9_400));
    assert!((r.ratio - dec!(0.372)).abs() < dec!(0.001), "ratio = {}", r.ratio);
    assert!(r.within_limit);
}

#[test]
fn test_amortization_reference_payment() {
    let sched = generate_schedule(dec!(500_000), dec!(0.035), 25).unwrap();
    assert!((sched.monthly_payment() - dec!(2_503)).abs() <= dec!(1));
    assert_eq!(sched.total_interest(), sched.total_payment() - dec!(500_000));
}

fn affordability_input() -> AffordabilityInput {
    AffordabilityInput {
        profile: FinancialProfile {
            applicants: vec![Applicant {
                income: ApplicantIncome {
                    fixed_monthly: dec!(10_000),
                    variable_monthly: Decimal::ZERO,
                },
                age: 35,
            }],
            existing_monthly_debt: Decimal::ZERO,
            cash_savings: dec!(300_000),
            cpf_oa_balance: Decimal::ZERO,
            residency: Residency::Citizen,
            properties_owned: 0,
            existing_housing_loans: 0,
            variable_income_haircut: None,
        },
        property_type: PropertyType::Hdb,
        annual_rate: dec!(0.035),
        tenure_years: 25,
    }
}

#[test]
fn test_hdb_affordability_single_binding_constraint() {
    let s = reference::singapore_2024();
    let out = resolve_affordability(&affordability_input(), &s).unwrap().result;
    assert_eq!(out.effective_ltv, dec!(0.75));

    let flags = [
        out.tdsr.is_binding,
        out.msr.as_ref().map_or(false, |m| m.is_binding),
        out.ltv.is_binding,
        out.cash.is_binding,
    ];
    assert_eq!(flags.iter().filter(|b| **b).count(), 1);
    assert!(matches!(
        out.binding_constraint,
        BindingConstraint::Tdsr | BindingConstraint::Msr | BindingConstraint::Ltv | BindingConstraint::Cash
    ));
    assert!(out.max_affordable_price > Decimal::ZERO);
}

fn cpf_input() -> CpfOptimizerInput {
    CpfOptimizerInput {
        property_price: dec!(800_000),
        loan_amount: dec!(600_000),
        annual_rate: dec!(0.035),
        tenure_years: 25,
        property_type: PropertyType::Condo,
        existing_housing_loans: 0,
        current_age: 40,
        retirement_age: 65,
        cpf_oa_balance: Decimal::ZERO,
        cash_savings: dec!(250_000),
        monthly_cpf_oa_contribution: Decimal::ZERO,
        cash_return_rate: None,
        search_step: None,
    }
}

#[test]
fn test_cpf_optimizer_zero_oa_collapses() {
    let s = reference::singapore_2024();
    let out = optimize_cpf_usage(&cpf_input(), &s).unwrap().result;
    let a = &out.scenarios[0];
    let b = &out.scenarios[1];
    assert_eq!(a.scenario, CpfScenario::MaximumCpf);
    assert_eq!(b.scenario, CpfScenario::FullCash);
    assert_eq!(a.net_wealth_at_retirement, b.net_wealth_at_retirement);
    assert_eq!(a.projected_cpf_oa_at_retirement, b.projected_cpf_oa_at_retirement);
    assert_eq!(a.monthly_cash_outflow, b.monthly_cash_outflow);
    assert_eq!(out.comparison.net_wealth_gain_vs_max_cpf, Decimal::ZERO);
}

// ===========================================================================
// Monotonicity
// ===========================================================================

#[test]
fn test_affordability_increases_with_income() {
    let s = reference::singapore_2024();
    let mut prev = Decimal::ZERO;
    for income in [dec!(2_000), dec!(5_000), dec!(8_000), dec!(12_000), dec!(20_000)] {
        let mut input = affordability_input();
        input.profile.applicants[0].income.fixed_monthly = income;
        let price = resolve_affordability(&input, &s).unwrap().result.max_affordable_price;
        assert!(price >= prev, "income {income}: {price} < {prev}");
        prev = price;
    }
}

#[test]
fn test_affordability_increases_with_savings() {
    let s = reference::singapore_2024();
    let mut prev = Decimal::ZERO;
    for cash in [dec!(0), dec!(20_000), dec!(60_000), dec!(150_000), dec!(400_000)] {
        let mut input = affordability_input();
        input.property_type = PropertyType::Condo;
        input.profile.cash_savings = cash;
        let price = resolve_affordability(&input, &s).unwrap().result.max_affordable_price;
        assert!(price >= prev, "cash {cash}: {price} < {prev}");
        prev = price;
    }
}

#[test]
fn test_affordability_decreases_with_debt() {
    let s = reference::singapore_2024();
    let mut prev: Option<Decimal> = None;
    for debt in [dec!(0), dec!(500), dec!(1_500), dec!(3_000), dec!(6_000)] {
        let mut input = affordability_input();
        input.property_type = PropertyType::Condo;
        input.profile.cash_savings = dec!(1_000_000);
        input.profile.existing_monthly_debt = debt;
        let price = resolve_affordability(&input, &s).unwrap().result.max_affordable_price;
        if let Some(p) = prev {
            assert!(price <= p, "debt {debt}: {price} > {p}");
        }
        prev = Some(price);
    }
}

#[test]
fn test_affordability_decreases_with_rate() {
    let s = reference::singapore_2024();
    let mut prev: Option<Decimal> = None;
    for rate in [dec!(0.01), dec!(0.03), dec!(0.045), dec!(0.06), dec!(0.08)] {
        let mut input = affordability_input();
        input.property_type = PropertyType::Condo;
        input.profile.cash_savings = dec!(1_000_000);
        input.annual_rate = rate;
        let price = resolve_affordability(&input, &s).unwrap().result.max_affordable_price;
        if let Some(p) = prev {
            assert!(price <= p, "rate {rate}: {price} > {p}");
        }
        prev = Some(price);
    }
}

#[test]
fn test_tco_grand_total_non_decreasing() {
    let s = reference::singapore_2024();
    let mut prev = Decimal::ZERO;
    for years in 1..=30 {
        let input = TcoInput {
            purchase_price: dec!(1_200_000),
            property_type: PropertyType::Condo,
            usage: PropertyUsage::Investment,
            residency: Residency::PermanentResident,
            properties_owned: 1,
            is_entity: false,
            loan_amount: dec!(540_000),
            annual_rate: dec!(0.04),
            tenure_years: 20,
            holding_period_years: years,
            monthly_rent: Some(dec!(4_000)),
        };
        let total = project_total_cost(&input, &s).unwrap().result.grand_total_cost;
        assert!(total >= prev);
        prev = total;
    }
}

#[test]
fn test_no_degenerate_outputs_at_zero() {
    let s = reference::singapore_2024();
    let mut input = affordability_input();
    input.profile.applicants[0].income.fixed_monthly = Decimal::ZERO;
    input.profile.cash_savings = Decimal::ZERO;
    let out = resolve_affordability(&input, &s).unwrap().result;
    assert_eq!(out.max_affordable_price, Decimal::ZERO);
    assert_eq!(out.binding_constraint, BindingConstraint::Income);

    let zero_rate = generate_schedule(dec!(240_000), Decimal::ZERO, 20).unwrap();
    assert_eq!(zero_rate.monthly_payment(), dec!(1_000));
}
