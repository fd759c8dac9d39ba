//! Reference schedule reflecting the Singapore rates in force from 2024.
//!
//! Callers normally load their own versioned schedule; this one backs the
//! test-suite and the CLI default.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{
    AbsdRate, CostRange, CpfRates, LoanLimits, LtvRule, MiscCosts, PropertyTaxSchedule,
    RateSchedule, RegulatoryRateSchedule, SsdSchedule, SsdTier, TenureCap,
};
use crate::brackets::BracketTier;
use crate::types::{PropertyType, Residency};

fn ltv_rows(property_type: PropertyType) -> Vec<LtvRule> {
    [
        (0, dec!(0.75), dec!(0.05)),
        (1, dec!(0.45), dec!(0.25)),
        (2, dec!(0.35), dec!(0.25)),
    ]
    .into_iter()
    .map(|(existing_loans, max_ltv, min_cash_down_payment)| LtvRule {
        property_type,
        existing_loans,
        max_ltv,
        min_cash_down_payment,
    })
    .collect()
}

fn absd_rows(residency: Residency, rates: [Decimal; 3]) -> Vec<AbsdRate> {
    rates
        .into_iter()
        .enumerate()
        .map(|(count, rate)| AbsdRate {
            residency,
            property_count: count as u32,
            rate,
        })
        .collect()
}

pub fn singapore_2024_raw() -> RegulatoryRateSchedule {
    let mut absd_rates = absd_rows(Residency::Citizen, [dec!(0), dec!(0.20), dec!(0.30)]);
    absd_rates.extend(absd_rows(
        Residency::PermanentResident,
        [dec!(0.05), dec!(0.30), dec!(0.35)],
    ));
    absd_rates.extend(absd_rows(
        Residency::Foreigner,
        [dec!(0.60), dec!(0.60), dec!(0.60)],
    ));

    let mut ltv_rules = Vec::new();
    for property_type in [
        PropertyType::Hdb,
        PropertyType::Ec,
        PropertyType::Condo,
        PropertyType::Landed,
    ] {
        ltv_rules.extend(ltv_rows(property_type));
    }

    RegulatoryRateSchedule {
        version: "SG-2024.1".to_string(),
        effective_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        bsd_tiers: vec![
            BracketTier::bounded(dec!(180_000), dec!(0.01)),
            BracketTier::bounded(dec!(360_000), dec!(0.02)),
            BracketTier::bounded(dec!(1_000_000), dec!(0.03)),
            BracketTier::bounded(dec!(1_500_000), dec!(0.04)),
            BracketTier::bounded(dec!(3_000_000), dec!(0.05)),
            BracketTier::unbounded(dec!(0.06)),
        ],
        absd_rates,
        absd_entity_rate: dec!(0.65),
        ssd: SsdSchedule {
            tiers: vec![
                SsdTier {
                    max_holding_months: 12,
                    rate: dec!(0.12),
                },
                SsdTier {
                    max_holding_months: 24,
                    rate: dec!(0.08),
                },
                SsdTier {
                    max_holding_months: 36,
                    rate: dec!(0.04),
                },
            ],
            exemption_threshold_months: 36,
        },
        tdsr_limit: dec!(0.55),
        msr_limit: dec!(0.30),
        stress_test_rate: Some(dec!(0.04)),
        variable_income_haircut: dec!(0.30),
        ltv_rules,
        loan_limits: LoanLimits {
            max_loan_age: 65,
            max_tenure_years: vec![
                TenureCap {
                    property_type: PropertyType::Hdb,
                    years: 25,
                },
                TenureCap {
                    property_type: PropertyType::Ec,
                    years: 30,
                },
                TenureCap {
                    property_type: PropertyType::Condo,
                    years: 30,
                },
                TenureCap {
                    property_type: PropertyType::Landed,
                    years: 30,
                },
            ],
        },
        property_tax: PropertyTaxSchedule {
            owner_occupied: vec![
                BracketTier::bounded(dec!(8_000), dec!(0)),
                BracketTier::bounded(dec!(30_000), dec!(0.04)),
                BracketTier::bounded(dec!(40_000), dec!(0.06)),
                BracketTier::bounded(dec!(55_000), dec!(0.10)),
                BracketTier::bounded(dec!(70_000), dec!(0.14)),
                BracketTier::bounded(dec!(85_000), dec!(0.20)),
                BracketTier::bounded(dec!(100_000), dec!(0.26)),
                BracketTier::unbounded(dec!(0.32)),
            ],
            non_owner_occupied: vec![
                BracketTier::bounded(dec!(30_000), dec!(0.12)),
                BracketTier::bounded(dec!(45_000), dec!(0.20)),
                BracketTier::bounded(dec!(60_000), dec!(0.28)),
                BracketTier::unbounded(dec!(0.36)),
            ],
            annual_value_proxy: dec!(0.035),
        },
        cpf_rates: CpfRates {
            oa_interest_rate: dec!(0.025),
            sa_interest_rate: dec!(0.04),
        },
        misc_costs: MiscCosts {
            legal_fees: CostRange {
                min: dec!(2_500),
                max: dec!(3_500),
            },
            valuation_fees: CostRange {
                min: dec!(200),
                max: dec!(1_000),
            },
            condo_maintenance_monthly: CostRange {
                min: dec!(300),
                max: dec!(500),
            },
            home_insurance_annual: CostRange {
                min: dec!(200),
                max: dec!(600),
            },
            option_fee: dec!(0.01),
        },
    }
}

/// The reference schedule, already validated.
pub fn singapore_2024() -> RateSchedule {
    RateSchedule {
        raw: singapore_2024_raw(),
    }
}
