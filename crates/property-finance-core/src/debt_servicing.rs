//! Total Debt Servicing Ratio and Mortgage Servicing Ratio checks.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PropertyFinanceError;
use crate::schedule::RateSchedule;
use crate::types::{with_metadata, ComputationOutput, ConstraintResult, Money, PropertyType, Rate};
use crate::PropertyFinanceResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Monthly income of one applicant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantIncome {
    pub fixed_monthly: Money,
    #[serde(default)]
    pub variable_monthly: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtServicingInput {
    /// One entry for a single applicant, several for a joint application.
    pub applicants: Vec<ApplicantIncome>,
    pub existing_monthly_debt: Money,
    pub proposed_monthly_repayment: Money,
    pub property_type: PropertyType,
    /// Overrides the schedule's variable-income haircut.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_income_haircut: Option<Rate>,
}

/// A servicing ratio measured against its regulatory limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtServicingResult {
    /// Income the ratio is measured against (haircut-adjusted for TDSR).
    pub income: Money,
    pub obligations: Money,
    pub ratio: Rate,
    pub limit: Rate,
    pub within_limit: bool,
    /// Monthly obligations still allowed beyond the ones already counted
    /// before the proposed repayment. Negative when already over the limit.
    pub remaining_capacity: Money,
    /// Income was zero; the ratio is reported as zero rather than undefined.
    pub degenerate: bool,
}

impl DebtServicingResult {
    pub fn to_constraint(&self, is_binding: bool) -> ConstraintResult {
        ConstraintResult {
            ratio_actual: self.ratio,
            limit: self.limit,
            within_limit: self.within_limit,
            is_binding,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtServicingOutput {
    pub tdsr: DebtServicingResult,
    /// `None` when MSR does not apply to the property type. Not a pass.
    pub msr: Option<DebtServicingResult>,
    pub max_monthly_repayment: Money,
}

// ---------------------------------------------------------------------------
// Income helpers
// ---------------------------------------------------------------------------

fn validate_applicants(applicants: &[ApplicantIncome]) -> PropertyFinanceResult<()> {
    if applicants.is_empty() {
        return Err(PropertyFinanceError::invalid(
            "applicants",
            "at least one applicant is required",
        ));
    }
    for (i, a) in applicants.iter().enumerate() {
        if a.fixed_monthly < Decimal::ZERO || a.variable_monthly < Decimal::ZERO {
            return Err(PropertyFinanceError::invalid(
                format!("applicants[{i}]"),
                "income cannot be negative",
            ));
        }
    }
    Ok(())
}

/// Fixed income plus haircut variable income, summed across applicants.
pub fn effective_income(applicants: &[ApplicantIncome], haircut: Rate) -> Money {
    let retained = Decimal::ONE - haircut;
    applicants
        .iter()
        .map(|a| a.fixed_monthly + a.variable_monthly * retained)
        .sum()
}

/// Fixed plus variable income without haircut, summed across applicants.
pub fn gross_income(applicants: &[ApplicantIncome]) -> Money {
    applicants
        .iter()
        .map(|a| a.fixed_monthly + a.variable_monthly)
        .sum()
}

fn ratio_against(
    income: Money,
    counted_debt: Money,
    proposed: Money,
    limit: Rate,
) -> DebtServicingResult {
    let obligations = counted_debt + proposed;
    let remaining_capacity = income * limit - counted_debt;
    if income <= Decimal::ZERO {
        return DebtServicingResult {
            income: Decimal::ZERO,
            obligations,
            ratio: Decimal::ZERO,
            limit,
            within_limit: obligations.is_zero(),
            remaining_capacity,
            degenerate: true,
        };
    }
    let ratio = obligations / income;
    DebtServicingResult {
        income,
        obligations,
        ratio,
        limit,
        within_limit: ratio <= limit,
        remaining_capacity,
        degenerate: false,
    }
}

// ---------------------------------------------------------------------------
// Ratio checks
// ---------------------------------------------------------------------------

/// TDSR: (existing debts + proposed repayment) / haircut-adjusted income.
pub fn evaluate_tdsr(
    applicants: &[ApplicantIncome],
    existing_monthly_debt: Money,
    proposed_monthly_repayment: Money,
    variable_income_haircut: Option<Rate>,
    schedule: &RateSchedule,
) -> PropertyFinanceResult<DebtServicingResult> {
    validate_applicants(applicants)?;
    if existing_monthly_debt < Decimal::ZERO {
        return Err(PropertyFinanceError::invalid(
            "existing_monthly_debt",
            "cannot be negative",
        ));
    }
    if proposed_monthly_repayment < Decimal::ZERO {
        return Err(PropertyFinanceError::invalid(
            "proposed_monthly_repayment",
            "cannot be negative",
        ));
    }
    let haircut = variable_income_haircut.unwrap_or(schedule.variable_income_haircut);
    if haircut < Decimal::ZERO || haircut > Decimal::ONE {
        return Err(PropertyFinanceError::invalid(
            "variable_income_haircut",
            "must be within [0, 1]",
        ));
    }

    let income = effective_income(applicants, haircut);
    Ok(ratio_against(
        income,
        existing_monthly_debt,
        proposed_monthly_repayment,
        schedule.tdsr_limit,
    ))
}

/// MSR: proposed repayment / gross income. `None` for segments MSR does not cover.
pub fn evaluate_msr(
    applicants: &[ApplicantIncome],
    proposed_monthly_repayment: Money,
    property_type: PropertyType,
    schedule: &RateSchedule,
) -> PropertyFinanceResult<Option<DebtServicingResult>> {
    validate_applicants(applicants)?;
    if proposed_monthly_repayment < Decimal::ZERO {
        return Err(PropertyFinanceError::invalid(
            "proposed_monthly_repayment",
            "cannot be negative",
        ));
    }
    if !property_type.msr_applies() {
        return Ok(None);
    }
    Ok(Some(ratio_against(
        gross_income(applicants),
        Decimal::ZERO,
        proposed_monthly_repayment,
        schedule.msr_limit,
    )))
}

/// Run every applicable servicing check for a proposed repayment.
pub fn assess_debt_servicing(
    input: &DebtServicingInput,
    schedule: &RateSchedule,
) -> PropertyFinanceResult<ComputationOutput<DebtServicingOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let tdsr = evaluate_tdsr(
        &input.applicants,
        input.existing_monthly_debt,
        input.proposed_monthly_repayment,
        input.variable_income_haircut,
        schedule,
    )?;
    let msr = evaluate_msr(
        &input.applicants,
        input.proposed_monthly_repayment,
        input.property_type,
        schedule,
    )?;

    if tdsr.degenerate {
        warnings.push("Effective income is zero; no repayment can be serviced".into());
        log::warn!("debt servicing assessed against zero effective income");
    }

    let mut max_monthly_repayment = tdsr.remaining_capacity.max(Decimal::ZERO);
    if let Some(m) = &msr {
        max_monthly_repayment = max_monthly_repayment.min(m.remaining_capacity.max(Decimal::ZERO));
    }

    let output = DebtServicingOutput {
        tdsr,
        msr,
        max_monthly_repayment,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "TDSR / MSR servicing ratios",
        &serde_json::json!({
            "applicants": input.applicants.len(),
            "variable_income_haircut": input
                .variable_income_haircut
                .unwrap_or(schedule.variable_income_haircut)
                .to_string(),
            "property_type": input.property_type,
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

    fn single(fixed: Money, variable: Money) -> Vec<ApplicantIncome> {
        vec![ApplicantIncome {
            fixed_monthly: fixed,
            variable_monthly: variable,
        }]
    }

    #[test]
    fn test_tdsr_worked_example() {
        let s = reference::singapore_2024();
        let r = evaluate_tdsr(
            &single(dec!(8000), dec!(2000)),
            dec!(500),
            dec!(3000),
            Some(dec!(0.30)),
            &s,
        )
        .unwrap();
        assert_eq!(r.income, dec!(9400));
        assert!((r.ratio - dec!(0.372)).abs() < dec!(0.001), "ratio = {}", r.ratio);
        assert!(r.within_limit);
        // 9400 * 0.55 - 500
        assert_eq!(r.remaining_capacity, dec!(4670));
    }

    #[test]
    fn test_haircut_defaults_to_schedule() {
        let s = reference::singapore_2024();
        let r = evaluate_tdsr(&single(dec!(8000), dec!(2000)), dec!(0), dec!(0), None, &s).unwrap();
        assert_eq!(r.income, dec!(9400));
    }

    #[test]
    fn test_joint_incomes_sum() {
        let s = reference::singapore_2024();
        let applicants = vec![
            ApplicantIncome {
                fixed_monthly: dec!(5000),
                variable_monthly: dec!(0),
            },
            ApplicantIncome {
                fixed_monthly: dec!(4000),
                variable_monthly: dec!(1000),
            },
        ];
        let r = evaluate_tdsr(&applicants, dec!(0), dec!(2000), None, &s).unwrap();
        assert_eq!(r.income, dec!(9700));
    }

    #[test]
    fn test_tdsr_breach() {
        let s = reference::singapore_2024();
        let r = evaluate_tdsr(&single(dec!(5000), dec!(0)), dec!(1000), dec!(2000), None, &s).unwrap();
        assert!(!r.within_limit);
        assert_eq!(r.ratio, dec!(0.6));
    }

    #[test]
    fn test_ratio_scale_invariant() {
        let s = reference::singapore_2024();
        let base = evaluate_tdsr(&single(dec!(7000), dec!(1500)), dec!(400), dec!(2500), None, &s)
            .unwrap();
        for k in [dec!(0.5), dec!(2), dec!(3.7)] {
            let scaled = evaluate_tdsr(
                &single(dec!(7000) * k, dec!(1500) * k),
                dec!(400) * k,
                dec!(2500) * k,
                None,
                &s,
            )
            .unwrap();
            assert!((scaled.ratio - base.ratio).abs() < dec!(0.0000000001));
        }
    }

    #[test]
    fn test_zero_income_is_degenerate_not_nan() {
        let s = reference::singapore_2024();
        let r = evaluate_tdsr(&single(dec!(0), dec!(0)), dec!(0), dec!(1500), None, &s).unwrap();
        assert!(r.degenerate);
        assert_eq!(r.ratio, Decimal::ZERO);
        assert!(!r.within_limit);
    }

    #[test]
    fn test_msr_only_for_hdb_and_ec() {
        let s = reference::singapore_2024();
        let applicants = single(dec!(6000), dec!(0));
        assert!(evaluate_msr(&applicants, dec!(1500), PropertyType::Condo, &s)
            .unwrap()
            .is_none());
        let msr = evaluate_msr(&applicants, dec!(1500), PropertyType::Hdb, &s)
            .unwrap()
            .unwrap();
        assert_eq!(msr.ratio, dec!(0.25));
        assert!(msr.within_limit);
        assert_eq!(msr.remaining_capacity, dec!(1800));
    }

    #[test]
    fn test_negative_income_rejected() {
        let s = reference::singapore_2024();
        assert!(matches!(
            evaluate_tdsr(&single(dec!(-1), dec!(0)), dec!(0), dec!(0), None, &s),
            Err(PropertyFinanceError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_assess_caps_by_msr() {
        let s = reference::singapore_2024();
        let input = DebtServicingInput {
            applicants: single(dec!(10_000), dec!(0)),
            existing_monthly_debt: dec!(0),
            proposed_monthly_repayment: dec!(2000),
            property_type: PropertyType::Ec,
            variable_income_haircut: None,
        };
        let out = assess_debt_servicing(&input, &s).unwrap();
        assert_eq!(out.result.max_monthly_repayment, dec!(3000));
        assert!(out.result.msr.is_some());
    }
}
