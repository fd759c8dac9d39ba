//! Versioned regulatory rate schedule.
//!
//! The schedule is supplied by the caller, validated once by
//! [`RateSchedule::new`], and then threaded read-only through every
//! calculation. Lookups on a validated schedule cannot miss; they still
//! return `Result` so that a hand-assembled schedule never panics.

pub mod reference;

use std::ops::Deref;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::brackets::{validate_tiers, BracketTier};
use crate::error::PropertyFinanceError;
use crate::types::{Money, PropertyType, PropertyUsage, Rate, Residency};
use crate::PropertyFinanceResult;

const ALL_RESIDENCIES: [Residency; 3] = [
    Residency::Citizen,
    Residency::PermanentResident,
    Residency::Foreigner,
];

const ALL_PROPERTY_TYPES: [PropertyType; 4] = [
    PropertyType::Hdb,
    PropertyType::Ec,
    PropertyType::Condo,
    PropertyType::Landed,
];

// ---------------------------------------------------------------------------
// Schedule entries
// ---------------------------------------------------------------------------

/// ABSD rate for a residency once the buyer already owns `property_count` properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsdRate {
    pub residency: Residency,
    pub property_count: u32,
    pub rate: Rate,
}

/// SSD rate applied when the holding period is below `max_holding_months`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsdTier {
    pub max_holding_months: u32,
    pub rate: Rate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsdSchedule {
    pub tiers: Vec<SsdTier>,
    pub exemption_threshold_months: u32,
}

/// Loan-to-value limit by property type and number of outstanding housing loans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LtvRule {
    pub property_type: PropertyType,
    pub existing_loans: u32,
    pub max_ltv: Rate,
    /// Share of the price that must be paid in cash (not CPF).
    pub min_cash_down_payment: Rate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenureCap {
    pub property_type: PropertyType,
    pub years: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanLimits {
    /// Loans must be repaid by this age.
    pub max_loan_age: u32,
    pub max_tenure_years: Vec<TenureCap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyTaxSchedule {
    pub owner_occupied: Vec<BracketTier>,
    pub non_owner_occupied: Vec<BracketTier>,
    /// Annual value estimated as this share of the purchase price.
    pub annual_value_proxy: Rate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpfRates {
    pub oa_interest_rate: Rate,
    pub sa_interest_rate: Rate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRange {
    pub min: Money,
    pub max: Money,
}

impl CostRange {
    /// Flat estimate used by the calculators.
    pub fn midpoint(&self) -> Money {
        (self.min + self.max) / Decimal::TWO
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiscCosts {
    pub legal_fees: CostRange,
    pub valuation_fees: CostRange,
    pub condo_maintenance_monthly: CostRange,
    pub home_insurance_annual: CostRange,
    /// Share of the price paid in cash when the option to purchase is granted.
    pub option_fee: Rate,
}

/// Raw, deserialised schedule. Wrap in [`RateSchedule`] before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulatoryRateSchedule {
    pub version: String,
    pub effective_from: NaiveDate,
    pub bsd_tiers: Vec<BracketTier>,
    pub absd_rates: Vec<AbsdRate>,
    pub absd_entity_rate: Rate,
    pub ssd: SsdSchedule,
    pub tdsr_limit: Rate,
    pub msr_limit: Rate,
    /// Floor on the interest rate used when sizing loans against TDSR/MSR.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress_test_rate: Option<Rate>,
    pub variable_income_haircut: Rate,
    pub ltv_rules: Vec<LtvRule>,
    pub loan_limits: LoanLimits,
    pub property_tax: PropertyTaxSchedule,
    pub cpf_rates: CpfRates,
    pub misc_costs: MiscCosts,
}

// ---------------------------------------------------------------------------
// Validated schedule
// ---------------------------------------------------------------------------

/// Result of an ABSD table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsdLookup {
    pub rate: Rate,
    pub property_count_used: u32,
    /// The requested count exceeded the table and was clamped to its highest row.
    pub clamped: bool,
}

/// A schedule that has passed validation. Immutable for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RateSchedule {
    raw: RegulatoryRateSchedule,
}

impl RateSchedule {
    pub fn new(raw: RegulatoryRateSchedule) -> PropertyFinanceResult<Self> {
        validate(&raw)?;
        log::info!(
            "rate schedule {} (effective {}) validated",
            raw.version,
            raw.effective_from
        );
        Ok(RateSchedule { raw })
    }

    pub fn from_json_str(json: &str) -> PropertyFinanceResult<Self> {
        let raw: RegulatoryRateSchedule = serde_json::from_str(json)?;
        Self::new(raw)
    }

    pub fn into_inner(self) -> RegulatoryRateSchedule {
        self.raw
    }

    pub fn absd_rate(
        &self,
        residency: Residency,
        existing_properties: u32,
        is_entity: bool,
    ) -> PropertyFinanceResult<AbsdLookup> {
        if is_entity {
            return Ok(AbsdLookup {
                rate: self.raw.absd_entity_rate,
                property_count_used: existing_properties,
                clamped: false,
            });
        }

        let ceiling = self
            .raw
            .absd_rates
            .iter()
            .filter(|r| r.residency == residency)
            .map(|r| r.property_count)
            .max()
            .ok_or_else(|| {
                PropertyFinanceError::config("absd_rates", format!("no entries for {residency:?}"))
            })?;
        let count = existing_properties.min(ceiling);

        self.raw
            .absd_rates
            .iter()
            .find(|r| r.residency == residency && r.property_count == count)
            .map(|r| AbsdLookup {
                rate: r.rate,
                property_count_used: count,
                clamped: existing_properties > ceiling,
            })
            .ok_or_else(|| {
                PropertyFinanceError::config(
                    "absd_rates",
                    format!("missing {residency:?} entry for property count {count}"),
                )
            })
    }

    /// SSD rate for a sale after `holding_period_months`; zero once exempt.
    pub fn ssd_rate(&self, holding_period_months: u32) -> PropertyFinanceResult<Rate> {
        let ssd = &self.raw.ssd;
        if holding_period_months >= ssd.exemption_threshold_months {
            return Ok(Decimal::ZERO);
        }
        ssd.tiers
            .iter()
            .find(|t| holding_period_months < t.max_holding_months)
            .map(|t| t.rate)
            .ok_or_else(|| {
                PropertyFinanceError::config(
                    "ssd.tiers",
                    format!("no tier covers a holding period of {holding_period_months} months"),
                )
            })
    }

    /// LTV rule for the property type, clamping the loan count to the highest row.
    pub fn ltv_rule(
        &self,
        property_type: PropertyType,
        existing_loans: u32,
    ) -> PropertyFinanceResult<&LtvRule> {
        let ceiling = self
            .raw
            .ltv_rules
            .iter()
            .filter(|r| r.property_type == property_type)
            .map(|r| r.existing_loans)
            .max()
            .ok_or_else(|| {
                PropertyFinanceError::config("ltv_rules", format!("no entries for {property_type:?}"))
            })?;
        let count = existing_loans.min(ceiling);
        self.raw
            .ltv_rules
            .iter()
            .find(|r| r.property_type == property_type && r.existing_loans == count)
            .ok_or_else(|| {
                PropertyFinanceError::config(
                    "ltv_rules",
                    format!("missing {property_type:?} entry for {count} existing loans"),
                )
            })
    }

    pub fn max_tenure_years(&self, property_type: PropertyType) -> PropertyFinanceResult<u32> {
        self.raw
            .loan_limits
            .max_tenure_years
            .iter()
            .find(|c| c.property_type == property_type)
            .map(|c| c.years)
            .ok_or_else(|| {
                PropertyFinanceError::config(
                    "loan_limits.max_tenure_years",
                    format!("no tenure cap for {property_type:?}"),
                )
            })
    }

    pub fn property_tax_tiers(&self, usage: PropertyUsage) -> &[BracketTier] {
        match usage {
            PropertyUsage::OwnerOccupied => &self.raw.property_tax.owner_occupied,
            PropertyUsage::Investment => &self.raw.property_tax.non_owner_occupied,
        }
    }

    /// Interest rate used to size a loan against TDSR/MSR.
    pub fn servicing_rate(&self, loan_rate: Rate) -> Rate {
        match self.raw.stress_test_rate {
            Some(floor) => loan_rate.max(floor),
            None => loan_rate,
        }
    }
}

impl Deref for RateSchedule {
    type Target = RegulatoryRateSchedule;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl TryFrom<RegulatoryRateSchedule> for RateSchedule {
    type Error = PropertyFinanceError;

    fn try_from(raw: RegulatoryRateSchedule) -> Result<Self, Self::Error> {
        RateSchedule::new(raw)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn check_unit_rate(value: Rate, field: &str) -> PropertyFinanceResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(PropertyFinanceError::config(field, "must be within [0, 1]"));
    }
    Ok(())
}

fn check_cost_range(range: &CostRange, field: &str) -> PropertyFinanceResult<()> {
    if range.min < Decimal::ZERO || range.max < range.min {
        return Err(PropertyFinanceError::config(
            field,
            "range must satisfy 0 <= min <= max",
        ));
    }
    Ok(())
}

/// Counts for one key must run 0, 1, 2, ... without gaps or duplicates.
fn check_contiguous(mut counts: Vec<u32>, field: &str, key: &str) -> PropertyFinanceResult<()> {
    if counts.is_empty() {
        return Err(PropertyFinanceError::config(field, format!("no entries for {key}")));
    }
    counts.sort_unstable();
    for (expected, actual) in counts.iter().enumerate() {
        if *actual != expected as u32 {
            return Err(PropertyFinanceError::config(
                field,
                format!("{key} counts must run contiguously from 0 (found {counts:?})"),
            ));
        }
    }
    Ok(())
}

fn validate(s: &RegulatoryRateSchedule) -> PropertyFinanceResult<()> {
    if s.version.trim().is_empty() {
        return Err(PropertyFinanceError::config("version", "must not be empty"));
    }

    validate_tiers(&s.bsd_tiers, "bsd_tiers")?;

    for residency in ALL_RESIDENCIES {
        let counts = s
            .absd_rates
            .iter()
            .filter(|r| r.residency == residency)
            .map(|r| r.property_count)
            .collect();
        check_contiguous(counts, "absd_rates", &format!("{residency:?}"))?;
    }
    for (i, r) in s.absd_rates.iter().enumerate() {
        check_unit_rate(r.rate, &format!("absd_rates[{i}].rate"))?;
    }
    check_unit_rate(s.absd_entity_rate, "absd_entity_rate")?;

    if s.ssd.tiers.is_empty() {
        return Err(PropertyFinanceError::config("ssd.tiers", "at least one tier is required"));
    }
    let mut previous = 0u32;
    for (i, t) in s.ssd.tiers.iter().enumerate() {
        if t.max_holding_months <= previous {
            return Err(PropertyFinanceError::config(
                format!("ssd.tiers[{i}].max_holding_months"),
                "holding-period buckets must be strictly ascending and positive",
            ));
        }
        check_unit_rate(t.rate, &format!("ssd.tiers[{i}].rate"))?;
        previous = t.max_holding_months;
    }
    if previous != s.ssd.exemption_threshold_months {
        return Err(PropertyFinanceError::config(
            "ssd.exemption_threshold_months",
            "must equal the last tier's max_holding_months",
        ));
    }

    if s.tdsr_limit <= Decimal::ZERO || s.tdsr_limit > Decimal::ONE {
        return Err(PropertyFinanceError::config("tdsr_limit", "must be within (0, 1]"));
    }
    if s.msr_limit <= Decimal::ZERO || s.msr_limit > s.tdsr_limit {
        return Err(PropertyFinanceError::config(
            "msr_limit",
            "must be positive and no looser than tdsr_limit",
        ));
    }
    if let Some(rate) = s.stress_test_rate {
        check_unit_rate(rate, "stress_test_rate")?;
    }
    check_unit_rate(s.variable_income_haircut, "variable_income_haircut")?;

    for property_type in ALL_PROPERTY_TYPES {
        let counts = s
            .ltv_rules
            .iter()
            .filter(|r| r.property_type == property_type)
            .map(|r| r.existing_loans)
            .collect();
        check_contiguous(counts, "ltv_rules", &format!("{property_type:?}"))?;

        if !s
            .loan_limits
            .max_tenure_years
            .iter()
            .any(|c| c.property_type == property_type && c.years > 0)
        {
            return Err(PropertyFinanceError::config(
                "loan_limits.max_tenure_years",
                format!("a positive tenure cap is required for {property_type:?}"),
            ));
        }
    }
    for (i, r) in s.ltv_rules.iter().enumerate() {
        if r.max_ltv <= Decimal::ZERO || r.max_ltv >= Decimal::ONE {
            return Err(PropertyFinanceError::config(
                format!("ltv_rules[{i}].max_ltv"),
                "must be within (0, 1)",
            ));
        }
        if r.min_cash_down_payment < Decimal::ZERO
            || r.min_cash_down_payment > Decimal::ONE - r.max_ltv
        {
            return Err(PropertyFinanceError::config(
                format!("ltv_rules[{i}].min_cash_down_payment"),
                "must be within [0, 1 - max_ltv]",
            ));
        }
    }
    if s.loan_limits.max_loan_age == 0 {
        return Err(PropertyFinanceError::config("loan_limits.max_loan_age", "must be positive"));
    }

    validate_tiers(&s.property_tax.owner_occupied, "property_tax.owner_occupied")?;
    validate_tiers(&s.property_tax.non_owner_occupied, "property_tax.non_owner_occupied")?;
    if s.property_tax.annual_value_proxy <= Decimal::ZERO
        || s.property_tax.annual_value_proxy > Decimal::ONE
    {
        return Err(PropertyFinanceError::config(
            "property_tax.annual_value_proxy",
            "must be within (0, 1]",
        ));
    }

    check_unit_rate(s.cpf_rates.oa_interest_rate, "cpf_rates.oa_interest_rate")?;
    check_unit_rate(s.cpf_rates.sa_interest_rate, "cpf_rates.sa_interest_rate")?;

    check_cost_range(&s.misc_costs.legal_fees, "misc_costs.legal_fees")?;
    check_cost_range(&s.misc_costs.valuation_fees, "misc_costs.valuation_fees")?;
    check_cost_range(
        &s.misc_costs.condo_maintenance_monthly,
        "misc_costs.condo_maintenance_monthly",
    )?;
    check_cost_range(&s.misc_costs.home_insurance_annual, "misc_costs.home_insurance_annual")?;
    check_unit_rate(s.misc_costs.option_fee, "misc_costs.option_fee")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw() -> RegulatoryRateSchedule {
        reference::singapore_2024().into_inner()
    }

    #[test]
    fn test_reference_schedule_validates() {
        assert!(RateSchedule::new(raw()).is_ok());
    }

    #[test]
    fn test_absd_lookup_and_clamp() {
        let s = reference::singapore_2024();
        let first = s.absd_rate(Residency::Citizen, 0, false).unwrap();
        assert_eq!(first.rate, Decimal::ZERO);
        assert!(!first.clamped);

        let many = s.absd_rate(Residency::Citizen, 7, false).unwrap();
        assert_eq!(many.rate, dec!(0.30));
        assert_eq!(many.property_count_used, 2);
        assert!(many.clamped);
    }

    #[test]
    fn test_absd_entity_rate() {
        let s = reference::singapore_2024();
        let lookup = s.absd_rate(Residency::Citizen, 0, true).unwrap();
        assert_eq!(lookup.rate, dec!(0.65));
    }

    #[test]
    fn test_ssd_buckets_and_exemption() {
        let s = reference::singapore_2024();
        assert_eq!(s.ssd_rate(0).unwrap(), dec!(0.12));
        assert_eq!(s.ssd_rate(11).unwrap(), dec!(0.12));
        assert_eq!(s.ssd_rate(12).unwrap(), dec!(0.08));
        assert_eq!(s.ssd_rate(35).unwrap(), dec!(0.04));
        assert_eq!(s.ssd_rate(36).unwrap(), Decimal::ZERO);
        assert_eq!(s.ssd_rate(120).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_ltv_rule_clamps_loan_count() {
        let s = reference::singapore_2024();
        assert_eq!(s.ltv_rule(PropertyType::Condo, 0).unwrap().max_ltv, dec!(0.75));
        assert_eq!(s.ltv_rule(PropertyType::Condo, 5).unwrap().max_ltv, dec!(0.35));
    }

    #[test]
    fn test_servicing_rate_floor() {
        let s = reference::singapore_2024();
        assert_eq!(s.servicing_rate(dec!(0.03)), dec!(0.04));
        assert_eq!(s.servicing_rate(dec!(0.05)), dec!(0.05));
    }

    #[test]
    fn test_rejects_non_monotonic_bsd() {
        let mut s = raw();
        s.bsd_tiers.swap(0, 1);
        assert!(matches!(
            RateSchedule::new(s),
            Err(PropertyFinanceError::Configuration { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_absd_residency() {
        let mut s = raw();
        s.absd_rates.retain(|r| r.residency != Residency::Foreigner);
        assert!(RateSchedule::new(s).is_err());
    }

    #[test]
    fn test_rejects_gap_in_ltv_rows() {
        let mut s = raw();
        s.ltv_rules
            .retain(|r| !(r.property_type == PropertyType::Hdb && r.existing_loans == 1));
        assert!(RateSchedule::new(s).is_err());
    }

    #[test]
    fn test_rejects_msr_looser_than_tdsr() {
        let mut s = raw();
        s.msr_limit = dec!(0.60);
        assert!(RateSchedule::new(s).is_err());
    }

    #[test]
    fn test_rejects_ssd_threshold_mismatch() {
        let mut s = raw();
        s.ssd.exemption_threshold_months = 48;
        assert!(RateSchedule::new(s).is_err());
    }

    #[test]
    fn test_rejects_inverted_cost_range() {
        let mut s = raw();
        s.misc_costs.legal_fees = CostRange {
            min: dec!(3000),
            max: dec!(2000),
        };
        assert!(RateSchedule::new(s).is_err());
    }

    #[test]
    fn test_json_roundtrip_through_validation() {
        let json = serde_json::to_string(&reference::singapore_2024()).unwrap();
        let parsed = RateSchedule::from_json_str(&json).unwrap();
        assert_eq!(parsed, reference::singapore_2024());
    }
}
