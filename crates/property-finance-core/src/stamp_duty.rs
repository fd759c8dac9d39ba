use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::brackets::{self, TierCharge};
use crate::error::PropertyFinanceError;
use crate::schedule::RateSchedule;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, Residency};
use crate::PropertyFinanceResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampDutyInput {
    pub price: Money,
    pub residency: Residency,
    /// Residential properties already owned at the time of purchase.
    pub existing_properties: u32,
    #[serde(default)]
    pub is_entity: bool,
    /// When set, SSD is also computed for a resale after this many months.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holding_period_months: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsdAmount {
    pub rate: Rate,
    pub amount: Money,
    pub property_count_used: u32,
    pub clamped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampDutyOutput {
    pub bsd: Money,
    pub bsd_breakdown: Vec<TierCharge>,
    pub absd: Money,
    pub absd_rate: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssd: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssd_rate: Option<Rate>,
    /// BSD + ABSD payable on purchase.
    pub total_buyer_duty: Money,
    pub effective_buyer_rate: Rate,
}

// ---------------------------------------------------------------------------
// Component calculations
// ---------------------------------------------------------------------------

fn check_price(price: Money) -> PropertyFinanceResult<()> {
    if price < Decimal::ZERO {
        return Err(PropertyFinanceError::invalid("price", "price cannot be negative"));
    }
    Ok(())
}

/// Buyer's Stamp Duty: progressive tiers over the purchase price.
pub fn compute_bsd(price: Money, schedule: &RateSchedule) -> PropertyFinanceResult<Money> {
    check_price(price)?;
    brackets::evaluate_total(&schedule.bsd_tiers, price)
}

/// Additional Buyer's Stamp Duty: flat rate by residency and property count.
///
/// Counts above the highest configured row are clamped to that row.
pub fn compute_absd(
    price: Money,
    residency: Residency,
    existing_properties: u32,
    is_entity: bool,
    schedule: &RateSchedule,
) -> PropertyFinanceResult<AbsdAmount> {
    check_price(price)?;
    let lookup = schedule.absd_rate(residency, existing_properties, is_entity)?;
    Ok(AbsdAmount {
        rate: lookup.rate,
        amount: price * lookup.rate,
        property_count_used: lookup.property_count_used,
        clamped: lookup.clamped,
    })
}

/// Seller's Stamp Duty on a resale after `holding_period_months`.
pub fn compute_ssd(
    price: Money,
    holding_period_months: u32,
    schedule: &RateSchedule,
) -> PropertyFinanceResult<Money> {
    check_price(price)?;
    Ok(price * schedule.ssd_rate(holding_period_months)?)
}

// ---------------------------------------------------------------------------
// Combined
// ---------------------------------------------------------------------------

pub fn compute_stamp_duty(
    input: &StampDutyInput,
    schedule: &RateSchedule,
) -> PropertyFinanceResult<ComputationOutput<StampDutyOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    check_price(input.price)?;

    let bsd = brackets::evaluate(&schedule.bsd_tiers, input.price)?;
    let absd = compute_absd(
        input.price,
        input.residency,
        input.existing_properties,
        input.is_entity,
        schedule,
    )?;
    if absd.clamped {
        let msg = format!(
            "{} existing properties exceeds the ABSD table; rate for {} applied",
            input.existing_properties, absd.property_count_used
        );
        log::warn!("{msg}");
        warnings.push(msg);
    }

    let (ssd, ssd_rate) = match input.holding_period_months {
        Some(months) => {
            let rate = schedule.ssd_rate(months)?;
            (Some(input.price * rate), Some(rate))
        }
        None => (None, None),
    };

    let total_buyer_duty = bsd.total + absd.amount;
    let effective_buyer_rate = if input.price.is_zero() {
        warnings.push("Price is zero; all duties are zero".into());
        Decimal::ZERO
    } else {
        total_buyer_duty / input.price
    };

    let output = StampDutyOutput {
        bsd: bsd.total,
        bsd_breakdown: bsd.tiers,
        absd: absd.amount,
        absd_rate: absd.rate,
        ssd,
        ssd_rate,
        total_buyer_duty,
        effective_buyer_rate,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Stamp Duty (BSD progressive tiers, ABSD flat surcharge, SSD holding-period buckets)",
        &serde_json::json!({
            "price": input.price.to_string(),
            "residency": input.residency,
            "existing_properties": input.existing_properties,
            "is_entity": input.is_entity,
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

    fn default_input() -> StampDutyInput {
        StampDutyInput {
            price: dec!(1_500_000),
            residency: Residency::Citizen,
            existing_properties: 0,
            is_entity: false,
            holding_period_months: None,
        }
    }

    #[test]
    fn test_bsd_reference_tiers() {
        let s = reference::singapore_2024();
        // 1800 + 3600 + 19200 + 20000
        assert_eq!(compute_bsd(dec!(1_500_000), &s).unwrap(), dec!(44_600));
    }

    #[test]
    fn test_bsd_zero_price() {
        let s = reference::singapore_2024();
        assert_eq!(compute_bsd(Decimal::ZERO, &s).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_absd_second_property_citizen() {
        let s = reference::singapore_2024();
        let absd = compute_absd(dec!(1_000_000), Residency::Citizen, 1, false, &s).unwrap();
        assert_eq!(absd.rate, dec!(0.20));
        assert_eq!(absd.amount, dec!(200_000));
    }

    #[test]
    fn test_absd_foreigner_first_property() {
        let s = reference::singapore_2024();
        let absd = compute_absd(dec!(2_000_000), Residency::Foreigner, 0, false, &s).unwrap();
        assert_eq!(absd.amount, dec!(1_200_000));
    }

    #[test]
    fn test_ssd_within_first_year() {
        let s = reference::singapore_2024();
        assert_eq!(compute_ssd(dec!(1_000_000), 6, &s).unwrap(), dec!(120_000));
    }

    #[test]
    fn test_ssd_exempt_after_threshold() {
        let s = reference::singapore_2024();
        assert_eq!(compute_ssd(dec!(1_000_000), 36, &s).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_combined_output() {
        let s = reference::singapore_2024();
        let mut input = default_input();
        input.existing_properties = 1;
        input.holding_period_months = Some(18);

        let out = compute_stamp_duty(&input, &s).unwrap();
        let r = &out.result;
        assert_eq!(r.bsd, dec!(44_600));
        assert_eq!(r.absd, dec!(300_000));
        assert_eq!(r.ssd, Some(dec!(120_000)));
        assert_eq!(r.total_buyer_duty, dec!(344_600));
        assert_eq!(r.bsd_breakdown.len(), 4);
        assert!(out.warnings.is_empty());
        assert_eq!(out.metadata.schedule_version, "SG-2024.1");
    }

    #[test]
    fn test_clamped_count_warns() {
        let s = reference::singapore_2024();
        let mut input = default_input();
        input.existing_properties = 4;
        let out = compute_stamp_duty(&input, &s).unwrap();
        assert_eq!(out.result.absd_rate, dec!(0.30));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_zero_price_effective_rate() {
        let s = reference::singapore_2024();
        let mut input = default_input();
        input.price = Decimal::ZERO;
        let out = compute_stamp_duty(&input, &s).unwrap();
        assert_eq!(out.result.effective_buyer_rate, Decimal::ZERO);
    }

    #[test]
    fn test_negative_price_rejected() {
        let s = reference::singapore_2024();
        let mut input = default_input();
        input.price = dec!(-1);
        assert!(matches!(
            compute_stamp_duty(&input, &s),
            Err(PropertyFinanceError::InvalidInput { .. })
        ));
    }
}
