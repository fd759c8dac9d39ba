//! Progressive tier summation shared by Buyer's Stamp Duty and property tax.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PropertyFinanceError;
use crate::types::{Money, Rate};
use crate::PropertyFinanceResult;

/// One band of a progressive schedule. `ceiling` is the cumulative upper
/// bound of the band; `None` marks the unbounded top band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceiling: Option<Money>,
    pub rate: Rate,
}

impl BracketTier {
    pub fn bounded(ceiling: Money, rate: Rate) -> Self {
        BracketTier {
            ceiling: Some(ceiling),
            rate,
        }
    }

    pub fn unbounded(rate: Rate) -> Self {
        BracketTier {
            ceiling: None,
            rate,
        }
    }
}

/// Charge levied within a single band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCharge {
    pub lower: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<Money>,
    pub rate: Rate,
    pub taxable_portion: Money,
    pub charge: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketEvaluation {
    pub total: Money,
    pub tiers: Vec<TierCharge>,
}

/// Check that tiers are non-empty, strictly ascending, end in a single
/// unbounded band and carry rates within [0, 1].
pub fn validate_tiers(tiers: &[BracketTier], field: &str) -> PropertyFinanceResult<()> {
    if tiers.is_empty() {
        return Err(PropertyFinanceError::config(field, "at least one tier is required"));
    }

    let last = tiers.len() - 1;
    let mut previous = Decimal::ZERO;
    for (i, tier) in tiers.iter().enumerate() {
        if tier.rate < Decimal::ZERO || tier.rate > Decimal::ONE {
            return Err(PropertyFinanceError::config(
                format!("{field}[{i}].rate"),
                "rate must be within [0, 1]",
            ));
        }
        match tier.ceiling {
            Some(_) if i == last => {
                return Err(PropertyFinanceError::config(
                    format!("{field}[{i}].ceiling"),
                    "the last tier must be unbounded",
                ));
            }
            None if i != last => {
                return Err(PropertyFinanceError::config(
                    format!("{field}[{i}].ceiling"),
                    "only the last tier may be unbounded",
                ));
            }
            Some(ceiling) if ceiling <= previous => {
                return Err(PropertyFinanceError::config(
                    format!("{field}[{i}].ceiling"),
                    format!("ceilings must be strictly ascending ({ceiling} <= {previous})"),
                ));
            }
            Some(ceiling) => previous = ceiling,
            None => {}
        }
    }
    Ok(())
}

/// Sum rate × portion-of-value-within-band from the lowest band upward.
pub fn evaluate(tiers: &[BracketTier], value: Money) -> PropertyFinanceResult<BracketEvaluation> {
    validate_tiers(tiers, "tiers")?;
    if value < Decimal::ZERO {
        return Err(PropertyFinanceError::invalid("value", "value cannot be negative"));
    }

    let mut total = Decimal::ZERO;
    let mut charges = Vec::new();
    let mut lower = Decimal::ZERO;

    for tier in tiers {
        if value <= lower {
            break;
        }
        let upper = tier.ceiling.map_or(value, |c| c.min(value));
        let portion = upper - lower;
        let charge = portion * tier.rate;
        total += charge;
        charges.push(TierCharge {
            lower,
            upper: tier.ceiling,
            rate: tier.rate,
            taxable_portion: portion,
            charge,
        });
        match tier.ceiling {
            Some(c) => lower = c,
            None => break,
        }
    }

    Ok(BracketEvaluation {
        total,
        tiers: charges,
    })
}

/// Total only; see [`evaluate`] for the per-band breakdown.
pub fn evaluate_total(tiers: &[BracketTier], value: Money) -> PropertyFinanceResult<Money> {
    evaluate(tiers, value).map(|e| e.total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_tiers() -> Vec<BracketTier> {
        vec![
            BracketTier::bounded(dec!(180_000), dec!(0.01)),
            BracketTier::bounded(dec!(360_000), dec!(0.02)),
            BracketTier::bounded(dec!(600_000), dec!(0.03)),
            BracketTier::bounded(dec!(1_000_000), dec!(0.04)),
            BracketTier::bounded(dec!(1_400_000), dec!(0.05)),
            BracketTier::unbounded(dec!(0.06)),
        ]
    }

    #[test]
    fn test_zero_value_is_zero() {
        let e = evaluate(&sample_tiers(), Decimal::ZERO).unwrap();
        assert_eq!(e.total, Decimal::ZERO);
        assert!(e.tiers.is_empty());
    }

    #[test]
    fn test_value_within_first_tier() {
        let total = evaluate_total(&sample_tiers(), dec!(100_000)).unwrap();
        assert_eq!(total, dec!(1000));
    }

    #[test]
    fn test_value_on_tier_boundary() {
        let e = evaluate(&sample_tiers(), dec!(360_000)).unwrap();
        assert_eq!(e.total, dec!(5400));
        assert_eq!(e.tiers.len(), 2);
    }

    #[test]
    fn test_value_in_top_tier() {
        // 1800 + 3600 + 7200 + 16000 + 20000 + 6000
        let e = evaluate(&sample_tiers(), dec!(1_500_000)).unwrap();
        assert_eq!(e.total, dec!(54_600));
        assert_eq!(e.tiers.len(), 6);
        assert_eq!(e.tiers[5].taxable_portion, dec!(100_000));
    }

    #[test]
    fn test_monotone_and_continuous_sweep() {
        let tiers = sample_tiers();
        let mut previous = Decimal::ZERO;
        let mut value = Decimal::ZERO;
        while value <= dec!(2_000_000) {
            let total = evaluate_total(&tiers, value).unwrap();
            assert!(total >= previous, "not monotone at {value}");
            // a 1,000 step can move the total by at most 6%
            assert!(total - previous <= dec!(60), "jump at {value}");
            previous = total;
            value += dec!(1_000);
        }
    }

    #[test]
    fn test_single_unbounded_tier() {
        let tiers = vec![BracketTier::unbounded(dec!(0.10))];
        assert_eq!(evaluate_total(&tiers, dec!(5_000)).unwrap(), dec!(500));
    }

    #[test]
    fn test_rejects_bounded_last_tier() {
        let tiers = vec![BracketTier::bounded(dec!(100), dec!(0.01))];
        assert!(matches!(
            validate_tiers(&tiers, "bsd_tiers"),
            Err(PropertyFinanceError::Configuration { .. })
        ));
    }

    #[test]
    fn test_rejects_non_monotonic_ceilings() {
        let tiers = vec![
            BracketTier::bounded(dec!(200), dec!(0.01)),
            BracketTier::bounded(dec!(100), dec!(0.02)),
            BracketTier::unbounded(dec!(0.03)),
        ];
        assert!(validate_tiers(&tiers, "bsd_tiers").is_err());
    }

    #[test]
    fn test_rejects_empty_and_inner_unbounded() {
        assert!(validate_tiers(&[], "bsd_tiers").is_err());
        let tiers = vec![
            BracketTier::unbounded(dec!(0.01)),
            BracketTier::unbounded(dec!(0.02)),
        ];
        assert!(validate_tiers(&tiers, "bsd_tiers").is_err());
    }

    #[test]
    fn test_negative_value_rejected() {
        assert!(matches!(
            evaluate(&sample_tiers(), dec!(-1)),
            Err(PropertyFinanceError::InvalidInput { .. })
        ));
    }
}
