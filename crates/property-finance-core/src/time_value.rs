use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::PropertyFinanceError;
use crate::types::{Money, Rate};
use crate::PropertyFinanceResult;

const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Highest annual rate accepted for loans and projected returns (100%).
pub const MAX_ANNUAL_RATE: Rate = dec!(1);

/// Longest loan tenure or projection horizon, in years.
pub const MAX_TERM_YEARS: u32 = 100;

/// Convert an annual nominal rate into a monthly periodic rate.
pub fn monthly_rate(annual_rate: Rate) -> Rate {
    annual_rate / MONTHS_PER_YEAR
}

/// Reject annual rates outside [0, MAX_ANNUAL_RATE] and terms outside
/// [1, MAX_TERM_YEARS].
pub(crate) fn validate_rate_and_term(
    rate_field: &str,
    annual_rate: Rate,
    term_field: &str,
    years: u32,
) -> PropertyFinanceResult<()> {
    if annual_rate < Decimal::ZERO || annual_rate > MAX_ANNUAL_RATE {
        return Err(PropertyFinanceError::invalid(
            rate_field,
            format!("must be within [0, {MAX_ANNUAL_RATE}]"),
        ));
    }
    if years == 0 || years > MAX_TERM_YEARS {
        return Err(PropertyFinanceError::invalid(
            term_field,
            format!("must be between 1 and {MAX_TERM_YEARS} years"),
        ));
    }
    Ok(())
}

pub(crate) fn overflow(field: &str) -> PropertyFinanceError {
    PropertyFinanceError::invalid(field, "value too large: arithmetic overflowed")
}

/// Compute (1 + r)^n via iterative multiplication (avoids Decimal::powd drift).
///
/// Returns an error instead of panicking when the factor leaves Decimal range.
pub fn compound(rate: Rate, n: u32) -> PropertyFinanceResult<Decimal> {
    let factor = Decimal::ONE
        .checked_add(rate)
        .ok_or_else(|| overflow("rate"))?;
    let mut result = Decimal::ONE;
    for _ in 0..n {
        result = match result.checked_mul(factor) {
            Some(product) => product,
            None => return Err(overflow("rate")),
        };
    }
    Ok(result)
}

/// Level payment that fully repays `principal` over `nper` periods.
///
/// A zero rate is handled explicitly as `principal / nper`.
pub fn annuity_payment(principal: Money, rate: Rate, nper: u32) -> PropertyFinanceResult<Money> {
    if nper == 0 {
        return Err(PropertyFinanceError::invalid(
            "nper",
            "Number of periods must be > 0",
        ));
    }
    if rate < Decimal::ZERO {
        return Err(PropertyFinanceError::invalid(
            "rate",
            "Periodic rate cannot be negative",
        ));
    }

    if rate.is_zero() {
        return Ok(principal / Decimal::from(nper));
    }

    let factor = compound(rate, nper)?;
    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        // Rate too small to move a 28-digit factor; fall back to straight-line.
        return Ok(principal / Decimal::from(nper));
    }

    principal
        .checked_mul(rate)
        .and_then(|p| p.checked_mul(factor))
        .and_then(|p| p.checked_div(denominator))
        .ok_or_else(|| overflow("principal"))
}

/// Present value of `nper` level payments: the inverse of [`annuity_payment`].
pub fn annuity_present_value(payment: Money, rate: Rate, nper: u32) -> PropertyFinanceResult<Money> {
    if rate < Decimal::ZERO {
        return Err(PropertyFinanceError::invalid(
            "rate",
            "Periodic rate cannot be negative",
        ));
    }
    if nper == 0 || payment <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }

    if rate.is_zero() {
        return Ok(payment * Decimal::from(nper));
    }

    let factor = compound(rate, nper)?;
    if factor.is_zero() {
        return Ok(payment * Decimal::from(nper));
    }

    let annuity_factor = (Decimal::ONE - Decimal::ONE / factor) / rate;
    Ok(payment * annuity_factor)
}
