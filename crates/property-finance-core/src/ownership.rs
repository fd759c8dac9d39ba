use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::generate_schedule;
use crate::brackets;
use crate::error::PropertyFinanceError;
use crate::schedule::RateSchedule;
use crate::stamp_duty::{compute_absd, compute_bsd};
use crate::time_value::{compound, overflow, MAX_TERM_YEARS};
use crate::types::{with_metadata, ComputationOutput, Money, PropertyType, PropertyUsage, Rate, Residency};
use crate::PropertyFinanceResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input parameters for a multi-year cost of ownership projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcoInput {
    /// Purchase price of the property
    pub purchase_price: Money,
    pub property_type: PropertyType,
    /// Owner-occupied or investment; selects property tax tiers and rental treatment
    #[serde(default)]
    pub usage: PropertyUsage,
    pub residency: Residency,
    /// Residential properties owned before this purchase (for ABSD)
    #[serde(default)]
    pub properties_owned: u32,
    #[serde(default)]
    pub is_entity: bool,
    /// Mortgage principal; zero for a cash purchase
    pub loan_amount: Money,
    /// Annual mortgage interest rate (e.g. 0.035 = 3.5%)
    pub annual_rate: Rate,
    pub tenure_years: u32,
    /// Number of years the property is held
    pub holding_period_years: u32,
    /// Expected monthly rent (investment usage only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_rent: Option<Money>,
}

/// One-time costs incurred at purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneTimeCosts {
    pub bsd: Money,
    pub absd: Money,
    pub legal_fees: Money,
    pub valuation_fees: Money,
    pub total: Money,
}

/// Costs and income accrued in a single year of ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcoYear {
    pub year: u32,
    /// Sum of the year's monthly interest components
    pub mortgage_interest: Money,
    pub property_tax: Money,
    /// Condo/EC maintenance fees; zero for other property types
    pub maintenance: Money,
    pub insurance: Money,
    /// Foregone return on the down payment during the year
    pub opportunity_cost: Money,
    pub rental_income: Money,
    /// Interest + tax + maintenance + insurance + opportunity cost
    pub total_cost: Money,
    /// Costs net of rental income
    pub net_cost: Money,
    /// One-time costs plus all recurring costs up to and including this year
    pub cumulative_cost: Money,
}

/// Totals across the holding period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringTotals {
    pub mortgage_interest: Money,
    pub property_tax: Money,
    pub maintenance: Money,
    pub insurance: Money,
    pub opportunity_cost: Money,
    pub total: Money,
}

/// Rental metrics, populated for investment usage only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentMetrics {
    /// Annual rent / purchase price
    pub gross_rental_yield: Rate,
    /// (Annual rent - property tax - maintenance - insurance) / purchase price
    pub net_rental_yield: Rate,
    pub total_rental_income: Money,
    /// Sale price that recovers all costs net of rent received
    pub breakeven_sale_price: Money,
}

/// Seller's Stamp Duty payable on a sale at the end of the holding period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsdExposure {
    pub holding_period_months: u32,
    pub rate: Rate,
    /// Duty on a sale at the purchase price
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcoOutput {
    pub one_time_costs: OneTimeCosts,
    pub yearly: Vec<TcoYear>,
    pub recurring: RecurringTotals,
    pub grand_total_cost: Money,
    pub down_payment: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investment: Option<InvestmentMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssd_exposure: Option<SsdExposure>,
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

fn validate_input(input: &TcoInput) -> PropertyFinanceResult<()> {
    if input.purchase_price < Decimal::ZERO {
        return Err(PropertyFinanceError::invalid("purchase_price", "cannot be negative"));
    }
    if input.loan_amount < Decimal::ZERO {
        return Err(PropertyFinanceError::invalid("loan_amount", "cannot be negative"));
    }
    if input.loan_amount > input.purchase_price {
        return Err(PropertyFinanceError::invalid(
            "loan_amount",
            "loan cannot exceed the purchase price",
        ));
    }
    if input.holding_period_years == 0 || input.holding_period_years > MAX_TERM_YEARS {
        return Err(PropertyFinanceError::invalid(
            "holding_period_years",
            format!("holding period must be between 1 and {MAX_TERM_YEARS} years"),
        ));
    }
    if input.monthly_rent.is_some_and(|r| r < Decimal::ZERO) {
        return Err(PropertyFinanceError::invalid("monthly_rent", "cannot be negative"));
    }
    Ok(())
}

/// Project the year-by-year cost of holding a property.
pub fn project_total_cost(
    input: &TcoInput,
    schedule: &RateSchedule,
) -> PropertyFinanceResult<ComputationOutput<TcoOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let price = input.purchase_price;
    let amortization = generate_schedule(input.loan_amount, input.annual_rate, input.tenure_years)?;

    // --- One-time costs ---
    let bsd = compute_bsd(price, schedule)?;
    let absd = compute_absd(
        price,
        input.residency,
        input.properties_owned,
        input.is_entity,
        schedule,
    )?;
    if absd.clamped {
        let msg = format!(
            "{} properties owned exceeds the ABSD table; rate for {} applied",
            input.properties_owned, absd.property_count_used
        );
        log::warn!("{msg}");
        warnings.push(msg);
    }
    let (legal_fees, valuation_fees) = if price.is_zero() {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        (
            schedule.misc_costs.legal_fees.midpoint(),
            schedule.misc_costs.valuation_fees.midpoint(),
        )
    };
    let one_time_costs = OneTimeCosts {
        bsd,
        absd: absd.amount,
        legal_fees,
        valuation_fees,
        total: bsd + absd.amount + legal_fees + valuation_fees,
    };

    // --- Flat yearly estimates ---
    let annual_value = price * schedule.property_tax.annual_value_proxy;
    let property_tax =
        brackets::evaluate_total(schedule.property_tax_tiers(input.usage), annual_value)?;
    let maintenance = if input.property_type.has_condo_maintenance() {
        schedule.misc_costs.condo_maintenance_monthly.midpoint() * Decimal::from(12)
    } else {
        Decimal::ZERO
    };
    let insurance = schedule.misc_costs.home_insurance_annual.midpoint();

    let annual_rent = match (input.usage, input.monthly_rent) {
        (PropertyUsage::Investment, Some(rent)) => rent * Decimal::from(12),
        (PropertyUsage::Investment, None) => {
            warnings.push("Investment usage without monthly_rent; rental income taken as zero".into());
            Decimal::ZERO
        }
        (PropertyUsage::OwnerOccupied, Some(_)) => {
            warnings.push("monthly_rent ignored for owner-occupied usage".into());
            Decimal::ZERO
        }
        (PropertyUsage::OwnerOccupied, None) => Decimal::ZERO,
    };

    let down_payment = price - input.loan_amount;
    let sa_rate = schedule.cpf_rates.sa_interest_rate;

    // --- Year-by-year projection ---
    let mut yearly = Vec::with_capacity(input.holding_period_years as usize);
    let mut cumulative = one_time_costs.total;
    let mut recurring = RecurringTotals {
        mortgage_interest: Decimal::ZERO,
        property_tax: Decimal::ZERO,
        maintenance: Decimal::ZERO,
        insurance: Decimal::ZERO,
        opportunity_cost: Decimal::ZERO,
        total: Decimal::ZERO,
    };

    for year in 1..=input.holding_period_years {
        let mortgage_interest = amortization.interest_for_year(year);
        let opportunity_cost = down_payment
            .checked_mul(compound(sa_rate, year - 1)?)
            .and_then(|v| v.checked_mul(sa_rate))
            .ok_or_else(|| overflow("purchase_price"))?;
        let total_cost = mortgage_interest + property_tax + maintenance + insurance + opportunity_cost;
        cumulative += total_cost;

        recurring.mortgage_interest += mortgage_interest;
        recurring.property_tax += property_tax;
        recurring.maintenance += maintenance;
        recurring.insurance += insurance;
        recurring.opportunity_cost += opportunity_cost;
        recurring.total += total_cost;

        yearly.push(TcoYear {
            year,
            mortgage_interest,
            property_tax,
            maintenance,
            insurance,
            opportunity_cost,
            rental_income: annual_rent,
            total_cost,
            net_cost: total_cost - annual_rent,
            cumulative_cost: cumulative,
        });
    }

    let grand_total_cost = one_time_costs.total + recurring.total;

    let investment = match input.usage {
        PropertyUsage::Investment => {
            let total_rental_income = annual_rent * Decimal::from(input.holding_period_years);
            let operating = property_tax + maintenance + insurance;
            let (gross_rental_yield, net_rental_yield) = if price.is_zero() {
                (Decimal::ZERO, Decimal::ZERO)
            } else {
                (annual_rent / price, (annual_rent - operating) / price)
            };
            Some(InvestmentMetrics {
                gross_rental_yield,
                net_rental_yield,
                total_rental_income,
                breakeven_sale_price: grand_total_cost - total_rental_income,
            })
        }
        PropertyUsage::OwnerOccupied => None,
    };

    let holding_months = input.holding_period_years * 12;
    let ssd_exposure = if holding_months < schedule.ssd.exemption_threshold_months {
        let rate = schedule.ssd_rate(holding_months)?;
        warnings.push(format!(
            "Sale after {} months falls inside the SSD window ({}% duty)",
            holding_months,
            (rate * Decimal::ONE_HUNDRED).normalize()
        ));
        Some(SsdExposure {
            holding_period_months: holding_months,
            rate,
            amount: price * rate,
        })
    } else {
        None
    };

    if input.holding_period_years > input.tenure_years && !input.loan_amount.is_zero() {
        log::debug!(
            "holding period {}y outlives {}y loan; interest is zero after payoff",
            input.holding_period_years,
            input.tenure_years
        );
    }

    let output = TcoOutput {
        one_time_costs,
        yearly,
        recurring,
        grand_total_cost,
        down_payment,
        investment,
        ssd_exposure,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Total cost of ownership (yearly accrual, SA-rate opportunity cost)",
        &serde_json::json!({
            "annual_value_proxy": schedule.property_tax.annual_value_proxy.to_string(),
            "opportunity_rate": sa_rate.to_string(),
            "maintenance_estimate": "midpoint of configured range",
            "usage": input.usage,
        }),
        warnings,
        &schedule.version,
        elapsed,
        output,
    ))
}
