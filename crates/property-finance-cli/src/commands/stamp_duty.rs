use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use property_finance_core::schedule::RateSchedule;
use property_finance_core::stamp_duty::{self, StampDutyInput};

use super::ResidencyArg;
use crate::input;

/// Arguments for stamp duty calculation
#[derive(Args)]
pub struct StampDutyArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Purchase price
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Buyer residency
    #[arg(long, value_enum, default_value = "citizen")]
    pub residency: ResidencyArg,

    /// Residential properties already owned
    #[arg(long, default_value_t = 0)]
    pub existing_properties: u32,

    /// Buyer is an entity rather than an individual
    #[arg(long)]
    pub entity: bool,

    /// Also compute SSD for a resale after this many months
    #[arg(long)]
    pub holding_months: Option<u32>,
}

pub fn run_stamp_duty(
    args: StampDutyArgs,
    schedule: &RateSchedule,
) -> Result<Value, Box<dyn std::error::Error>> {
    let sd_input: StampDutyInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(piped) = input::stdin::read_piped("stamp-duty")? {
        piped
    } else {
        StampDutyInput {
            price: args.price.ok_or("--price is required (or provide --input)")?,
            residency: args.residency.into(),
            existing_properties: args.existing_properties,
            is_entity: args.entity,
            holding_period_months: args.holding_months,
        }
    };
    let result = stamp_duty::compute_stamp_duty(&sd_input, schedule)?;
    Ok(serde_json::to_value(result)?)
}
