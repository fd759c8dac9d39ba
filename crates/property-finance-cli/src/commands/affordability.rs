use clap::Args;
use serde_json::Value;

use property_finance_core::affordability::{self, AffordabilityInput};
use property_finance_core::schedule::RateSchedule;

use crate::input;

/// Arguments for maximum affordable price
#[derive(Args)]
pub struct AffordabilityArgs {
    /// Path to JSON input file (financial profile, property type, rate, tenure)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_affordability(
    args: AffordabilityArgs,
    schedule: &RateSchedule,
) -> Result<Value, Box<dyn std::error::Error>> {
    let aff_input: AffordabilityInput =
        input::read_required(args.input.as_deref(), "affordability")?;
    let result = affordability::resolve_affordability(&aff_input, schedule)?;
    Ok(serde_json::to_value(result)?)
}
