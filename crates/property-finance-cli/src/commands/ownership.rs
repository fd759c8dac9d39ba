use clap::Args;
use serde_json::Value;

use property_finance_core::ownership::{self, TcoInput};
use property_finance_core::schedule::RateSchedule;

use crate::input;

/// Arguments for the total cost of ownership projection
#[derive(Args)]
pub struct TcoArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_tco(args: TcoArgs, schedule: &RateSchedule) -> Result<Value, Box<dyn std::error::Error>> {
    let tco_input: TcoInput = input::read_required(args.input.as_deref(), "tco")?;
    let result = ownership::project_total_cost(&tco_input, schedule)?;
    Ok(serde_json::to_value(result)?)
}
