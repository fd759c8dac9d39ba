use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use property_finance_core::amortization::{self, LoanParameters};
use property_finance_core::schedule::RateSchedule;

use crate::input;

/// Arguments for mortgage amortization
#[derive(Args)]
pub struct MortgageArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate as a decimal (0.035 = 3.5%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Tenure in years
    #[arg(long)]
    pub tenure: Option<u32>,

    /// Include the month-by-month schedule in the output
    #[arg(long)]
    pub full_schedule: bool,
}

pub fn run_mortgage(
    args: MortgageArgs,
    schedule: &RateSchedule,
) -> Result<Value, Box<dyn std::error::Error>> {
    let loan: LoanParameters = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(piped) = input::stdin::read_piped("mortgage")? {
        piped
    } else {
        LoanParameters {
            principal: args.principal.ok_or("--principal is required (or provide --input)")?,
            annual_rate: args.rate.ok_or("--rate is required (or provide --input)")?,
            tenure_years: args.tenure.ok_or("--tenure is required (or provide --input)")?,
        }
    };
    let result = amortization::calculate_mortgage(&loan, schedule)?;
    let mut value = serde_json::to_value(result)?;
    if !args.full_schedule {
        if let Some(res) = value.get_mut("result").and_then(Value::as_object_mut) {
            res.remove("schedule");
        }
    }
    Ok(value)
}
