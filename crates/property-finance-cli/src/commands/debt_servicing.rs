use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use property_finance_core::debt_servicing::{self, ApplicantIncome, DebtServicingInput};
use property_finance_core::schedule::RateSchedule;

use super::PropertyTypeArg;
use crate::input;

/// Arguments for TDSR / MSR assessment
#[derive(Args)]
pub struct DebtServicingArgs {
    /// Path to JSON input file (overrides individual flags; needed for joint applicants)
    #[arg(long)]
    pub input: Option<String>,

    /// Fixed monthly income
    #[arg(long)]
    pub fixed_income: Option<Decimal>,

    /// Variable monthly income (bonus, commission), before haircut
    #[arg(long, default_value = "0")]
    pub variable_income: Decimal,

    /// Existing monthly debt obligations
    #[arg(long, default_value = "0")]
    pub existing_debt: Decimal,

    /// Proposed monthly mortgage repayment
    #[arg(long)]
    pub repayment: Option<Decimal>,

    #[arg(long, value_enum, default_value = "condo")]
    pub property_type: PropertyTypeArg,

    /// Variable income haircut; defaults to the schedule's value
    #[arg(long)]
    pub haircut: Option<Decimal>,
}

pub fn run_debt_servicing(
    args: DebtServicingArgs,
    schedule: &RateSchedule,
) -> Result<Value, Box<dyn std::error::Error>> {
    let ds_input: DebtServicingInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(piped) = input::stdin::read_piped("debt-servicing")? {
        piped
    } else {
        DebtServicingInput {
            applicants: vec![ApplicantIncome {
                fixed_monthly: args
                    .fixed_income
                    .ok_or("--fixed-income is required (or provide --input)")?,
                variable_monthly: args.variable_income,
            }],
            existing_monthly_debt: args.existing_debt,
            proposed_monthly_repayment: args
                .repayment
                .ok_or("--repayment is required (or provide --input)")?,
            property_type: args.property_type.into(),
            variable_income_haircut: args.haircut,
        }
    };
    let result = debt_servicing::assess_debt_servicing(&ds_input, schedule)?;
    Ok(serde_json::to_value(result)?)
}
