use clap::Args;
use serde_json::Value;

use property_finance_core::cpf_optimizer::{self, CpfOptimizerInput};
use property_finance_core::schedule::RateSchedule;

use crate::input;

/// Arguments for the CPF usage comparison
#[derive(Args)]
pub struct CpfOptimizerArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Drop the per-age balance history from each scenario
    #[arg(long)]
    pub no_history: bool,
}

pub fn run_cpf_optimizer(
    args: CpfOptimizerArgs,
    schedule: &RateSchedule,
) -> Result<Value, Box<dyn std::error::Error>> {
    let cpf_input: CpfOptimizerInput =
        input::read_required(args.input.as_deref(), "cpf-optimizer")?;
    let mut result = cpf_optimizer::optimize_cpf_usage(&cpf_input, schedule)?;
    if args.no_history {
        for scenario in &mut result.result.scenarios {
            scenario.balance_history.clear();
        }
    }
    Ok(serde_json::to_value(result)?)
}
