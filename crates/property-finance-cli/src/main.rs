mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use property_finance_core::schedule::{reference, RateSchedule};

use commands::affordability::AffordabilityArgs;
use commands::cpf::CpfOptimizerArgs;
use commands::debt_servicing::DebtServicingArgs;
use commands::mortgage::MortgageArgs;
use commands::ownership::TcoArgs;
use commands::stamp_duty::StampDutyArgs;

/// Property-finance calculations against a versioned rate schedule
#[derive(Parser)]
#[command(
    name = "pfc",
    version,
    about = "Property-finance calculations against a versioned rate schedule",
    long_about = "A CLI for deterministic property-finance calculations with decimal \
                  precision: stamp duty, TDSR/MSR, mortgage amortization, maximum \
                  affordable price, CPF usage scenarios and total cost of ownership. \
                  Rates are decimals (0.035 = 3.5%)."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Rate schedule file (JSON, or YAML by extension). Defaults to the bundled SG-2024 schedule.
    #[arg(long, global = true, env = "PFC_SCHEDULE")]
    schedule: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Buyer's, additional buyer's and seller's stamp duty
    StampDuty(StampDutyArgs),
    /// TDSR and MSR for a proposed repayment
    DebtServicing(DebtServicingArgs),
    /// Fixed-rate mortgage repayment and amortization
    Mortgage(MortgageArgs),
    /// Maximum affordable price and its binding constraint
    Affordability(AffordabilityArgs),
    /// Compare CPF deployment scenarios to retirement
    CpfOptimizer(CpfOptimizerArgs),
    /// Multi-year total cost of ownership
    Tco(TcoArgs),
    /// Validate and print the active rate schedule
    Schedule,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn load_schedule(path: Option<&str>) -> Result<RateSchedule, Box<dyn std::error::Error>> {
    match path {
        Some(p) => input::file::read_schedule(p),
        None => Ok(reference::singapore_2024()),
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("pfc {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let schedule = match load_schedule(cli.schedule.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(2);
        }
    };
    log::debug!("using rate schedule {}", schedule.version);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::StampDuty(args) => commands::stamp_duty::run_stamp_duty(args, &schedule),
        Commands::DebtServicing(args) => {
            commands::debt_servicing::run_debt_servicing(args, &schedule)
        }
        Commands::Mortgage(args) => commands::mortgage::run_mortgage(args, &schedule),
        Commands::Affordability(args) => {
            commands::affordability::run_affordability(args, &schedule)
        }
        Commands::CpfOptimizer(args) => commands::cpf::run_cpf_optimizer(args, &schedule),
        Commands::Tco(args) => commands::ownership::run_tco(args, &schedule),
        Commands::Schedule => commands::schedule::run_schedule(&schedule),
        Commands::Version => return,
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
