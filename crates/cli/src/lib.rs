pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pricebook_core::config::{LoadOptions, LogFormat, PricingConfig};
use pricebook_core::QuantityRules;
use rust_decimal::Decimal;

#[derive(Debug, Parser)]
#[command(
    name = "pricebook",
    about = "Pricebook cart pricing CLI",
    long_about = "Price carts and quotes from JSON requests, validate order quantities, and inspect configuration.",
    after_help = "Examples:\n  pricebook calculate cart.json\n  pricebook calculate cart.json --by-seller\n  pricebook validate-quantity --quantity 12 --moq 10 --step 4\n  pricebook config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the pricing pipeline over a JSON calculation request")]
    Calculate {
        #[arg(help = "Path to the calculation request JSON document")]
        request: PathBuf,
        #[arg(long, help = "Calculate each seller's lines as an independent cart")]
        by_seller: bool,
    },
    #[command(about = "Check a quantity against minimum, maximum and packaging-step rules")]
    ValidateQuantity {
        #[arg(long)]
        quantity: Decimal,
        #[arg(long, help = "Minimum order quantity")]
        moq: Option<Decimal>,
        #[arg(long, help = "Packaging step the quantity must be a multiple of")]
        step: Option<Decimal>,
        #[arg(long, help = "Maximum order quantity")]
        max: Option<Decimal>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Calculate { request, by_seller } => commands::calculate::run(&request, by_seller),
        Command::ValidateQuantity { quantity, moq, step, max } => commands::validate::run(
            quantity,
            &QuantityRules {
                min_order_quantity: moq,
                packaging_quantity: step,
                max_order_quantity: max,
            },
        ),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout carries only the JSON payload. Commands report
/// config failures themselves, so a broken config falls back to defaults here.
fn init_logging() {
    use tracing::Level;

    let config = PricingConfig::load(LoadOptions::default()).unwrap_or_default();
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(log_level);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
