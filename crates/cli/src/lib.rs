pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "gendra",
    about = "Gendra operator CLI",
    long_about = "Apply migrations, inspect configuration, seed demo clients, and price jobs offline.",
    after_help = "Examples:\n  gendra migrate\n  gendra config\n  gendra quote --service-type speccoat --quantity 120 --field masking_level=heavy"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Upsert the demo client configurations and verify they are readable")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Price a job with the configured strategies without logging it")]
    Quote(QuoteArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct QuoteArgs {
    #[arg(long, help = "Service type key, e.g. speccoat or parylene")]
    pub service_type: Option<String>,
    #[arg(long, help = "Number of units")]
    pub quantity: Option<i64>,
    #[arg(long, help = "Complexity multiplier")]
    pub complexity: Option<f64>,
    #[arg(long)]
    pub material: Option<String>,
    #[arg(long)]
    pub turnaround_days: Option<i64>,
    #[arg(long, help = "Apply the stored configuration of this client")]
    pub client: Option<String>,
    #[arg(long = "field", value_name = "KEY=VALUE", help = "Extra strategy input, repeatable")]
    pub fields: Vec<String>,
    #[arg(long, help = "Read job fields from a .csv or key: value text sheet")]
    pub file: Option<PathBuf>,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Quote(args) => commands::quote::run(&args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
