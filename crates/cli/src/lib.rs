pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "estimator",
    about = "Multi-service estimator CLI",
    long_about = "Inspect the service catalog, compute estimates from answer files, and manage the estimate record store.",
    after_help = "Examples:\n  estimator services --search paint\n  estimator quote --request drywall.json --save\n  estimator records --limit 5"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "List catalog services, optionally filtered by a search term")]
    Services {
        #[arg(long, help = "Case-insensitive substring to match against service names")]
        search: Option<String>,
    },
    #[command(about = "Compute an estimate from a JSON request file and print its snapshot")]
    Quote {
        #[arg(long, help = "Path to a JSON estimate request")]
        request: PathBuf,
        #[arg(long, help = "Append the flattened estimate record to the database")]
        save: bool,
    },
    #[command(about = "List the most recently saved estimate records")]
    Records {
        #[arg(long, default_value_t = commands::records::DEFAULT_LIMIT)]
        limit: u32,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Migrate => commands::migrate::run(),
        Command::Services { search } => commands::services::run(search.as_deref()),
        Command::Quote { request, save } => commands::quote::run(&request, save),
        Command::Records { limit } => commands::records::run(limit),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
