pub mod commands;

use clap::{Parser, Subcommand};
use offerwise_core::domain::profile::{AlgorithmHint, BudgetTier, UsageType};
use offerwise_core::resolution::{DEFAULT_RECOMMENDATIONS, MAX_RECOMMENDATIONS};
use std::process::ExitCode;

use crate::commands::recommend::RecommendArgs;

#[derive(Debug, Parser)]
#[command(
    name = "offerwise",
    about = "Offerwise operator CLI",
    long_about = "Operate Offerwise migrations, catalog seeding, config inspection, readiness checks, and one-off recommendations.",
    after_help = "Examples:\n  offerwise doctor --json\n  offerwise seed\n  offerwise recommend --usage-type data --budget low --interest streaming"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load and verify the deterministic demo telco catalog")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, database connectivity, and classifier reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run one recommendation against the configured catalog and classifier")]
    Recommend {
        #[arg(long, default_value = "mixed", help = "data, voice, sms or mixed")]
        usage_type: UsageType,
        #[arg(long, help = "low, medium or high")]
        budget: Option<BudgetTier>,
        #[arg(long = "interest", help = "Interest tag, repeatable")]
        interests: Vec<String>,
        #[arg(long, default_value_t = DEFAULT_RECOMMENDATIONS, value_parser = parse_limit)]
        limit: usize,
        #[arg(long, default_value = "hybrid", help = "collaborative, content-based or hybrid")]
        algorithm: AlgorithmHint,
        #[arg(long, help = "Attribute the recommendation to this user in history")]
        user_id: Option<String>,
    },
}

fn parse_limit(raw: &str) -> Result<usize, String> {
    let limit = raw.parse::<usize>().map_err(|error| error.to_string())?;
    if (1..=MAX_RECOMMENDATIONS).contains(&limit) {
        Ok(limit)
    } else {
        Err(format!("limit must be between 1 and {MAX_RECOMMENDATIONS}"))
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Recommend { usage_type, budget, interests, limit, algorithm, user_id } => {
            commands::recommend::run(RecommendArgs {
                usage_type,
                budget,
                interests,
                limit,
                algorithm,
                user_id,
            })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
