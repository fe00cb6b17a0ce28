use clap::{Parser, Subcommand};

mod cmd;
mod utils;

#[derive(Parser, Debug)]
#[command(
    name = "cardtax",
    version,
    about = "Estimate the Korean card spending income deduction (신용카드 소득공제)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate the deduction for a salary and spending profile
    Calculate(cmd::calculate::CalculateCommand),
    /// Validate and show a rule table
    Rules(cmd::rules::RulesCommand),
    /// Print JSON Schema for the input files
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Calculate(calculate) => calculate.exec(),
        Command::Rules(rules) => rules.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
