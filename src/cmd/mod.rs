pub mod calculate;
pub mod rules;
pub mod schema;

use anyhow::Context;
use cardtax::tax::{RuleTable, SpendingInput, TaxYear, Won};
use clap::Args;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Where to take the rule table from. `--year` wins over `--rules`; with
/// neither, the newest built-in year is used.
#[derive(Args, Debug)]
pub struct RuleSource {
    /// Built-in rule table for this tax year (e.g. 2025)
    #[arg(short, long)]
    year: Option<i32>,

    /// JSON rule table file
    #[arg(short, long, env = "CARDTAX_RULES")]
    rules: Option<PathBuf>,
}

impl RuleSource {
    pub fn load(&self) -> anyhow::Result<RuleTable> {
        match (self.year, &self.rules) {
            (Some(year), _) => builtin_rules(TaxYear(year)),
            (None, Some(path)) => read_rules(path),
            (None, None) => builtin_rules(TaxYear::LATEST),
        }
    }
}

fn builtin_rules(year: TaxYear) -> anyhow::Result<RuleTable> {
    let rules = year.rules().with_context(|| {
        let supported: Vec<_> = TaxYear::supported().iter().map(|y| y.to_string()).collect();
        format!(
            "no built-in rules for tax year {year} (supported: {})",
            supported.join(", ")
        )
    })?;
    log::info!("Using built-in rules for tax year {}", year);
    Ok(rules)
}

/// Read and validate a rule table file
fn read_rules(path: &Path) -> anyhow::Result<RuleTable> {
    let file = File::open(path)
        .with_context(|| format!("failed to open rule table {}", path.display()))?;
    let rules = RuleTable::from_json(BufReader::new(file))
        .with_context(|| format!("invalid rule table {}", path.display()))?;
    log::info!(
        "Loaded rules for tax year {} from {}",
        rules.year,
        path.display()
    );
    Ok(rules)
}

/// Read spending (JSON object of category key to amount) from a file, or
/// stdin with "-"
pub fn read_spending(path: &Path) -> anyhow::Result<SpendingInput> {
    if path.as_os_str() == "-" {
        read_spending_from_stdin()
    } else {
        let file = File::open(path)
            .with_context(|| format!("failed to open spending file {}", path.display()))?;
        let spending: SpendingInput = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("invalid spending file {}", path.display()))?;
        Ok(spending)
    }
}

fn read_spending_from_stdin() -> anyhow::Result<SpendingInput> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a spending file or pipe JSON to stdin.");
    }

    let spending: SpendingInput =
        serde_json::from_slice(&buffer).context("invalid spending JSON on stdin")?;
    Ok(spending)
}

/// Parse a `KEY=AMOUNT` spending argument
pub fn parse_spend(s: &str) -> Result<(String, Won), String> {
    let (key, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=AMOUNT, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing category in '{s}'"));
    }
    Ok((key.to_string(), crate::utils::parse_won(amount)?))
}
