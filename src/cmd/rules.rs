//! Rules command - validate and show a rule table

use super::RuleSource;
use cardtax::money::group_thousands;
use cardtax::tax::{RuleTable, TaxBracket};
use clap::Args;
use rust_decimal_macros::dec;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct RulesCommand {
    #[command(flatten)]
    source: RuleSource,

    /// Output as JSON instead of formatted tables
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Tabled)]
struct CategoryRow {
    #[tabled(rename = "#")]
    order: usize,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Category")]
    label: String,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Salary Limit")]
    income_limit: String,
    #[tabled(rename = "Extra Limit")]
    extra_limit: String,
    #[tabled(rename = "From")]
    effective_from: String,
}

#[derive(Debug, Clone, Tabled)]
struct BaseLimitRow {
    #[tabled(rename = "Salary")]
    tier: String,
    #[tabled(rename = "No children")]
    none: String,
    #[tabled(rename = "1 child")]
    one: String,
    #[tabled(rename = "2+ children")]
    two: String,
}

#[derive(Debug, Clone, Tabled)]
struct BracketRow {
    #[tabled(rename = "Tax Base")]
    band: String,
    #[tabled(rename = "Rate")]
    rate: String,
}

impl RulesCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let rules = self.source.load()?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&rules)?);
        } else {
            print_rules(&rules);
        }
        Ok(())
    }
}

fn print_rules(rules: &RuleTable) {
    println!();
    println!("CARD DEDUCTION RULES ({})", rules.year);
    println!();
    println!(
        "  Threshold: {:.0}% of salary | Tier boundary: {} | Near limit at {:.0}%",
        rules.threshold_rate * dec!(100),
        group_thousands(rules.income_tier_threshold),
        rules.near_limit_ratio * dec!(100)
    );
    println!();

    println!("Categories (threshold fill order)");
    let rows: Vec<CategoryRow> = rules
        .categories
        .iter()
        .enumerate()
        .map(|(i, c)| CategoryRow {
            order: i + 1,
            key: c.key.clone(),
            label: c.display_name().to_string(),
            rate: c.rate_display(),
            income_limit: c.income_limit.map_or("-".to_string(), group_thousands),
            extra_limit: if c.has_extra_deduction() {
                group_thousands(c.extra_deduction_limit)
            } else {
                "-".to_string()
            },
            effective_from: c
                .effective_from
                .map_or("-".to_string(), |d| d.format("%Y-%m-%d").to_string()),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!();

    println!("General deduction limits");
    let threshold = group_thousands(rules.income_tier_threshold);
    let limits = &rules.base_limit_table;
    let rows = vec![
        BaseLimitRow {
            tier: format!("<= {threshold}"),
            none: group_thousands(limits.under[0]),
            one: group_thousands(limits.under[1]),
            two: group_thousands(limits.under[2]),
        },
        BaseLimitRow {
            tier: format!("> {threshold}"),
            none: group_thousands(limits.over[0]),
            one: group_thousands(limits.over[1]),
            two: group_thousands(limits.over[2]),
        },
    ];
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
    println!();

    println!("Tax brackets (refund estimate only)");
    let rows: Vec<BracketRow> = bracket_rows(&rules.tax_brackets);
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!();
}

fn bracket_rows(brackets: &[TaxBracket]) -> Vec<BracketRow> {
    let mut lower: Option<i64> = None;
    brackets
        .iter()
        .map(|b| {
            let band = match (lower, b.up_to) {
                (None, Some(upper)) => format!("<= {}", group_thousands(upper)),
                (Some(l), Some(upper)) => {
                    format!("{} - {}", group_thousands(l), group_thousands(upper))
                }
                (Some(l), None) => format!("> {}", group_thousands(l)),
                (None, None) => "all".to_string(),
            };
            lower = b.up_to;
            BracketRow {
                band,
                rate: format!("{:.0}%", b.rate * dec!(100)),
            }
        })
        .collect()
}
