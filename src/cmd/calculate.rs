//! Calculate command - card spending deduction for one salary and spending profile

use super::{parse_spend, read_spending, RuleSource};
use crate::utils::write_csv;
use anyhow::Context;
use cardtax::money::{format_krw, group_thousands};
use cardtax::tax::{
    calculate, estimate_refund, CalculationResult, RefundEstimate, RuleTable, SpendingInput,
    Stage, TaxYear, Won,
};
use clap::Args;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct CalculateCommand {
    /// Total annual salary (총급여) in won
    #[arg(short, long, value_parser = crate::utils::parse_won, allow_negative_numbers = true)]
    salary: Won,

    /// Number of dependent children
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    children: i32,

    #[command(flatten)]
    source: RuleSource,

    /// Spending for one category as KEY=AMOUNT, e.g. checkCard=15,000,000 (repeatable)
    #[arg(long = "spend", value_parser = parse_spend)]
    spend: Vec<(String, Won)>,

    /// JSON file of spending per category ("-" for stdin). --spend overrides its entries.
    #[arg(long)]
    spending: Option<PathBuf>,

    /// Output as JSON instead of formatted text
    #[arg(long, conflicts_with = "csv")]
    json: bool,

    /// Output the per-category breakdown as CSV
    #[arg(long)]
    csv: bool,
}

/// Full result for JSON output
#[derive(Debug, Serialize)]
struct CalculationOutput<'a> {
    tax_year: TaxYear,
    total_salary: Won,
    number_of_children: i32,
    #[serde(flatten)]
    result: &'a CalculationResult,
    estimated_refund: RefundEstimate,
}

#[derive(Debug, Serialize)]
struct BreakdownRecord {
    key: String,
    label: String,
    rate: String,
    usage: Won,
    deductible: Won,
    deduction: Won,
    extra_deduction: Option<Won>,
}

#[derive(Debug, Clone, Tabled)]
struct BreakdownRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Spending")]
    usage: String,
    #[tabled(rename = "Deductible")]
    deductible: String,
    #[tabled(rename = "Deduction")]
    deduction: String,
    #[tabled(rename = "Extra")]
    extra: String,
}

impl CalculateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let rules = self.source.load()?;
        let usage = self.spending_input()?;

        let result = calculate(self.salary, &usage, self.children, &rules)
            .context("cannot calculate deduction")?;
        let refund = estimate_refund(result.final_deduction, self.salary, &rules);

        if self.json {
            self.print_json(&rules, &result, refund)
        } else if self.csv {
            write_csv(breakdown_records(&rules, &result), io::stdout())
        } else {
            self.print_summary(&rules, &result, refund);
            Ok(())
        }
    }

    fn spending_input(&self) -> anyhow::Result<SpendingInput> {
        let mut usage = match &self.spending {
            Some(path) => read_spending(path)?,
            None => SpendingInput::new(),
        };
        for (key, amount) in &self.spend {
            usage.insert(key.clone(), *amount);
        }
        Ok(usage)
    }

    fn print_summary(&self, rules: &RuleTable, result: &CalculationResult, refund: RefundEstimate) {
        println!();
        println!(
            "CARD DEDUCTION ({}) - salary {}, {} child(ren)",
            rules.year,
            format_krw(self.salary),
            self.children
        );
        println!();
        println!(
            "  Threshold: {} | Spending: {} | Stage: {}",
            format_krw(result.threshold),
            format_krw(result.total_usage),
            result.stage.display()
        );

        if result.stage == Stage::UnderThreshold {
            println!(
                "  {} more spending needed before any deduction applies",
                format_krw(result.threshold_gap)
            );
            println!();
            println!("FINAL DEDUCTION: {}", format_krw(0));
            println!();
            return;
        }
        println!();

        let rows: Vec<BreakdownRow> = rules
            .categories
            .iter()
            .zip(&result.breakdown)
            .map(|(category, line)| BreakdownRow {
                category: category.display_name().to_string(),
                rate: category.rate_display(),
                usage: group_thousands(line.usage),
                deductible: group_thousands(line.deductible),
                deduction: group_thousands(line.deduction),
                extra: result
                    .extra_deduction_for(&category.key)
                    .map_or("-".to_string(), group_thousands),
            })
            .collect();

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        println!();

        println!(
            "  General: {} (limit {}, remaining {})",
            format_krw(result.general_deduction),
            format_krw(result.base_limit),
            format_krw(result.limit_remaining)
        );
        if result.extra_deduction > 0 {
            println!("  Extra: +{}", format_krw(result.extra_deduction));
        } else {
            println!("  Extra: -");
        }
        println!();
        println!("FINAL DEDUCTION: {}", format_krw(result.final_deduction));
        println!(
            "Estimated refund @ {:.0}%: ~{}",
            refund.marginal_rate * dec!(100),
            format_krw(refund.amount)
        );
        println!();
    }

    fn print_json(
        &self,
        rules: &RuleTable,
        result: &CalculationResult,
        refund: RefundEstimate,
    ) -> anyhow::Result<()> {
        let output = CalculationOutput {
            tax_year: rules.year,
            total_salary: self.salary,
            number_of_children: self.children,
            result,
            estimated_refund: refund,
        };

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

fn breakdown_records(rules: &RuleTable, result: &CalculationResult) -> Vec<BreakdownRecord> {
    rules
        .categories
        .iter()
        .zip(&result.breakdown)
        .map(|(category, line)| BreakdownRecord {
            key: category.key.clone(),
            label: category.display_name().to_string(),
            rate: category.rate_display(),
            usage: line.usage,
            deductible: line.deductible,
            deduction: line.deduction,
            extra_deduction: result.extra_deduction_for(&category.key),
        })
        .collect()
}
