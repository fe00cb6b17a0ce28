//! Schema command - print expected input formats

use cardtax::tax::{RuleTable, SpendingInput};
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Which input format to describe
    #[arg(value_enum, default_value = "rules")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for a rule table file (--rules)
    Rules,
    /// JSON Schema for a spending file (--spending)
    Spending,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let schema = match self.format {
            SchemaFormat::Rules => schema_for!(RuleTable),
            SchemaFormat::Spending => schema_for!(SpendingInput),
        };
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_table_schema_lists_categories() {
        let schema = serde_json::to_value(schema_for!(RuleTable)).unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("categories").is_some());
        assert!(properties.get("tax_brackets").is_some());
        assert_eq!(properties["threshold_rate"]["type"], "number");
    }
}
