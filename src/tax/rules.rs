use super::kr::TaxYear;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;

/// Amount in Korean won. Signed so that negative input can be rejected rather
/// than made unrepresentable at the parsing boundary.
pub type Won = i64;

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("invalid rule table JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be in (0, 1], got {value}")]
    RatioOutOfRange { field: String, value: Decimal },
    #[error("rule table has no categories")]
    NoCategories,
    #[error("category key must not be empty")]
    EmptyCategoryKey,
    #[error("duplicate category key: {0}")]
    DuplicateCategory(String),
    #[error("{field} must not be negative, got {value}")]
    NegativeAmount { field: String, value: Won },
    #[error("category '{key}' effective date {date} is outside tax year {year}")]
    EffectiveDateOutsideYear {
        key: String,
        date: NaiveDate,
        year: TaxYear,
    },
    #[error("rule table has no tax brackets")]
    NoTaxBrackets,
    #[error("tax bracket bounds must be strictly ascending: {previous} then {next}")]
    UnsortedTaxBrackets { previous: Won, next: Won },
    #[error("tax brackets need exactly one unbounded entry, in last position")]
    MisplacedUnboundedBracket,
    #[error("tax bracket rate must be in [0, 1], got {0}")]
    BracketRateOutOfRange(Decimal),
}

/// Income tier used for base limit lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeTier {
    /// Salary at or below the tier threshold
    Under,
    /// Salary above the tier threshold
    Over,
}

/// Deduction rule for one spending category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryRule {
    /// Category identifier, matching the spending input keys
    pub key: String,
    /// Display name
    #[serde(default)]
    pub label: Option<String>,
    /// Deduction rate in (0, 1]
    #[schemars(with = "f64")]
    pub rate: Decimal,
    /// Salary above which the category does not apply (none = unrestricted)
    #[serde(default)]
    pub income_limit: Option<Won>,
    /// Date from which the category applies within the year. Informational
    /// only, the calculator does not gate on it.
    #[serde(default)]
    pub effective_from: Option<NaiveDate>,
    /// Independent cap for the extra deduction past the general limit
    /// (0 = not eligible)
    #[serde(default)]
    pub extra_deduction_limit: Won,
}

impl CategoryRule {
    pub fn is_eligible(&self, total_salary: Won) -> bool {
        self.income_limit.is_none_or(|limit| total_salary <= limit)
    }

    pub fn has_extra_deduction(&self) -> bool {
        self.extra_deduction_limit > 0
    }

    /// Label if set, otherwise the key
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }

    /// Rate as a whole percentage, e.g. "30%"
    pub fn rate_display(&self) -> String {
        let pct = (self.rate * dec!(100))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .normalize();
        format!("{pct}%")
    }
}

/// General deduction limits, indexed by child count (0, 1, 2 or more)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BaseLimitTable {
    pub under: [Won; 3],
    pub over: [Won; 3],
}

impl BaseLimitTable {
    pub fn limit(&self, tier: IncomeTier, child_index: usize) -> Won {
        let row = match tier {
            IncomeTier::Under => &self.under,
            IncomeTier::Over => &self.over,
        };
        row[child_index.min(row.len() - 1)]
    }
}

/// Marginal income tax bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaxBracket {
    /// Upper bound of the bracket (none = top bracket)
    #[serde(default)]
    pub up_to: Option<Won>,
    #[schemars(with = "f64")]
    pub rate: Decimal,
}

/// Card deduction parameters for one tax year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RuleTable {
    pub year: TaxYear,
    /// Fraction of salary that spending must exceed before any deduction
    #[schemars(with = "f64")]
    pub threshold_rate: Decimal,
    /// Salary separating the under and over tiers
    pub income_tier_threshold: Won,
    /// Fraction of the base limit at which the stage becomes near-limit
    #[schemars(with = "f64")]
    pub near_limit_ratio: Decimal,
    /// Categories in the order they fill the threshold (lowest rate first)
    pub categories: Vec<CategoryRule>,
    pub base_limit_table: BaseLimitTable,
    /// Brackets ascending by bound, used for refund estimates only
    pub tax_brackets: Vec<TaxBracket>,
}

impl RuleTable {
    /// Parse a rule table from JSON and validate it
    pub fn from_json<R: Read>(reader: R) -> Result<RuleTable, RuleError> {
        let rules: RuleTable = serde_json::from_reader(reader)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        check_ratio("threshold_rate", self.threshold_rate)?;
        check_ratio("near_limit_ratio", self.near_limit_ratio)?;
        check_amount("income_tier_threshold", self.income_tier_threshold)?;

        for (i, limit) in self.base_limit_table.under.iter().enumerate() {
            check_amount(&format!("base_limit_table.under[{i}]"), *limit)?;
        }
        for (i, limit) in self.base_limit_table.over.iter().enumerate() {
            check_amount(&format!("base_limit_table.over[{i}]"), *limit)?;
        }

        self.validate_categories()?;
        self.validate_tax_brackets()
    }

    fn validate_categories(&self) -> Result<(), RuleError> {
        if self.categories.is_empty() {
            return Err(RuleError::NoCategories);
        }

        let mut seen = HashSet::new();
        for category in &self.categories {
            if category.key.is_empty() {
                return Err(RuleError::EmptyCategoryKey);
            }
            if !seen.insert(category.key.as_str()) {
                return Err(RuleError::DuplicateCategory(category.key.clone()));
            }
            check_ratio(&format!("{}.rate", category.key), category.rate)?;
            if let Some(limit) = category.income_limit {
                check_amount(&format!("{}.income_limit", category.key), limit)?;
            }
            check_amount(
                &format!("{}.extra_deduction_limit", category.key),
                category.extra_deduction_limit,
            )?;
            if let Some(date) = category.effective_from {
                if !self.year.contains(date) {
                    return Err(RuleError::EffectiveDateOutsideYear {
                        key: category.key.clone(),
                        date,
                        year: self.year,
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_tax_brackets(&self) -> Result<(), RuleError> {
        let (last, bounded) = self
            .tax_brackets
            .split_last()
            .ok_or(RuleError::NoTaxBrackets)?;

        if last.up_to.is_some() {
            return Err(RuleError::MisplacedUnboundedBracket);
        }

        let mut previous: Option<Won> = None;
        for bracket in bounded {
            let bound = bracket.up_to.ok_or(RuleError::MisplacedUnboundedBracket)?;
            if let Some(previous) = previous {
                if bound <= previous {
                    return Err(RuleError::UnsortedTaxBrackets {
                        previous,
                        next: bound,
                    });
                }
            }
            previous = Some(bound);
        }

        for bracket in &self.tax_brackets {
            if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE {
                return Err(RuleError::BracketRateOutOfRange(bracket.rate));
            }
        }
        Ok(())
    }

    pub fn tier(&self, total_salary: Won) -> IncomeTier {
        if total_salary <= self.income_tier_threshold {
            IncomeTier::Under
        } else {
            IncomeTier::Over
        }
    }

    pub fn base_limit(&self, total_salary: Won, number_of_children: usize) -> Won {
        self.base_limit_table
            .limit(self.tier(total_salary), number_of_children)
    }

    pub fn category(&self, key: &str) -> Option<&CategoryRule> {
        self.categories.iter().find(|c| c.key == key)
    }

    /// Rate of the first bracket whose bound covers `taxable`
    pub fn marginal_rate(&self, taxable: Won) -> Decimal {
        self.tax_brackets
            .iter()
            .find(|b| b.up_to.is_none_or(|bound| taxable <= bound))
            .map_or(Decimal::ZERO, |b| b.rate)
    }
}

fn check_ratio(field: &str, value: Decimal) -> Result<(), RuleError> {
    if value <= Decimal::ZERO || value > Decimal::ONE {
        return Err(RuleError::RatioOutOfRange {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

fn check_amount(field: &str, value: Won) -> Result<(), RuleError> {
    if value < 0 {
        return Err(RuleError::NegativeAmount {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::kr::rules_2025;

    #[test]
    fn rules_2025_are_valid() {
        rules_2025().validate().unwrap();
    }

    #[test]
    fn tier_boundary_is_inclusive() {
        let rules = rules_2025();
        assert_eq!(rules.tier(70_000_000), IncomeTier::Under);
        assert_eq!(rules.tier(70_000_001), IncomeTier::Over);
    }

    #[test]
    fn base_limit_caps_children_at_two() {
        let rules = rules_2025();
        assert_eq!(rules.base_limit(40_000_000, 0), 3_000_000);
        assert_eq!(rules.base_limit(40_000_000, 1), 3_500_000);
        assert_eq!(rules.base_limit(40_000_000, 2), 4_000_000);
        assert_eq!(rules.base_limit(40_000_000, 5), 4_000_000);
        assert_eq!(rules.base_limit(80_000_000, 0), 2_500_000);
        assert_eq!(rules.base_limit(80_000_000, 3), 3_000_000);
    }

    #[test]
    fn income_limited_category_eligibility() {
        let rules = rules_2025();
        let culture = rules.category("culture").unwrap();
        assert!(culture.is_eligible(70_000_000));
        assert!(!culture.is_eligible(70_000_001));

        let credit = rules.category("creditCard").unwrap();
        assert!(credit.is_eligible(1_000_000_000));
    }

    #[test]
    fn rate_display_is_whole_percent() {
        let rules = rules_2025();
        assert_eq!(rules.category("creditCard").unwrap().rate_display(), "15%");
        assert_eq!(rules.category("market").unwrap().rate_display(), "40%");

        let mut odd = rules.categories[0].clone();
        odd.rate = dec!(0.0875);
        assert_eq!(odd.rate_display(), "9%");
    }

    #[test]
    fn display_name_falls_back_to_key() {
        let mut category = rules_2025().categories[0].clone();
        assert_eq!(category.display_name(), "신용카드");
        category.label = None;
        assert_eq!(category.display_name(), "creditCard");
    }

    #[test]
    fn marginal_rate_by_bracket() {
        let rules = rules_2025();
        assert_eq!(rules.marginal_rate(0), dec!(0.06));
        assert_eq!(rules.marginal_rate(14_000_000), dec!(0.06));
        assert_eq!(rules.marginal_rate(14_000_001), dec!(0.15));
        assert_eq!(rules.marginal_rate(40_000_000), dec!(0.15));
        assert_eq!(rules.marginal_rate(150_000_000), dec!(0.35));
        assert_eq!(rules.marginal_rate(500_000_000), dec!(0.38));
    }

    #[test]
    fn rejects_rate_out_of_range() {
        let mut rules = rules_2025();
        rules.categories[1].rate = dec!(1.5);
        assert!(matches!(
            rules.validate(),
            Err(RuleError::RatioOutOfRange { ref field, .. }) if field == "checkCard.rate"
        ));

        let mut rules = rules_2025();
        rules.categories[0].rate = Decimal::ZERO;
        assert!(matches!(
            rules.validate(),
            Err(RuleError::RatioOutOfRange { .. })
        ));
    }

    #[test]
    fn accepts_rate_of_one() {
        let mut rules = rules_2025();
        rules.categories[0].rate = Decimal::ONE;
        rules.validate().unwrap();
    }

    #[test]
    fn rejects_threshold_rate_out_of_range() {
        let mut rules = rules_2025();
        rules.threshold_rate = dec!(-0.1);
        assert!(matches!(
            rules.validate(),
            Err(RuleError::RatioOutOfRange { ref field, .. }) if field == "threshold_rate"
        ));
    }

    #[test]
    fn rejects_empty_categories() {
        let mut rules = rules_2025();
        rules.categories.clear();
        assert!(matches!(rules.validate(), Err(RuleError::NoCategories)));
    }

    #[test]
    fn rejects_duplicate_category_keys() {
        let mut rules = rules_2025();
        let dup = rules.categories[0].clone();
        rules.categories.push(dup);
        assert!(matches!(
            rules.validate(),
            Err(RuleError::DuplicateCategory(ref key)) if key == "creditCard"
        ));
    }

    #[test]
    fn rejects_empty_category_key() {
        let mut rules = rules_2025();
        rules.categories[0].key = String::new();
        assert!(matches!(rules.validate(), Err(RuleError::EmptyCategoryKey)));
    }

    #[test]
    fn rejects_negative_limits() {
        let mut rules = rules_2025();
        rules.base_limit_table.over[2] = -1;
        assert!(matches!(
            rules.validate(),
            Err(RuleError::NegativeAmount { ref field, value: -1 })
                if field == "base_limit_table.over[2]"
        ));

        let mut rules = rules_2025();
        rules.categories[4].extra_deduction_limit = -5;
        assert!(matches!(
            rules.validate(),
            Err(RuleError::NegativeAmount { .. })
        ));
    }

    #[test]
    fn rejects_effective_date_outside_year() {
        let mut rules = rules_2025();
        rules.categories[3].effective_from = NaiveDate::from_ymd_opt(2026, 1, 1);
        assert!(matches!(
            rules.validate(),
            Err(RuleError::EffectiveDateOutsideYear { ref key, .. }) if key == "sports"
        ));
    }

    #[test]
    fn rejects_missing_tax_brackets() {
        let mut rules = rules_2025();
        rules.tax_brackets.clear();
        assert!(matches!(rules.validate(), Err(RuleError::NoTaxBrackets)));
    }

    #[test]
    fn rejects_bounded_last_bracket() {
        let mut rules = rules_2025();
        rules.tax_brackets.pop();
        assert!(matches!(
            rules.validate(),
            Err(RuleError::MisplacedUnboundedBracket)
        ));
    }

    #[test]
    fn rejects_unbounded_bracket_before_last() {
        let mut rules = rules_2025();
        rules.tax_brackets[1].up_to = None;
        assert!(matches!(
            rules.validate(),
            Err(RuleError::MisplacedUnboundedBracket)
        ));
    }

    #[test]
    fn rejects_unsorted_brackets() {
        let mut rules = rules_2025();
        rules.tax_brackets.swap(0, 1);
        assert!(matches!(
            rules.validate(),
            Err(RuleError::UnsortedTaxBrackets {
                previous: 50_000_000,
                next: 14_000_000
            })
        ));
    }

    #[test]
    fn rejects_bracket_rate_out_of_range() {
        let mut rules = rules_2025();
        rules.tax_brackets[4].rate = dec!(1.2);
        assert!(matches!(
            rules.validate(),
            Err(RuleError::BracketRateOutOfRange(_))
        ));
    }

    #[test]
    fn json_round_trip_preserves_category_order() {
        let rules = rules_2025();
        let json = serde_json::to_string(&rules).unwrap();
        let parsed = RuleTable::from_json(json.as_bytes()).unwrap();
        assert_eq!(parsed, rules);
    }

    #[test]
    fn from_json_accepts_numeric_rates() {
        let json = r#"{
            "year": 2025,
            "threshold_rate": 0.25,
            "income_tier_threshold": 70000000,
            "near_limit_ratio": 0.85,
            "categories": [
                { "key": "creditCard", "rate": 0.15 },
                { "key": "market", "rate": 0.4, "extra_deduction_limit": 1000000 }
            ],
            "base_limit_table": {
                "under": [3000000, 3500000, 4000000],
                "over": [2500000, 2750000, 3000000]
            },
            "tax_brackets": [
                { "up_to": 14000000, "rate": 0.06 },
                { "rate": 0.15 }
            ]
        }"#;

        let rules = RuleTable::from_json(json.as_bytes()).unwrap();
        assert_eq!(rules.threshold_rate, dec!(0.25));
        assert_eq!(rules.categories[1].rate, dec!(0.4));
        assert!(rules.categories[1].has_extra_deduction());
        assert_eq!(rules.categories[0].income_limit, None);
    }

    #[test]
    fn from_json_rejects_wrong_base_limit_length() {
        let mut value = serde_json::to_value(rules_2025()).unwrap();
        value["base_limit_table"]["under"] = serde_json::json!([1, 2]);
        let json = serde_json::to_string(&value).unwrap();
        assert!(matches!(
            RuleTable::from_json(json.as_bytes()),
            Err(RuleError::Parse(_))
        ));
    }

    #[test]
    fn from_json_validates() {
        let mut rules = rules_2025();
        rules.near_limit_ratio = dec!(2);
        let json = serde_json::to_string(&rules).unwrap();
        assert!(matches!(
            RuleTable::from_json(json.as_bytes()),
            Err(RuleError::RatioOutOfRange { .. })
        ));
    }
}
