//! Card spending deduction (신용카드 등 소득공제) calculation

use super::rules::{CategoryRule, RuleTable, Won};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Spending per category key. Missing keys count as zero.
pub type SpendingInput = BTreeMap<String, Won>;

/// Children beyond this count do not raise the base limit further
const MAX_CHILD_INDEX: i32 = 2;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CalculationError {
    #[error("total salary must not be negative: {0}")]
    NegativeSalary(Won),
    #[error("number of children must not be negative: {0}")]
    NegativeChildren(i32),
    #[error("spending for '{key}' must not be negative: {amount}")]
    NegativeUsage { key: String, amount: Won },
    #[error("unknown spending category: {0}")]
    UnknownCategory(String),
    #[error("total spending overflows")]
    UsageOverflow,
}

/// Progress towards the deduction limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// Spending has not exceeded the minimum-usage threshold
    UnderThreshold,
    /// Past the threshold, deduction accumulating
    OverThreshold,
    /// Deduction close to or past the general limit
    NearLimit,
}

impl Stage {
    pub fn display(&self) -> &'static str {
        match self {
            Stage::UnderThreshold => "under threshold",
            Stage::OverThreshold => "over threshold",
            Stage::NearLimit => "near limit",
        }
    }
}

/// Per-category line of the deduction breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDeduction {
    pub key: String,
    /// Spending after the income eligibility filter
    pub usage: Won,
    /// Spending left after filling the threshold
    pub deductible: Won,
    /// Deductible amount with the category rate applied
    pub deduction: Won,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtraDeduction {
    pub key: String,
    pub amount: Won,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalculationResult {
    /// Minimum usage (salary x threshold rate)
    pub threshold: Won,
    /// Eligible spending across all categories
    pub total_usage: Won,
    pub stage: Stage,
    /// Spending still needed to reach the threshold (0 once past it)
    pub threshold_gap: Won,
    /// Sum of per-category deductions before the general limit
    pub potential_deduction: Won,
    /// `potential_deduction` capped at `base_limit`
    pub general_deduction: Won,
    pub extra_deduction: Won,
    /// Bonus-eligible categories, in rule order. Empty unless the general
    /// limit was exceeded.
    pub extra_deduction_breakdown: Vec<ExtraDeduction>,
    pub final_deduction: Won,
    pub base_limit: Won,
    pub limit_remaining: Won,
    /// Every category, in rule order
    pub breakdown: Vec<CategoryDeduction>,
}

impl CalculationResult {
    /// Deduction for a category after the rate, before any limit
    pub fn deduction(&self, key: &str) -> Option<Won> {
        self.breakdown
            .iter()
            .find(|line| line.key == key)
            .map(|line| line.deduction)
    }

    pub fn extra_deduction_for(&self, key: &str) -> Option<Won> {
        self.extra_deduction_breakdown
            .iter()
            .find(|extra| extra.key == key)
            .map(|extra| extra.amount)
    }
}

/// Calculate the card spending deduction.
///
/// Spending fills the threshold in rule-table order before any of it becomes
/// deductible, so lower-rate categories listed first absorb the threshold and
/// higher-rate spending is kept for the deduction itself.
pub fn calculate(
    total_salary: Won,
    usage: &SpendingInput,
    number_of_children: i32,
    rules: &RuleTable,
) -> Result<CalculationResult, CalculationError> {
    validate_inputs(total_salary, usage, number_of_children, rules)?;

    let threshold = apply_rate(total_salary, rules.threshold_rate);
    let child_index = number_of_children.min(MAX_CHILD_INDEX) as usize;
    let tier = rules.tier(total_salary);
    let base_limit = rules.base_limit_table.limit(tier, child_index);
    log::debug!(
        "Salary {}: threshold {}, tier {:?}, base limit {}",
        total_salary,
        threshold,
        tier,
        base_limit
    );

    // Re-applied here whatever the caller already filtered
    let eligible: Vec<(&CategoryRule, Won)> = rules
        .categories
        .iter()
        .map(|category| {
            let amount = usage.get(&category.key).copied().unwrap_or(0);
            if let Some(date) = category.effective_from {
                log::debug!("{} applies from {} (not date-gated)", category.key, date);
            }
            if category.is_eligible(total_salary) {
                (category, amount)
            } else {
                if amount > 0 {
                    log::debug!(
                        "Ignoring {} spending {}: salary above income limit",
                        category.key,
                        amount
                    );
                }
                (category, 0)
            }
        })
        .collect();

    let total_usage = eligible
        .iter()
        .try_fold(0 as Won, |sum, (_, amount)| sum.checked_add(*amount))
        .ok_or(CalculationError::UsageOverflow)?;

    if total_usage <= threshold {
        return Ok(CalculationResult {
            threshold,
            total_usage,
            stage: Stage::UnderThreshold,
            threshold_gap: threshold - total_usage,
            potential_deduction: 0,
            general_deduction: 0,
            extra_deduction: 0,
            extra_deduction_breakdown: Vec::new(),
            final_deduction: 0,
            base_limit,
            limit_remaining: base_limit,
            breakdown: eligible
                .iter()
                .map(|(category, amount)| CategoryDeduction {
                    key: category.key.clone(),
                    usage: *amount,
                    deductible: 0,
                    deduction: 0,
                })
                .collect(),
        });
    }

    let mut remaining = threshold;
    let breakdown: Vec<CategoryDeduction> = eligible
        .iter()
        .map(|(category, amount)| {
            let consumed = (*amount).min(remaining);
            let deductible = amount - consumed;
            remaining -= consumed;
            let deduction = apply_rate(deductible, category.rate);
            log::debug!(
                "{}: usage {}, threshold consumed {}, deductible {}, deduction {} @ {}",
                category.key,
                amount,
                consumed,
                deductible,
                deduction,
                category.rate
            );
            CategoryDeduction {
                key: category.key.clone(),
                usage: *amount,
                deductible,
                deduction,
            }
        })
        .collect();

    let potential_deduction: Won = breakdown.iter().map(|line| line.deduction).sum();
    let general_deduction = potential_deduction.min(base_limit);
    let limit_remaining = (base_limit - potential_deduction).max(0);

    let extra_deduction_breakdown: Vec<ExtraDeduction> = if potential_deduction > base_limit {
        rules
            .categories
            .iter()
            .zip(&breakdown)
            .filter(|(category, _)| category.has_extra_deduction())
            .map(|(category, line)| ExtraDeduction {
                key: category.key.clone(),
                amount: line.deduction.min(category.extra_deduction_limit),
            })
            .collect()
    } else {
        Vec::new()
    };
    let extra_deduction: Won = extra_deduction_breakdown.iter().map(|e| e.amount).sum();

    let final_deduction = general_deduction + extra_deduction;

    let stage = if Decimal::from(potential_deduction)
        >= Decimal::from(base_limit) * rules.near_limit_ratio
    {
        Stage::NearLimit
    } else {
        Stage::OverThreshold
    };

    Ok(CalculationResult {
        threshold,
        total_usage,
        stage,
        threshold_gap: 0,
        potential_deduction,
        general_deduction,
        extra_deduction,
        extra_deduction_breakdown,
        final_deduction,
        base_limit,
        limit_remaining,
        breakdown,
    })
}

fn validate_inputs(
    total_salary: Won,
    usage: &SpendingInput,
    number_of_children: i32,
    rules: &RuleTable,
) -> Result<(), CalculationError> {
    if total_salary < 0 {
        return Err(CalculationError::NegativeSalary(total_salary));
    }
    if number_of_children < 0 {
        return Err(CalculationError::NegativeChildren(number_of_children));
    }
    for (key, amount) in usage {
        if rules.category(key).is_none() {
            return Err(CalculationError::UnknownCategory(key.clone()));
        }
        if *amount < 0 {
            return Err(CalculationError::NegativeUsage {
                key: key.clone(),
                amount: *amount,
            });
        }
    }
    Ok(())
}

/// `floor(amount * rate)`. Rates are validated into (0, 1] so the product
/// never exceeds `amount`.
pub(crate) fn apply_rate(amount: Won, rate: Decimal) -> Won {
    (Decimal::from(amount) * rate)
        .floor()
        .to_i64()
        .unwrap_or(amount)
}
