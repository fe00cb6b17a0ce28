use super::deduction::apply_rate;
use super::rules::{RuleTable, Won};
use rust_decimal::Decimal;
use serde::Serialize;

/// Rough tax saving from a deduction at the marginal rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefundEstimate {
    pub marginal_rate: Decimal,
    pub amount: Won,
}

/// Estimate the refund a deduction yields.
///
/// Salary stands in for the tax base: earned income deduction, personal
/// allowances and credits are ignored, so this is indicative only.
pub fn estimate_refund(final_deduction: Won, total_salary: Won, rules: &RuleTable) -> RefundEstimate {
    let marginal_rate = rules.marginal_rate(total_salary);
    RefundEstimate {
        marginal_rate,
        amount: apply_rate(final_deduction.max(0), marginal_rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::kr::rules_2025;
    use rust_decimal_macros::dec;

    #[test]
    fn refund_at_marginal_rate() {
        let rules = rules_2025();
        let estimate = estimate_refund(1_500_000, 40_000_000, &rules);
        assert_eq!(estimate.marginal_rate, dec!(0.15));
        assert_eq!(estimate.amount, 225_000);
    }

    #[test]
    fn refund_uses_top_bracket_above_last_bound() {
        let rules = rules_2025();
        let estimate = estimate_refund(3_000_000, 200_000_000, &rules);
        assert_eq!(estimate.marginal_rate, dec!(0.38));
        assert_eq!(estimate.amount, 1_140_000);
    }

    #[test]
    fn refund_floors() {
        let rules = rules_2025();
        let estimate = estimate_refund(333, 10_000_000, &rules);
        assert_eq!(estimate.marginal_rate, dec!(0.06));
        assert_eq!(estimate.amount, 19);
    }

    #[test]
    fn no_deduction_no_refund() {
        let rules = rules_2025();
        assert_eq!(estimate_refund(0, 60_000_000, &rules).amount, 0);
    }
}
