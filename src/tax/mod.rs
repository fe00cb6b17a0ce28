pub mod deduction;
pub mod kr;
pub mod refund;
pub mod rules;

pub use deduction::{
    calculate, CalculationError, CalculationResult, CategoryDeduction, ExtraDeduction,
    SpendingInput, Stage,
};
pub use kr::TaxYear;
pub use refund::{estimate_refund, RefundEstimate};
pub use rules::{BaseLimitTable, CategoryRule, IncomeTier, RuleError, RuleTable, TaxBracket, Won};
