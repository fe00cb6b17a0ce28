//! Korean card spending income deduction (연말정산 신용카드 등 소득공제) estimator

pub mod money;
pub mod tax;
