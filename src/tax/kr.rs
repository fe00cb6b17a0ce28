use super::rules::{BaseLimitTable, CategoryRule, RuleTable, TaxBracket, Won};
use chrono::{Datelike, NaiveDate};
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Korean tax year (귀속 연도), which follows the calendar year.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct TaxYear(pub i32);

impl TaxYear {
    /// Newest year with a built-in rule table
    pub const LATEST: TaxYear = TaxYear(2025);

    pub fn from_date(date: NaiveDate) -> Self {
        TaxYear(date.year())
    }

    /// 1 January of the tax year
    pub fn start_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.0, 1, 1)
    }

    /// 31 December of the tax year
    pub fn end_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.0, 12, 31)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::from_date(date) == *self
    }

    /// Built-in rule table for this year, if one exists.
    ///
    /// Each year is a standalone table; a new year is added by writing a new
    /// constructor and a match arm here.
    pub fn rules(&self) -> Option<RuleTable> {
        match self.0 {
            2025 => Some(rules_2025()),
            _ => None,
        }
    }

    /// Years with a built-in rule table, oldest first
    pub fn supported() -> &'static [TaxYear] {
        &[TaxYear(2025)]
    }
}

impl std::fmt::Display for TaxYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

const SEVENTY_MILLION: Won = 70_000_000;

/// 2025 card deduction rules (조세특례제한법 제126조의2, 2025 amendment)
pub fn rules_2025() -> RuleTable {
    RuleTable {
        year: TaxYear(2025),
        threshold_rate: dec!(0.25),
        income_tier_threshold: SEVENTY_MILLION,
        near_limit_ratio: dec!(0.85),
        // floor-fill priority: lowest rate first
        categories: vec![
            CategoryRule {
                key: "creditCard".to_string(),
                label: Some("신용카드".to_string()),
                rate: dec!(0.15),
                income_limit: None,
                effective_from: None,
                extra_deduction_limit: 0,
            },
            CategoryRule {
                key: "checkCard".to_string(),
                label: Some("체크카드·현금영수증".to_string()),
                rate: dec!(0.30),
                income_limit: None,
                effective_from: None,
                extra_deduction_limit: 0,
            },
            CategoryRule {
                key: "culture".to_string(),
                label: Some("도서·공연·박물관·영화".to_string()),
                rate: dec!(0.30),
                income_limit: Some(SEVENTY_MILLION),
                effective_from: None,
                extra_deduction_limit: 0,
            },
            CategoryRule {
                key: "sports".to_string(),
                label: Some("헬스장·수영장".to_string()),
                rate: dec!(0.30),
                income_limit: Some(SEVENTY_MILLION),
                // facilities registered as culture businesses, from July
                effective_from: NaiveDate::from_ymd_opt(2025, 7, 1),
                extra_deduction_limit: 0,
            },
            CategoryRule {
                key: "market".to_string(),
                label: Some("전통시장".to_string()),
                rate: dec!(0.40),
                income_limit: None,
                effective_from: None,
                extra_deduction_limit: 1_000_000,
            },
            CategoryRule {
                key: "transport".to_string(),
                label: Some("대중교통".to_string()),
                rate: dec!(0.40),
                income_limit: None,
                effective_from: None,
                extra_deduction_limit: 1_000_000,
            },
        ],
        base_limit_table: BaseLimitTable {
            under: [3_000_000, 3_500_000, 4_000_000],
            over: [2_500_000, 2_750_000, 3_000_000],
        },
        // 소득세법 제55조 basic rates, used for refund estimates only
        tax_brackets: vec![
            TaxBracket {
                up_to: Some(14_000_000),
                rate: dec!(0.06),
            },
            TaxBracket {
                up_to: Some(50_000_000),
                rate: dec!(0.15),
            },
            TaxBracket {
                up_to: Some(88_000_000),
                rate: dec!(0.24),
            },
            TaxBracket {
                up_to: Some(150_000_000),
                rate: dec!(0.35),
            },
            TaxBracket {
                up_to: None,
                rate: dec!(0.38),
            },
        ],
    }
}
