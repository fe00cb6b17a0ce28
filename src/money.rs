use crate::tax::Won;

const EOK: Won = 100_000_000;
const MAN: Won = 10_000;

/// Format an amount in won using 억 and 만 units, e.g. `1억 2,345만 원`.
///
/// Remainders below the displayed unit are truncated, never rounded.
pub fn format_krw(amount: Won) -> String {
    if amount >= EOK {
        let eok = amount / EOK;
        let man = (amount % EOK) / MAN;
        if man > 0 {
            format!("{}억 {}만 원", eok, group_thousands(man))
        } else {
            format!("{}억 원", eok)
        }
    } else if amount >= MAN {
        format!("{}만 원", group_thousands(amount / MAN))
    } else {
        format!("{}원", group_thousands(amount))
    }
}

/// Digits with comma thousands separators, e.g. `1,234,567`
pub fn group_thousands(amount: Won) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        grouped.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
