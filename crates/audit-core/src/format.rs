//! Currency and identifier formatting for display

use audit_model::Amount;
use serde::{Deserialize, Serialize};

/// Digit grouping convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigitGrouping {
    /// `12,34,567` (lakh / crore)
    #[default]
    Indian,
    /// `1,234,567`
    Western,
}

/// Currency formatter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormat {
    symbol: String,
    grouping: DigitGrouping,
}

impl CurrencyFormat {
    /// Create formatter
    #[inline]
    #[must_use]
    pub fn new(symbol: impl Into<String>, grouping: DigitGrouping) -> Self {
        Self {
            symbol: symbol.into(),
            grouping,
        }
    }

    /// Format an amount: symbol, grouped integer part, up to two decimals
    #[must_use]
    pub fn format(&self, amount: Amount) -> String {
        self.format_value(amount.value())
    }

    /// Format a raw non-negative value
    #[must_use]
    pub fn format_value(&self, value: f64) -> String {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let paise = (value.max(0.0) * 100.0).round() as u64;
        let rupees = paise / 100;
        let fraction = paise % 100;

        let mut out = String::with_capacity(self.symbol.len() + 24);
        out.push_str(&self.symbol);
        out.push_str(&group_digits(&rupees.to_string(), self.grouping));
        match fraction {
            0 => {}
            f if f % 10 == 0 => out.push_str(&format!(".{}", f / 10)),
            f => out.push_str(&format!(".{f:02}")),
        }
        out
    }
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self::new("₹", DigitGrouping::Indian)
    }
}

/// Insert thousands separators into a run of ASCII digits
fn group_digits(digits: &str, grouping: DigitGrouping) -> String {
    let len = digits.len();
    if len <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(len - 3);
    let step = match grouping {
        DigitGrouping::Indian => 2,
        DigitGrouping::Western => 3,
    };

    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(step);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    groups.push(tail);
    groups.join(",")
}

/// Shorten an identifier for compact display
///
/// Keeps the first `max_chars` characters and always appends `ellipsis`.
#[must_use]
pub fn shorten_id(id: &str, max_chars: usize, ellipsis: &str) -> String {
    let mut out: String = id.chars().take(max_chars).collect();
    out.push_str(ellipsis);
    out
}
