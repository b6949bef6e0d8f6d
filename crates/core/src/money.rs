//! Amount/currency types and Argentine number-format parsing (§3, §4.1).
//!
//! Amounts are tracked as integer cents to avoid floating-point drift; the
//! spec's "2 fractional digits, +-0.01 epsilon" invariant becomes exact
//! integer comparison once the value lives in minor units.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    ARS,
    USD,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ARS => write!(f, "ARS"),
            Self::USD => write!(f, "USD"),
        }
    }
}

/// A decimal amount, stored as integer minor units (cents) to keep all
/// comparisons exact. Display/Serialize render as a 2-decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount {
    cents: i64,
}

impl Amount {
    pub const ZERO: Amount = Amount { cents: 0 };

    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    pub fn as_f64(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    /// Absolute difference between two amounts, in cents.
    pub fn diff_cents(&self, other: &Amount) -> i64 {
        (self.cents - other.cents).abs()
    }

    /// True if the two amounts are equal within `epsilon_cents` (default 1,
    /// i.e. 1 minor-currency unit, per §3).
    pub fn approx_eq(&self, other: &Amount, epsilon_cents: i64) -> bool {
        self.diff_cents(other) <= epsilon_cents
    }

    pub fn checked_add(&self, other: &Amount) -> Amount {
        Amount::from_cents(self.cents + other.cents)
    }

    pub fn checked_sub(&self, other: &Amount) -> Amount {
        Amount::from_cents(self.cents - other.cents)
    }

    /// Scale by a ratio (used for cross-currency conversion via exchange rate).
    pub fn scaled(&self, ratio: f64) -> Amount {
        Amount::from_cents((self.cents as f64 * ratio).round() as i64)
    }

    /// Percentage band check: is `other` within `pct` percent of `self`?
    pub fn within_percent(&self, other: &Amount, pct: f64) -> bool {
        if self.cents == 0 {
            return other.cents == 0;
        }
        let band = (self.cents as f64).abs() * (pct / 100.0);
        (self.cents - other.cents).abs() as f64 <= band
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.cents < 0;
        let abs = self.cents.unsigned_abs();
        let whole = abs / 100;
        let frac = abs % 100;
        write!(f, "{}{}.{:02}", if negative { "-" } else { "" }, whole, frac)
    }
}

impl TryFrom<String> for Amount {
    type Error = CoreError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_amount(&value)
    }
}

impl From<Amount> for String {
    fn from(value: Amount) -> Self {
        value.to_string()
    }
}

/// Parse an Argentine-formatted amount: `.` is the thousands separator, `,`
/// is the fractional marker. `formatAmount(parseAmount(s)) == s`-normalized
/// for any 2-fractional-digit input (§4.1, §8).
///
/// Ambiguous inputs are rejected: the comma must be present to mark a
/// fractional part, otherwise a trailing `.ddd` group is read as thousands,
/// never as decimals.
pub fn parse_amount(s: &str) -> Result<Amount, CoreError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(CoreError::AmountParse(s.to_string()));
    }
    let negative = s.starts_with('-');
    let body = s.strip_prefix('-').unwrap_or(s);

    let (int_part, frac_part) = match body.rfind(',') {
        Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
        None => (body, None),
    };

    if int_part.is_empty() {
        return Err(CoreError::AmountParse(s.to_string()));
    }

    // Integer part may contain '.' thousands separators: every group after
    // the first must be exactly 3 digits.
    let groups: Vec<&str> = int_part.split('.').collect();
    for (i, g) in groups.iter().enumerate() {
        if g.is_empty() || !g.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoreError::AmountParse(s.to_string()));
        }
        if i > 0 && g.len() != 3 {
            return Err(CoreError::AmountParse(s.to_string()));
        }
    }
    let whole: i64 = groups
        .concat()
        .parse()
        .map_err(|_| CoreError::AmountParse(s.to_string()))?;

    let cents: i64 = match frac_part {
        None => 0,
        Some(f) if f.len() == 2 && f.chars().all(|c| c.is_ascii_digit()) => {
            f.parse().map_err(|_| CoreError::AmountParse(s.to_string()))?
        }
        Some(f) if f.len() == 1 && f.chars().all(|c| c.is_ascii_digit()) => {
            f.parse::<i64>().map_err(|_| CoreError::AmountParse(s.to_string()))? * 10
        }
        _ => return Err(CoreError::AmountParse(s.to_string())),
    };

    let total = whole * 100 + cents;
    Ok(Amount::from_cents(if negative { -total } else { total }))
}

/// Render an amount in Argentine format: `.` thousands, `,` decimal.
pub fn format_amount(amount: &Amount) -> String {
    let negative = amount.cents() < 0;
    let abs = amount.cents().unsigned_abs();
    let whole = abs / 100;
    let frac = abs % 100;

    let whole_str = whole.to_string();
    let mut grouped = String::new();
    for (i, ch) in whole_str.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let grouped: String = grouped.chars().rev().collect();

    format!("{}{},{:02}", if negative { "-" } else { "" }, grouped, frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_thousands_and_decimal() {
        let a = parse_amount("2.917.310,00").unwrap();
        assert_eq!(a.cents(), 291_731_000);
    }

    #[test]
    fn parse_small_amount_no_thousands() {
        assert_eq!(parse_amount("100,00").unwrap().cents(), 10_000);
        assert_eq!(parse_amount("100").unwrap().cents(), 10_000);
    }

    #[test]
    fn parse_single_fractional_digit() {
        assert_eq!(parse_amount("10,5").unwrap().cents(), 1_050);
    }

    #[test]
    fn parse_negative() {
        assert_eq!(parse_amount("-500,25").unwrap().cents(), -50_025);
    }

    #[test]
    fn reject_malformed_thousands_group() {
        assert!(parse_amount("2.91,00").is_err());
    }

    #[test]
    fn reject_garbage() {
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("").is_err());
    }

    #[test]
    fn format_roundtrip() {
        for raw in ["2.917.310,00", "100,00", "0,01", "-500,25", "10,50"] {
            let parsed = parse_amount(raw).unwrap();
            let formatted = format_amount(&parsed);
            let reparsed = parse_amount(&formatted).unwrap();
            assert_eq!(parsed, reparsed, "round-trip failed for {raw}");
        }
    }

    #[test]
    fn approx_eq_epsilon() {
        let a = Amount::from_cents(10000);
        let b = Amount::from_cents(10001);
        assert!(a.approx_eq(&b, 1));
        assert!(!a.approx_eq(&b, 0));
    }

    #[test]
    fn within_percent_band() {
        let invoice = Amount::from_cents(10_000_00); // 10000.00
        let converted = Amount::from_cents(10_400_00); // within 5%
        assert!(invoice.within_percent(&converted, 5.0));
        let too_far = Amount::from_cents(10_600_00);
        assert!(!invoice.within_percent(&too_far, 5.0));
    }
}
