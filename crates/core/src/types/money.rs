//! Money amounts in minor currency units and Shopify-style formatting.
//!
//! The storefront AJAX API, theme data attributes and the browser-side
//! `Shopify.formatMoney` helper all work in integer cents. Arithmetic that can
//! produce fractional cents (percent discounts) goes through [`Decimal`] and is
//! rounded half away from zero, matching `Number.prototype.toFixed`.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul, Sub};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount of money in minor units (e.g. cents for USD).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create an amount from minor units.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Create an amount from major units (e.g. dollars), rounding to cents.
    #[must_use]
    pub fn from_major(amount: Decimal) -> Self {
        Self::from_decimal_cents(amount * Decimal::ONE_HUNDRED)
    }

    /// Amount in minor units.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Amount in major units, exact.
    #[must_use]
    pub fn to_major(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// The given percentage of this amount, rounded to whole cents.
    #[must_use]
    pub fn percent_of(self, percent: Decimal) -> Self {
        Self::from_decimal_cents(Decimal::from(self.0) * percent / Decimal::ONE_HUNDRED)
    }

    /// This amount reduced by `percent` percent.
    #[must_use]
    pub fn discounted(self, percent: Decimal) -> Self {
        self - self.percent_of(percent)
    }

    fn from_decimal_cents(cents: Decimal) -> Self {
        let rounded = cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Self(rounded.to_i64().unwrap_or(i64::MAX))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self::Output {
        Self(self.0.saturating_mul(i64::from(rhs)))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_major())
    }
}

/// A shop money format such as `"${{amount}}"` or `"{{amount_with_comma_separator}} €"`.
///
/// Supports the placeholders understood by the theme's `formatMoney` helper:
/// `amount`, `amount_no_decimals`, `amount_with_comma_separator`,
/// `amount_no_decimals_with_comma_separator` and
/// `amount_with_apostrophe_separator`. Unknown placeholders render as an
/// empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoneyFormat(String);

impl Default for MoneyFormat {
    fn default() -> Self {
        Self("${{amount}}".to_owned())
    }
}

impl MoneyFormat {
    /// Create a money format from a shop format string.
    #[must_use]
    pub fn new(format: impl Into<String>) -> Self {
        Self(format.into())
    }

    /// Returns the raw format string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Format an amount, e.g. `Money::from_cents(123456)` → `"$1,234.56"`.
    #[must_use]
    pub fn format(&self, money: Money) -> String {
        let Some((start, end, name)) = find_placeholder(&self.0) else {
            return self.0.clone();
        };

        let value = match name {
            "amount" => with_delimiters(money, 2, ",", "."),
            "amount_no_decimals" => with_delimiters(money, 0, ",", "."),
            "amount_with_comma_separator" => with_delimiters(money, 2, ".", ","),
            "amount_no_decimals_with_comma_separator" => with_delimiters(money, 0, ".", ","),
            "amount_with_apostrophe_separator" => with_delimiters(money, 2, "'", "."),
            _ => String::new(),
        };

        let mut out = String::with_capacity(self.0.len() + value.len());
        out.push_str(self.0.get(..start).unwrap_or_default());
        out.push_str(&value);
        out.push_str(self.0.get(end..).unwrap_or_default());
        out
    }
}

/// Locate the first `{{ name }}` placeholder, returning its byte span and name.
fn find_placeholder(format: &str) -> Option<(usize, usize, &str)> {
    let start = format.find("{{")?;
    let rest = format.get(start + 2..)?;
    let close = rest.find("}}")?;
    let name = rest.get(..close)?.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((start, start + 2 + close + 2, name))
}

fn with_delimiters(money: Money, precision: u32, thousands: &str, decimal: &str) -> String {
    let amount = money
        .to_major()
        .round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
    let negative = amount.is_sign_negative() && !amount.is_zero();
    let fixed = format!("{:.*}", precision as usize, amount.abs());

    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let digits: Vec<char> = whole.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push_str(thousands);
        }
        grouped.push(*digit);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !fraction.is_empty() {
        out.push_str(decimal);
        out.push_str(fraction);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_format() {
        let format = MoneyFormat::default();
        assert_eq!(format.format(Money::from_cents(1999)), "$19.99");
        assert_eq!(format.format(Money::from_cents(0)), "$0.00");
        assert_eq!(format.format(Money::from_cents(123_456_789)), "$1,234,567.89");
    }

    #[test]
    fn test_comma_separator_format() {
        let format = MoneyFormat::new("{{amount_with_comma_separator}} €");
        assert_eq!(format.format(Money::from_cents(123_456)), "1.234,56 €");
    }

    #[test]
    fn test_no_decimals_format() {
        let format = MoneyFormat::new("£{{ amount_no_decimals }}");
        assert_eq!(format.format(Money::from_cents(1_250_050)), "£12,501");
    }

    #[test]
    fn test_format_without_placeholder_is_verbatim() {
        let format = MoneyFormat::new("free");
        assert_eq!(format.format(Money::from_cents(100)), "free");
    }

    #[test]
    fn test_negative_amount() {
        let format = MoneyFormat::default();
        assert_eq!(format.format(Money::from_cents(-2500)), "$-25.00");
    }

    #[test]
    fn test_percent_of_rounds_half_away_from_zero() {
        // 15% of $0.10 = 1.5 cents
        assert_eq!(Money::from_cents(10).percent_of(Decimal::from(15)), Money::from_cents(2));
        assert_eq!(Money::from_cents(4000).discounted(Decimal::from(10)), Money::from_cents(3600));
    }

    #[test]
    fn test_from_major() {
        assert_eq!(Money::from_major(Decimal::from(20)), Money::from_cents(2000));
        assert_eq!(Money::from_major(Decimal::new(1999, 2)), Money::from_cents(1999));
    }

    #[test]
    fn test_sum_and_mul() {
        let total: Money = [Money::from_cents(500), Money::from_cents(250) * 2]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_cents(1000));
        assert_eq!(total.to_string(), "10.00");
    }

    #[test]
    fn test_large_line_totals_saturate() {
        assert_eq!(Money::from_cents(i64::MAX) * 2, Money::from_cents(i64::MAX));
        assert_eq!(
            Money::from_cents(i64::MAX) + Money::from_cents(1),
            Money::from_cents(i64::MAX)
        );
    }
}
