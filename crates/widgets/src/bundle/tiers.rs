//! Bundle discount tiers.
//!
//! Tiers are declared in markup as `threshold:discount` pairs separated by
//! `;`, e.g. `10:5;20:10;30:15`. The threshold is a quantity or, in amount
//! mode, a price in major currency units.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while parsing a tier list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TierError {
    #[error("tier {0:?} is not of the form threshold:discount")]
    Malformed(String),

    #[error("tier {tier:?} has an invalid number: {reason}")]
    InvalidNumber { tier: String, reason: String },

    #[error("tier {0:?} has a discount outside 0-100%")]
    DiscountOutOfRange(String),
}

/// One discount tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleTier {
    pub threshold: Decimal,
    pub discount_percent: Decimal,
}

/// Tiers ordered by threshold.
///
/// Out-of-order declarations are sorted (stably, so among equal thresholds
/// the later declaration still comes last and wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierTable {
    tiers: Vec<BundleTier>,
}

impl TierTable {
    /// Parse `threshold:discount;...`. Blank input yields an empty table.
    ///
    /// # Errors
    ///
    /// Returns `TierError` for malformed pairs or unparseable numbers.
    pub fn parse(declared: &str) -> Result<Self, TierError> {
        let mut tiers = declared
            .split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(parse_tier)
            .collect::<Result<Vec<_>, _>>()?;

        if !tiers.is_sorted_by(|a, b| a.threshold <= b.threshold) {
            tracing::warn!(declared, "bundle tiers declared out of threshold order");
            tiers.sort_by(|a, b| a.threshold.cmp(&b.threshold));
        }

        Ok(Self { tiers })
    }

    #[must_use]
    pub fn tiers(&self) -> &[BundleTier] {
        &self.tiers
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Discount earned at `progress`: the tier with the greatest threshold not
    /// exceeding it, or zero below the first tier.
    #[must_use]
    pub fn discount_for(&self, progress: Decimal) -> Decimal {
        self.tiers
            .iter()
            .rev()
            .find(|tier| progress >= tier.threshold)
            .map_or(Decimal::ZERO, |tier| tier.discount_percent)
    }

    /// The first tier not yet reached, or `None` once fully discounted.
    #[must_use]
    pub fn next_tier(&self, progress: Decimal) -> Option<&BundleTier> {
        self.tiers.iter().find(|tier| progress < tier.threshold)
    }

    /// Highest threshold, the natural goal of the progress bar.
    #[must_use]
    pub fn last_threshold(&self) -> Option<Decimal> {
        self.tiers.last().map(|tier| tier.threshold)
    }
}

impl FromStr for TierTable {
    type Err = TierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_tier(text: &str) -> Result<BundleTier, TierError> {
    let (threshold, discount) = text
        .split_once(':')
        .ok_or_else(|| TierError::Malformed(text.to_string()))?;

    let number = |raw: &str| {
        Decimal::from_str(raw.trim()).map_err(|e| TierError::InvalidNumber {
            tier: text.to_string(),
            reason: e.to_string(),
        })
    };
    let threshold = number(threshold)?;
    let discount_percent = number(discount)?;

    if discount_percent < Decimal::ZERO || discount_percent > Decimal::ONE_HUNDRED {
        return Err(TierError::DiscountOutOfRange(text.to_string()));
    }

    Ok(BundleTier {
        threshold,
        discount_percent,
    })
}
