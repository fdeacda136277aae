// 1.0: primitives shared by the engine, the protocol seam and the recorder.
// participant ids, sides, prices, asset pairs, timestamps. newtypes so the compiler catches mixups.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-point precision the protocol reports amounts in (18 decimals).
pub const AMOUNT_DP: u32 = 18;

/// Precision of reference prices pushed to the oracle (12 decimals).
pub const PRICE_PUSH_DP: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "participant#{}", self.0)
    }
}

// Long = buys base from the pool (pool price up). Short = sells base into the pool (pool price down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Long => Decimal::ONE,
            Side::Short => Decimal::NEGATIVE_ONE,
        }
    }

    /// Record-stream flag: 1 for long, -1 for short.
    pub fn flag(&self) -> i8 {
        match self {
            Side::Long => 1,
            Side::Short => -1,
        }
    }

    pub fn from_flag(flag: i8) -> Option<Self> {
        match flag {
            1 => Some(Side::Long),
            -1 => Some(Side::Short),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

// 1.1: price in quote per unit of base. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    /// quote / base, truncated to the protocol's 18 decimals.
    pub fn from_ratio(quote: Decimal, base: Decimal) -> Option<Self> {
        if base <= Decimal::ZERO {
            return None;
        }
        let ratio = (quote / base).round_dp_with_strategy(AMOUNT_DP, RoundingStrategy::ToZero);
        Self::new(ratio)
    }

    /// floor(p * 10^12) / 10^12, the precision reference prices are pushed at.
    ///
    /// None for prices that floor to zero at 12 places.
    pub fn from_f64_truncated(value: f64) -> Option<Self> {
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        let scaled = (value * 10f64.powi(PRICE_PUSH_DP as i32)).floor();
        if scaled < i64::MAX as f64 {
            return Self::new(Decimal::new(scaled as i64, PRICE_PUSH_DP));
        }
        // too wide for i64 at 12 places: truncate the exact binary value instead
        let exact = Decimal::from_f64_retain(value)?;
        Self::new(exact.round_dp_with_strategy(PRICE_PUSH_DP, RoundingStrategy::ToZero))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

// 1.2: the traded pair. base is the collateral asset, quote the pricing asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    pub base: String,
    pub quote: String,
}

impl Pair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

impl Default for Pair {
    fn default() -> Self {
        Self::new("BT", "QT")
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

// 1.3: second-resolution timestamp. trade deadlines are compared against the protocol clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Deadline that never expires in practice.
    pub const FAR_FUTURE: Timestamp = Timestamp(9_999_999_999);

    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp())
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }
}

/// Truncate an amount to the protocol's 18 decimals.
pub fn truncate_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_DP, RoundingStrategy::ToZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn side_flags_round_trip() {
        assert_eq!(Side::Long.flag(), 1);
        assert_eq!(Side::Short.flag(), -1);
        assert_eq!(Side::from_flag(-1), Some(Side::Short));
        assert_eq!(Side::from_flag(0), None);
    }

    #[test]
    fn price_from_reserve_ratio() {
        let price = Price::from_ratio(dec!(1_000_000), dec!(500)).unwrap();
        assert_eq!(price.value(), dec!(2000));

        // 1/3 truncated, not rounded
        let third = Price::from_ratio(dec!(1), dec!(3)).unwrap();
        assert_eq!(third.value(), dec!(0.333333333333333333));

        assert!(Price::from_ratio(dec!(1), Decimal::ZERO).is_none());
    }

    #[test]
    fn pushed_price_is_floored_to_twelve_places() {
        let price = Price::from_f64_truncated(2003.4717432820134).unwrap();
        assert_eq!(price.value(), dec!(2003.471743282013));

        assert!(Price::from_f64_truncated(0.0).is_none());
        assert!(Price::from_f64_truncated(f64::NAN).is_none());
        assert!(Price::from_f64_truncated(1e-13).is_none());
    }

    #[test]
    fn pushed_price_above_i64_scale() {
        // 1e7 * 1e12 no longer fits an i64 mantissa
        let price = Price::from_f64_truncated(10017358.716410067).unwrap();
        assert_eq!(price.value().scale(), 12);
        assert!(price.value() >= dec!(10017358.716410066));
        assert!(price.value() <= dec!(10017358.716410068));

        let huge = Price::from_f64_truncated(1e15).unwrap();
        assert_eq!(huge.value(), dec!(1_000_000_000_000_000));
    }

    #[test]
    fn price_display_is_normalized() {
        let price = Price::new(dec!(2000.000)).unwrap();
        assert_eq!(price.to_string(), "2000");
    }
}
