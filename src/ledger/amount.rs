use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of base units in one whole unit of native value
pub const BASE_UNITS_PER_UNIT: u128 = 1_000_000_000_000_000_000;

/// Maximum number of fraction digits accepted when parsing decimal amounts
pub const MAX_FRACTION_DIGITS: usize = 18;

/// Errors produced while parsing a decimal amount
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    #[error("Amount is empty")]
    Empty,

    #[error("Invalid character in amount: {0}")]
    InvalidDigit(String),

    #[error("Too many fraction digits (max 18): {0}")]
    TooPrecise(String),

    #[error("Amount out of range: {0}")]
    Overflow(String),
}

/// An exact quantity of native value, held as base units.
///
/// All accounting in the ledger goes through this type so that no floating point ever
/// touches a balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_base_units(base_units: u128) -> Self {
        Amount(base_units)
    }

    pub const fn from_units(units: u64) -> Self {
        Amount(units as u128 * BASE_UNITS_PER_UNIT)
    }

    pub const fn base_units(&self) -> u128 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Multiply by `numerator / denominator`, rounding down.
    ///
    /// Returns `None` on overflow or a zero denominator.
    pub fn checked_mul_ratio(self, numerator: u64, denominator: u64) -> Option<Amount> {
        if denominator == 0 {
            return None;
        }
        self.0
            .checked_mul(numerator as u128)
            .map(|scaled| Amount(scaled / denominator as u128))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / BASE_UNITS_PER_UNIT;
        let fraction = self.0 % BASE_UNITS_PER_UNIT;
        if fraction == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:0width$}", fraction, width = MAX_FRACTION_DIGITS);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountParseError::Empty);
        }

        let (whole, fraction) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(AmountParseError::Empty);
        }
        if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return Err(AmountParseError::InvalidDigit(s.to_string()));
        }
        if fraction.len() > MAX_FRACTION_DIGITS {
            return Err(AmountParseError::TooPrecise(s.to_string()));
        }

        let overflow = || AmountParseError::Overflow(s.to_string());
        let whole_units: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let fraction_units: u128 = if fraction.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", fraction, width = MAX_FRACTION_DIGITS);
            padded.parse().map_err(|_| overflow())?
        };

        whole_units
            .checked_mul(BASE_UNITS_PER_UNIT)
            .and_then(|base| base.checked_add(fraction_units))
            .map(Amount)
            .ok_or_else(overflow)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount string or a whole number of units")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from_units(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        u64::try_from(v)
            .map(Amount::from_units)
            .map_err(|_| E::custom(format!("negative amount: {}", v)))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_trims_fraction() {
        assert_eq!(Amount::from_units(10).to_string(), "10");
        assert_eq!(Amount::from_base_units(1_500_000_000_000_000_000).to_string(), "1.5");
        assert_eq!(Amount::from_base_units(1).to_string(), "0.000000000000000001");
        assert_eq!(Amount::ZERO.to_string(), "0");
    }

    #[test]
    fn test_parse_decimal_amounts() {
        assert_eq!(
            "1.5".parse::<Amount>().unwrap(),
            Amount::from_base_units(1_500_000_000_000_000_000)
        );
        assert_eq!("10".parse::<Amount>().unwrap(), Amount::from_units(10));
        assert_eq!(
            ".25".parse::<Amount>().unwrap(),
            Amount::from_base_units(250_000_000_000_000_000)
        );
        assert_eq!(" 2. ".parse::<Amount>().unwrap(), Amount::from_units(2));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!("".parse::<Amount>(), Err(AmountParseError::Empty));
        assert_eq!(".".parse::<Amount>(), Err(AmountParseError::Empty));
        assert!(matches!("-1".parse::<Amount>(), Err(AmountParseError::InvalidDigit(_))));
        assert!(matches!("1.2.3".parse::<Amount>(), Err(AmountParseError::InvalidDigit(_))));
        assert!(matches!(
            "0.0000000000000000001".parse::<Amount>(),
            Err(AmountParseError::TooPrecise(_))
        ));
        assert!(matches!(
            "999999999999999999999999999999999999999".parse::<Amount>(),
            Err(AmountParseError::Overflow(_))
        ));
    }

    #[test]
    fn test_ratio_is_exact_for_payouts() {
        let premium = Amount::from_units(1);
        let payout = premium.checked_mul_ratio(3, 2).unwrap();
        assert_eq!(payout.to_string(), "1.5");
        assert_eq!(premium.checked_mul_ratio(3, 0), None);
        assert_eq!(Amount::from_base_units(u128::MAX).checked_mul_ratio(3, 2), None);
    }

    #[test]
    fn test_serde_accepts_strings_and_integers() {
        let from_str: Amount = serde_json::from_str("\"1.5\"").unwrap();
        let from_int: Amount = serde_json::from_str("10").unwrap();
        assert_eq!(from_str.to_string(), "1.5");
        assert_eq!(from_int, Amount::from_units(10));
        assert_eq!(serde_json::to_string(&from_str).unwrap(), "\"1.5\"");
        assert!(serde_json::from_str::<Amount>("-3").is_err());
    }
}
