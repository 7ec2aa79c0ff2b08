//! Exact-decimal stake coefficient.
//!
//! Coefficients are represented as fixed-point integers (four fractional
//! digits) so that every node computes identical weighted amounts. Conversion
//! to `f64` exists for display and non-consensus estimates only.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::StakeError;

/// Number of fractional decimal digits carried by a [`Coefficient`].
pub const COEFFICIENT_DECIMALS: u32 = 4;

/// `10^COEFFICIENT_DECIMALS`.
pub const COEFFICIENT_SCALE: u64 = 10_000;

/// A non-negative decimal multiplier such as `1.05`.
///
/// Serialized as its decimal string so persisted rows stay exact and readable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coefficient(u64);

impl Coefficient {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(COEFFICIENT_SCALE);

    /// Build from the scaled integer value (`1.05` is `10_500`).
    pub const fn from_scaled(scaled: u64) -> Self {
        Self(scaled)
    }

    pub fn scaled(&self) -> u64 {
        self.0
    }

    /// `floor(amount × self)` in exact integer arithmetic.
    pub fn apply(&self, amount: u64) -> u128 {
        amount as u128 * self.0 as u128 / COEFFICIENT_SCALE as u128
    }

    /// `amount × self` scaled by [`COEFFICIENT_SCALE`], without rounding.
    pub fn apply_scaled(&self, amount: u64) -> u128 {
        amount as u128 * self.0 as u128
    }

    /// Lossy conversion for display and estimation.
    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / COEFFICIENT_SCALE as f64
    }
}

impl FromStr for Coefficient {
    type Err = StakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| StakeError::InvalidCoefficient(s.to_string(), reason);

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("integer part must be decimal digits"));
        }
        if s.contains('.') && frac_part.is_empty() {
            return Err(invalid("missing fractional digits"));
        }
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("fractional part must be decimal digits"));
        }
        if frac_part.len() > COEFFICIENT_DECIMALS as usize {
            return Err(invalid("too many fractional digits"));
        }

        let int: u64 = int_part.parse().map_err(|_| invalid("out of range"))?;
        let mut frac: u64 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| invalid("out of range"))?
        };
        for _ in frac_part.len()..COEFFICIENT_DECIMALS as usize {
            frac *= 10;
        }

        int.checked_mul(COEFFICIENT_SCALE)
            .and_then(|v| v.checked_add(frac))
            .map(Self)
            .ok_or_else(|| invalid("out of range"))
    }
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int = self.0 / COEFFICIENT_SCALE;
        let frac = self.0 % COEFFICIENT_SCALE;
        if frac == 0 {
            return write!(f, "{}", int);
        }
        let digits = format!("{:0width$}", frac, width = COEFFICIENT_DECIMALS as usize);
        write!(f, "{}.{}", int, digits.trim_end_matches('0'))
    }
}

impl Serialize for Coefficient {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Coefficient {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tier_strings() {
        assert_eq!("1".parse::<Coefficient>().unwrap(), Coefficient::ONE);
        assert_eq!("1.05".parse::<Coefficient>().unwrap().scaled(), 10_500);
        assert_eq!("1.1".parse::<Coefficient>().unwrap().scaled(), 11_000);
        assert_eq!("2".parse::<Coefficient>().unwrap().scaled(), 20_000);
        assert_eq!("0.0001".parse::<Coefficient>().unwrap().scaled(), 1);
    }

    #[test]
    fn rejects_malformed_strings() {
        for bad in ["", "-1", "1.", ".5", "1.00001", "1e3", "1,5", "abc"] {
            assert!(bad.parse::<Coefficient>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Coefficient::from_scaled(10_500).to_string(), "1.05");
        assert_eq!(Coefficient::from_scaled(11_000).to_string(), "1.1");
        assert_eq!(Coefficient::from_scaled(20_000).to_string(), "2");
        assert_eq!(Coefficient::from_scaled(1).to_string(), "0.0001");
    }

    #[test]
    fn apply_is_exact() {
        let c = Coefficient::from_scaled(10_500);
        assert_eq!(c.apply(1000), 1050);
        assert_eq!(c.apply(3), 3); // 3.15 floors to 3
        assert_eq!(c.apply_scaled(3), 31_500);
        assert_eq!(c.apply(u64::MAX), u64::MAX as u128 * 10_500 / 10_000);
    }

    #[test]
    fn serializes_as_decimal_string() {
        let c = Coefficient::from_scaled(17_000);
        // bincode encodes strings as a u64 length followed by the bytes.
        let bytes = bincode::serialize(&c).unwrap();
        assert_eq!(&bytes[8..], b"1.7");
        let back: Coefficient = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, c);
    }
}
