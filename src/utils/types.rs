//! Common types used throughout the VWAP engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::{Error, Result};

/// One accepted trade: exact-decimal price and volume.
///
/// The symbol is not stored here; every window belongs to exactly one
/// symbol's accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub price: Decimal,
    pub volume: Decimal,
}

impl TradeEvent {
    pub fn new(price: Decimal, volume: Decimal) -> Self {
        Self { price, volume }
    }

    /// Parse a trade from the decimal strings carried on the wire.
    ///
    /// Price must be strictly positive and volume non-negative.
    pub fn parse(price: &str, volume: &str) -> Result<Self> {
        let price = parse_decimal("price", price)?;
        let volume = parse_decimal("volume", volume)?;
        if price <= Decimal::ZERO {
            return Err(Error::parse("price", &price.to_string(), "must be positive"));
        }
        if volume.is_sign_negative() && !volume.is_zero() {
            return Err(Error::parse("volume", &volume.to_string(), "must not be negative"));
        }
        Ok(Self { price, volume })
    }

    /// price × volume, rejected when the product cannot be held exactly.
    pub fn notional(&self) -> Result<Decimal> {
        exact_mul(self.price, self.volume).ok_or_else(|| {
            Error::parse(
                "notional",
                &format!("{} x {}", self.price, self.volume),
                "product is out of range for an exact decimal",
            )
        })
    }
}

/// Largest scale a `Decimal` can carry.
const MAX_SCALE: u32 = 28;

/// `a + b` without rounding, or `None` when the result does not fit a
/// `Decimal` exactly.
///
/// The `+` operator rounds once a result needs more than 28 significant
/// digits and panics on overflow; running totals can afford neither.
pub fn exact_add(a: Decimal, b: Decimal) -> Option<Decimal> {
    let scale = a.scale().max(b.scale());
    let sum = rescaled(a, scale)?.checked_add(rescaled(b, scale)?)?;
    from_mantissa(sum, scale)
}

/// `a - b` without rounding.
pub fn exact_sub(a: Decimal, b: Decimal) -> Option<Decimal> {
    exact_add(a, -b)
}

/// `a * b` without rounding.
pub fn exact_mul(a: Decimal, b: Decimal) -> Option<Decimal> {
    let (a, b) = (a.normalize(), b.normalize());
    let product = a.mantissa().checked_mul(b.mantissa())?;
    from_mantissa(product, a.scale() + b.scale())
}

fn rescaled(d: Decimal, scale: u32) -> Option<i128> {
    10i128.checked_pow(scale - d.scale())?.checked_mul(d.mantissa())
}

fn from_mantissa(mut mantissa: i128, mut scale: u32) -> Option<Decimal> {
    // only trailing zeros may be dropped
    while scale > MAX_SCALE && mantissa % 10 == 0 {
        mantissa /= 10;
        scale -= 1;
    }
    Decimal::try_from_i128_with_scale(mantissa, scale).ok()
}

/// Parse a decimal numeral without losing precision.
pub fn parse_decimal(field: &'static str, raw: &str) -> Result<Decimal> {
    Decimal::from_str_exact(raw).map_err(|e| Error::parse(field, raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_trade() {
        let trade = TradeEvent::parse("61036.26", "0.00054368").unwrap();
        assert_eq!(trade.price, dec!(61036.26));
        assert_eq!(trade.volume, dec!(0.00054368));
        assert_eq!(trade.notional().unwrap(), dec!(33.1841938368));
    }

    #[test]
    fn test_notional_out_of_range() {
        let trade = TradeEvent::parse("79228162514264337593543950335", "2").unwrap();
        assert_matches!(trade.notional(), Err(Error::Parse { field: "notional", .. }));
    }

    #[test]
    fn test_exact_arithmetic() {
        assert_eq!(exact_add(dec!(0.1), dec!(0.2)), Some(dec!(0.3)));
        assert_eq!(exact_sub(dec!(100), dec!(0.00000001)), Some(dec!(99.99999999)));
        assert_eq!(exact_mul(dec!(1.50), dec!(2.000)), Some(dec!(3)));
        assert_eq!(exact_add(Decimal::MAX, Decimal::ONE), None);
        assert_eq!(exact_sub(Decimal::MAX, Decimal::MAX), Some(Decimal::ZERO));

        // 29 significant digits would need rounding
        assert_eq!(exact_add(dec!(100000000000000), dec!(0.0000000000000001)), None);
        assert_eq!(exact_mul(dec!(0.00000001), dec!(0.00000001)), Some(dec!(0.0000000000000001)));
        assert_eq!(exact_mul(dec!(0.00000000000001), dec!(0.000000000000001)), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_matches!(
            TradeEvent::parse("abc", "1"),
            Err(Error::Parse { field: "price", .. })
        );
        assert_matches!(
            TradeEvent::parse("1", ""),
            Err(Error::Parse { field: "volume", .. })
        );
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert_matches!(TradeEvent::parse("0", "1"), Err(Error::Parse { field: "price", .. }));
        assert_matches!(TradeEvent::parse("-5", "1"), Err(Error::Parse { field: "price", .. }));
        assert_matches!(TradeEvent::parse("5", "-1"), Err(Error::Parse { field: "volume", .. }));
        assert!(TradeEvent::parse("5", "0").is_ok());
    }
}
