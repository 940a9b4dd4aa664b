//! Fixed-point rate arithmetic
//!
//! All math runs on `rust_decimal::Decimal` or integers. Nothing here touches
//! floating point, so the same inputs always give the same bits on every
//! machine that runs the poller.
//!
//! # Units
//! ```text
//! 1 coin        = WEI_PER_ETHER wei = usd_price × 100 cents
//! wei_per_cent  = WEI_PER_ETHER / (usd_price × 100)
//! cents_per_coin = WEI_PER_ETHER / wei_per_cent
//! ```

use crate::error::{Result, SyncError};
use rate_registry::state::WEI_PER_ETHER;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Percentage difference relative to the midpoint of `a` and `b`.
///
/// # Formula
/// ```text
/// |a − b| / ((a + b) / 2) × 100  ==  200 × |a − b| / (a + b)
/// ```
///
/// The right-hand form is what gets computed: one multiplication and one
/// division over the common denominator `a + b`. Scaling both arguments by the
/// same factor (dollars vs cents vs wei) leaves the result unchanged.
///
/// # Errors
/// * `DivisionByZero` - `a + b == 0`
/// * `Overflow` - intermediate value does not fit in a `Decimal`
pub fn percent_difference(a: Decimal, b: Decimal) -> Result<Decimal> {
    let denominator = a
        .checked_add(b)
        .ok_or_else(|| SyncError::Overflow(format!("{} + {}", a, b)))?;
    if denominator.is_zero() {
        return Err(SyncError::DivisionByZero(
            "percent difference of two zero values".to_string(),
        ));
    }

    let numerator = (a - b)
        .abs()
        .checked_mul(Decimal::from(200))
        .ok_or_else(|| SyncError::Overflow(format!("200 × |{} − {}|", a, b)))?;

    numerator
        .checked_div(denominator)
        .ok_or_else(|| SyncError::Overflow(format!("{} / {}", numerator, denominator)))
}

/// Convert a USD price into the registry's wei-per-cent unit.
///
/// Truncates toward zero. The result is an approximation: inverting a price
/// with many significant digits loses precision, and the registry stores it
/// that way too.
///
/// # Example
/// ```text
/// $360 → 10^18 / 36000 = 27_777_777_777_777
/// ```
pub fn wei_per_cent_from_usd(usd_price: Decimal) -> Result<u64> {
    if usd_price.is_sign_negative() && !usd_price.is_zero() {
        return Err(SyncError::InvalidPrice(format!("negative price {}", usd_price)));
    }

    let cents = usd_price
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| SyncError::Overflow(format!("{} × 100", usd_price)))?;
    if cents.is_zero() {
        return Err(SyncError::DivisionByZero("price of zero".to_string()));
    }

    let wei = Decimal::from(WEI_PER_ETHER)
        .checked_div(cents)
        .ok_or_else(|| SyncError::Overflow(format!("{} / {}", WEI_PER_ETHER, cents)))?;

    wei.trunc()
        .to_u64()
        .ok_or_else(|| SyncError::Overflow(format!("{} does not fit in u64", wei)))
}

/// The stored registry rate expressed as US cents per coin.
pub fn cents_per_coin(wei_per_cent: u64) -> Result<Decimal> {
    if wei_per_cent == 0 {
        return Err(SyncError::DivisionByZero("registry rate of zero".to_string()));
    }

    Ok(Decimal::from(WEI_PER_ETHER) / Decimal::from(wei_per_cent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rate_registry::state::RateRegistry;
    use rust_decimal_macros::dec;
    use solana_sdk::pubkey::Pubkey;

    #[test]
    fn test_percent_difference() {
        // |360 − 300| / 330 × 100 = 18.18...
        let diff = percent_difference(dec!(360), dec!(300)).unwrap();
        assert_eq!(diff.round_dp(4), dec!(18.1818));

        assert_eq!(percent_difference(dec!(50), dec!(50)).unwrap(), Decimal::ZERO);
        assert_eq!(percent_difference(dec!(0), dec!(10)).unwrap(), dec!(200));
    }

    #[test]
    fn test_percent_difference_unit_invariant() {
        let dollars = percent_difference(dec!(360), dec!(300)).unwrap();
        let cents = percent_difference(dec!(36000), dec!(30000)).unwrap();
        let scaled = percent_difference(
            Decimal::from(360_u64 * 10_u64.pow(16)),
            Decimal::from(300_u64 * 10_u64.pow(16)),
        )
        .unwrap();

        assert_eq!(dollars, cents);
        assert_eq!(dollars, scaled);
    }

    #[test]
    fn test_percent_difference_zero_denominator() {
        let result = percent_difference(Decimal::ZERO, Decimal::ZERO);
        assert!(matches!(result, Err(SyncError::DivisionByZero(_))));
    }

    #[test]
    fn test_wei_per_cent_from_usd() {
        assert_eq!(wei_per_cent_from_usd(dec!(360)).unwrap(), 27_777_777_777_777);
        assert_eq!(wei_per_cent_from_usd(dec!(300)).unwrap(), 33_333_333_333_333);
        assert_eq!(wei_per_cent_from_usd(dec!(0.01)).unwrap(), WEI_PER_ETHER);

        assert!(matches!(wei_per_cent_from_usd(Decimal::ZERO), Err(SyncError::DivisionByZero(_))));
        assert!(matches!(wei_per_cent_from_usd(dec!(-5)), Err(SyncError::InvalidPrice(_))));
    }

    #[test]
    fn test_cents_per_coin() {
        assert_eq!(cents_per_coin(WEI_PER_ETHER / 36000).unwrap().round(), dec!(36000));
        assert!(matches!(cents_per_coin(0), Err(SyncError::DivisionByZero(_))));
    }

    proptest! {
        #[test]
        fn prop_percent_difference_non_negative(a in 0u64..u64::MAX / 4, b in 0u64..u64::MAX / 4) {
            prop_assume!(a + b > 0);
            let diff = percent_difference(Decimal::from(a), Decimal::from(b)).unwrap();
            prop_assert!(diff >= Decimal::ZERO);
            prop_assert!(diff <= dec!(200));
        }

        #[test]
        fn prop_percent_difference_of_equal_values_is_zero(a in 1u64..u64::MAX) {
            prop_assert_eq!(percent_difference(Decimal::from(a), Decimal::from(a)).unwrap(), Decimal::ZERO);
        }

        #[test]
        fn prop_usd_round_trips_through_registry(cents in 1u64..100_000_000) {
            let usd = Decimal::new(cents as i64, 2);
            let wei_per_cent = wei_per_cent_from_usd(usd).unwrap();
            let registry = RateRegistry::new(Pubkey::new_unique(), wei_per_cent, 0).unwrap();

            let back = Decimal::from(registry.exchange_rate_in_usd().unwrap());
            prop_assert!((back - usd).abs() < Decimal::ONE, "{} came back as {}", usd, back);
        }
    }
}
