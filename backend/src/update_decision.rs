//! Update Decision
//!
//! Decides whether a fresh observation is far enough from the registry's
//! stored rate to be worth a transaction.
//!
//! # Time-adjusted threshold
//! ```text
//! threshold_pct = 3600 / seconds_since_last_update
//!
//!   1 minute  → 60%     (almost never update right after an update)
//!   1 hour    →  1%
//!   10 hours  →  0.1%   (small drift eventually gets pushed)
//! ```

use crate::{
    error::{Result, SyncError},
    rate_math::{cents_per_coin, percent_difference},
    types::{PriceObservation, RateRecord},
};
use rust_decimal::Decimal;
use serde::Serialize;

/// Seconds in the reference window; one hour of silence allows a 1% drift.
const THRESHOLD_WINDOW_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub update: bool,
    pub difference_pct: Decimal,
    pub threshold_pct: Decimal,
}

/// Compare `observation` with the stored `record`.
///
/// # Errors
/// * `ClockSkew` - the observation is older than the record's last update
/// * `DivisionByZero` - the record or observation holds a zero rate
/// * `Overflow` - the two timestamps are too far apart to subtract
pub fn should_update(observation: &PriceObservation, record: &RateRecord) -> Result<Decision> {
    let elapsed = observation
        .observed_at
        .checked_sub(record.last_updated)
        .ok_or_else(|| {
            SyncError::Overflow(format!("{} - {}", observation.observed_at, record.last_updated))
        })?;
    if elapsed < 0 {
        return Err(SyncError::ClockSkew {
            observed_at: observation.observed_at,
            last_updated: record.last_updated,
        });
    }

    let threshold_pct = if elapsed == 0 {
        Decimal::MAX
    } else {
        Decimal::from(THRESHOLD_WINDOW_SECS) / Decimal::from(elapsed)
    };

    let observed_cents = observation
        .usd_price
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| SyncError::Overflow(format!("{} × 100", observation.usd_price)))?;
    let stored_cents = cents_per_coin(record.wei_per_cent)?;
    let difference_pct = percent_difference(observed_cents, stored_cents)?;

    Ok(Decision {
        update: difference_pct > threshold_pct,
        difference_pct,
        threshold_pct,
    })
}
