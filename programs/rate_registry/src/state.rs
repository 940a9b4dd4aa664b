//! Registry account and its state machine.
//!
//! Every rule the program enforces lives here as a plain method taking the
//! caller and the ledger time as arguments. Instruction handlers in `lib.rs`
//! only read sysvars, move lamports and forward to these methods, so the
//! whole state machine can be exercised without a validator.
//!
//! # Modes
//! ```text
//! Authoritative (delegate = None)  <--set_delegate-->  Delegating (delegate = Some(B))
//!   reads use own fields                                 reads resolve through B
//! ```

use anchor_lang::prelude::*;

use crate::error::RegistryError;

/// Smallest ledger units in one whole coin.
pub const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

/// How far ahead of ledger time an update timestamp may be (seconds).
pub const MAX_FUTURE_DRIFT_SECS: i64 = 60;

/// Upper bound on delegation links followed by a single read.
pub const MAX_DELEGATION_HOPS: usize = 8;

type RegistryResult<T> = std::result::Result<T, RegistryError>;

#[account]
#[derive(InitSpace, Debug, PartialEq, Eq)]
pub struct RateRegistry {
    /// The only key allowed to mutate this account
    pub owner: Pubkey,

    /// Smallest ledger units per US cent
    pub wei_per_cent: u64,

    /// Unix timestamp of the last accepted rate
    pub last_updated: i64,

    /// Registry this one defers its reads to
    pub delegate: Option<Pubkey>,
}

impl RateRegistry {
    /// Build a fresh Authoritative registry owned by `owner`.
    pub fn new(owner: Pubkey, initial_wei_per_cent: u64, now: i64) -> RegistryResult<Self> {
        if initial_wei_per_cent == 0 {
            return Err(RegistryError::InvalidRate);
        }

        Ok(Self {
            owner,
            wei_per_cent: initial_wei_per_cent,
            last_updated: now,
            delegate: None,
        })
    }

    pub fn is_delegating(&self) -> bool {
        self.delegate.is_some()
    }

    fn require_owner(&self, caller: &Pubkey) -> RegistryResult<()> {
        if *caller != self.owner {
            return Err(RegistryError::Unauthorized);
        }
        Ok(())
    }

    /// Accept a new rate if `caller` owns the registry and `timestamp` lies in
    /// `[last_updated, now + MAX_FUTURE_DRIFT_SECS]`.
    ///
    /// On any rejection the account is left untouched.
    pub fn set_exchange_rate(
        &mut self,
        caller: &Pubkey,
        wei_per_cent: u64,
        timestamp: i64,
        now: i64,
    ) -> RegistryResult<()> {
        self.require_owner(caller)?;

        if wei_per_cent == 0 {
            return Err(RegistryError::InvalidRate);
        }
        if timestamp < self.last_updated {
            return Err(RegistryError::StaleTimestamp);
        }
        if timestamp > now.saturating_add(MAX_FUTURE_DRIFT_SECS) {
            return Err(RegistryError::FutureTimestamp);
        }

        self.wei_per_cent = wei_per_cent;
        self.last_updated = timestamp;
        Ok(())
    }

    /// Switch to Delegating (`Some`) or back to Authoritative (`None`).
    pub fn set_delegate(
        &mut self,
        caller: &Pubkey,
        own_address: &Pubkey,
        delegate: Option<Pubkey>,
    ) -> RegistryResult<()> {
        self.require_owner(caller)?;

        if delegate.as_ref() == Some(own_address) {
            return Err(RegistryError::InvalidDelegate);
        }

        self.delegate = delegate;
        Ok(())
    }

    /// Amount the owner may pull out: everything above the rent reserve.
    pub fn withdrawable(&self, caller: &Pubkey, balance: u64, reserve: u64) -> RegistryResult<u64> {
        self.require_owner(caller)?;
        Ok(balance.saturating_sub(reserve))
    }

    /// Whole US dollars per coin from this account's own fields.
    ///
    /// `WEI_PER_ETHER / (wei_per_cent * 100)`, truncated.
    pub fn exchange_rate_in_usd(&self) -> RegistryResult<u64> {
        let denominator = u128::from(self.wei_per_cent)
            .checked_mul(100)
            .ok_or(RegistryError::Overflow)?;
        if denominator == 0 {
            return Err(RegistryError::DivisionByZero);
        }

        u64::try_from(u128::from(WEI_PER_ETHER) / denominator).map_err(|_| RegistryError::Overflow)
    }

    pub fn value_from_cents(&self, cents: u64) -> RegistryResult<u128> {
        u128::from(self.wei_per_cent)
            .checked_mul(u128::from(cents))
            .ok_or(RegistryError::Overflow)
    }

    pub fn value_from_dollars(&self, dollars: u64) -> RegistryResult<u128> {
        let cents = u128::from(dollars)
            .checked_mul(100)
            .ok_or(RegistryError::Overflow)?;
        u128::from(self.wei_per_cent)
            .checked_mul(cents)
            .ok_or(RegistryError::Overflow)
    }
}

/// Follow the delegation chain starting at `start` until an Authoritative
/// registry is reached.
///
/// `load` fetches the registry stored at a delegate address. Chains longer
/// than `MAX_DELEGATION_HOPS`, cycles included, fail with
/// `DelegationTooDeep`.
pub fn resolve_delegation<E, F>(start: &RateRegistry, mut load: F) -> std::result::Result<RateRegistry, E>
where
    E: From<RegistryError>,
    F: FnMut(&Pubkey) -> std::result::Result<RateRegistry, E>,
{
    let mut current = start.clone();

    for _ in 0..MAX_DELEGATION_HOPS {
        match current.delegate {
            None => return Ok(current),
            Some(next) => current = load(&next)?,
        }
    }

    if current.is_delegating() {
        return Err(RegistryError::DelegationTooDeep.into());
    }
    Ok(current)
}
