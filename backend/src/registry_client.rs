//! Registry client seam
//!
//! The broadcaster talks to every network through this trait, so a network
//! is just "something that can read a record, hand out a nonce and submit a
//! rate". The Solana implementation lives in `solana_registry`.

use crate::{
    error::Result,
    types::{RateRecord, TxHandle},
};
use async_trait::async_trait;
use solana_sdk::hash::Hash;

/// Per-network transaction sequencing token. On Solana this is the latest
/// blockhash, which must be fetched right before the transaction is signed.
pub type Nonce = Hash;

#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Read the registry's own stored fields.
    async fn read_record(&self) -> Result<RateRecord>;

    /// Fetch a fresh sequencing token for the owner account.
    async fn latest_nonce(&self) -> Result<Nonce>;

    /// Sign and submit `set_exchange_rate`, waiting for confirmation.
    async fn submit_rate(&self, wei_per_cent: u64, timestamp: i64, nonce: Nonce) -> Result<TxHandle>;
}

/// In-process registry backed by the real state machine, for tests.
#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::error::SyncError;
    use rate_registry::state::RateRegistry;
    use solana_sdk::pubkey::Pubkey;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

    pub struct InMemoryRegistry {
        pub state: Mutex<RateRegistry>,
        pub signer: Pubkey,
        pub ledger_time: AtomicI64,
        pub submissions: AtomicU64,
        pub fail_reads: bool,
    }

    impl InMemoryRegistry {
        /// Registry whose configured signer is its owner.
        pub fn owned(wei_per_cent: u64, now: i64) -> Self {
            let owner = Pubkey::new_unique();
            Self::with_signer(RateRegistry::new(owner, wei_per_cent, now).unwrap(), owner, now)
        }

        /// Registry whose configured signer is someone else, so writes are rejected.
        pub fn foreign(wei_per_cent: u64, now: i64) -> Self {
            let registry = RateRegistry::new(Pubkey::new_unique(), wei_per_cent, now).unwrap();
            Self::with_signer(registry, Pubkey::new_unique(), now)
        }

        /// Registry whose RPC endpoint never answers reads.
        pub fn unreachable(wei_per_cent: u64, now: i64) -> Self {
            Self {
                fail_reads: true,
                ..Self::owned(wei_per_cent, now)
            }
        }

        fn with_signer(state: RateRegistry, signer: Pubkey, now: i64) -> Self {
            Self {
                state: Mutex::new(state),
                signer,
                ledger_time: AtomicI64::new(now),
                submissions: AtomicU64::new(0),
                fail_reads: false,
            }
        }

        pub fn snapshot(&self) -> RateRegistry {
            self.state.lock().unwrap().clone()
        }

        pub fn advance_to(&self, now: i64) {
            self.ledger_time.store(now, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl RegistryClient for InMemoryRegistry {
        async fn read_record(&self) -> Result<RateRecord> {
            if self.fail_reads {
                return Err(SyncError::RpcError("connection refused".to_string()));
            }
            Ok(RateRecord::from(&*self.state.lock().unwrap()))
        }

        async fn latest_nonce(&self) -> Result<Nonce> {
            Ok(Hash::new_unique())
        }

        async fn submit_rate(&self, wei_per_cent: u64, timestamp: i64, _nonce: Nonce) -> Result<TxHandle> {
            let now = self.ledger_time.load(Ordering::SeqCst);
            self.state
                .lock()
                .unwrap()
                .set_exchange_rate(&self.signer, wei_per_cent, timestamp, now)?;

            let n = self.submissions.fetch_add(1, Ordering::SeqCst);
            Ok(TxHandle(format!("tx-{}", n)))
        }
    }
}
