use rate_registry::state::RateRegistry;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::SyncError;

/// A single reading from the price feed, taken once per poll cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// USD per coin
    pub usd_price: Decimal,

    /// Unix timestamp reported by the feed
    pub observed_at: i64,
}

/// Registry state as read off one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRecord {
    pub wei_per_cent: u64,
    pub last_updated: i64,
    pub owner: Pubkey,
    pub delegate: Option<Pubkey>,
}

impl From<&RateRegistry> for RateRecord {
    fn from(registry: &RateRegistry) -> Self {
        Self {
            wei_per_cent: registry.wei_per_cent,
            last_updated: registry.last_updated,
            owner: registry.owner,
            delegate: registry.delegate,
        }
    }
}

/// Identifier of a confirmed transaction (base58 signature on Solana)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHandle(pub String);

/// Why a target was left alone this cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    WithinThreshold {
        difference_pct: Decimal,
        threshold_pct: Decimal,
    },
    ClockSkew {
        observed_at: i64,
        last_updated: i64,
    },
}

/// Result of one target in one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Updated(TxHandle),
    Skipped(SkipReason),
    Failed(#[serde(serialize_with = "serialize_error")] SyncError),
}

fn serialize_error<S: serde::Serializer>(error: &SyncError, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    pub target: String,
    pub outcome: Outcome,
}

/// Everything that happened in one poll cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub observation: PriceObservation,

    /// False when the feed had not moved since the previous cycle
    pub broadcast: bool,

    pub targets: Vec<TargetReport>,

    pub finished_at: i64,
}

impl CycleReport {
    pub fn failed_targets(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| matches!(t.outcome, Outcome::Failed(_)))
            .count()
    }
}
