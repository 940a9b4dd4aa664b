//! Network Broadcaster
//!
//! Pushes one observation to every configured network, one network at a
//! time, and reports what happened on each.
//!
//! # Architecture
//! ```text
//!                     ┌─ devnet  → read → decide → nonce → submit → Updated
//! observation ────────┼─ testnet → read → decide ──────────────────→ Skipped
//!                     └─ local   → read ✗ ─────────────────────────→ Failed
//! ```
//!
//! Targets run sequentially so the nonce fetched for a target is used before
//! anything else in this process can submit from the same account. A failure
//! on one target is recorded and the loop moves on.

use crate::{
    error::{Result, SyncError},
    rate_math::wei_per_cent_from_usd,
    registry_client::RegistryClient,
    types::{Outcome, PriceObservation, SkipReason, TargetReport},
    update_decision::should_update,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One network the poller keeps in sync
#[derive(Clone)]
pub struct NetworkTarget {
    pub name: String,
    pub client: Arc<dyn RegistryClient>,
}

impl NetworkTarget {
    pub fn new(name: impl Into<String>, client: Arc<dyn RegistryClient>) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }
}

pub struct NetworkBroadcaster {
    targets: Vec<NetworkTarget>,
}

impl NetworkBroadcaster {
    pub fn new(targets: Vec<NetworkTarget>) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &[NetworkTarget] {
        &self.targets
    }

    /// Offer `observation` to every target in configuration order.
    ///
    /// Never fails as a whole; every target gets exactly one report.
    pub async fn broadcast(&self, observation: &PriceObservation) -> Vec<TargetReport> {
        let mut reports = Vec::with_capacity(self.targets.len());

        for target in &self.targets {
            let outcome = match update_target(target, observation).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(target = %target.name, error = %e, "Target update failed");
                    Outcome::Failed(e)
                }
            };

            reports.push(TargetReport {
                target: target.name.clone(),
                outcome,
            });
        }

        reports
    }
}

async fn update_target(target: &NetworkTarget, observation: &PriceObservation) -> Result<Outcome> {
    let record = target.client.read_record().await?;
    debug!(
        target = %target.name,
        owner = %record.owner,
        wei_per_cent = record.wei_per_cent,
        last_updated = record.last_updated,
        delegate = ?record.delegate,
        "Read registry record"
    );

    let decision = match should_update(observation, &record) {
        Ok(decision) => decision,
        Err(SyncError::ClockSkew {
            observed_at,
            last_updated,
        }) => {
            warn!(
                target = %target.name,
                observed_at,
                last_updated,
                "Observation predates registry, skipping"
            );
            return Ok(Outcome::Skipped(SkipReason::ClockSkew {
                observed_at,
                last_updated,
            }));
        }
        Err(e) => return Err(e),
    };

    if !decision.update {
        debug!(
            target = %target.name,
            difference_pct = %decision.difference_pct,
            threshold_pct = %decision.threshold_pct,
            "Within threshold, skipping"
        );
        return Ok(Outcome::Skipped(SkipReason::WithinThreshold {
            difference_pct: decision.difference_pct,
            threshold_pct: decision.threshold_pct,
        }));
    }

    let wei_per_cent = wei_per_cent_from_usd(observation.usd_price)?;

    // Fetched last, right before signing
    let nonce = target.client.latest_nonce().await?;
    let tx = target
        .client
        .submit_rate(wei_per_cent, observation.observed_at, nonce)
        .await?;

    info!(
        target = %target.name,
        usd_price = %observation.usd_price,
        wei_per_cent,
        difference_pct = %decision.difference_pct,
        tx = %tx.0,
        "Updated exchange rate"
    );

    Ok(Outcome::Updated(tx))
}
