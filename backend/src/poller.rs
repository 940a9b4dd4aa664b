//! Poller
//!
//! Drives fetch → decide → broadcast on a fixed cadence.
//!
//! Each tick spawns its own cycle task. A slow network can make cycles
//! overlap; that is fine because a later cycle reads the registry again and
//! sees the `last_updated` the earlier one wrote.

use crate::{
    broadcaster::NetworkBroadcaster,
    error::Result,
    feed_client::PriceFeed,
    types::{CycleReport, Outcome, PriceObservation},
};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Latest finished cycle, shared with the status API
pub type StatusHandle = Arc<RwLock<Option<CycleReport>>>;

/// Last observation broadcast and whether every target handled it cleanly
struct LastBroadcast {
    observation: PriceObservation,
    clean: bool,
}

pub struct Poller {
    feed: Arc<dyn PriceFeed>,
    broadcaster: NetworkBroadcaster,
    interval: Duration,
    last_broadcast: Mutex<Option<LastBroadcast>>,
    status: StatusHandle,
}

impl Poller {
    pub fn new(feed: Arc<dyn PriceFeed>, broadcaster: NetworkBroadcaster, interval: Duration) -> Self {
        Self {
            feed,
            broadcaster,
            interval,
            last_broadcast: Mutex::new(None),
            status: Arc::new(RwLock::new(None)),
        }
    }

    pub fn status(&self) -> StatusHandle {
        Arc::clone(&self.status)
    }

    /// Run one full cycle.
    ///
    /// # Errors
    /// * `FeedUnavailable` - the price could not be fetched; no target was touched
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let observation = self.feed.fetch().await?;

        let targets = if self.already_broadcast(&observation) {
            debug!(
                usd_price = %observation.usd_price,
                observed_at = observation.observed_at,
                "Feed unchanged since last cycle"
            );
            None
        } else {
            Some(self.broadcaster.broadcast(&observation).await)
        };

        let report = CycleReport {
            broadcast: targets.is_some(),
            targets: targets.unwrap_or_default(),
            observation,
            finished_at: chrono::Utc::now().timestamp(),
        };

        if report.broadcast {
            self.remember(&report);
        }
        self.publish(&report).await;

        Ok(report)
    }

    /// Store `report` for the status API unless a newer cycle already has.
    ///
    /// Overlapping cycles can finish out of order; reports are ranked by
    /// observation time, then finish time.
    async fn publish(&self, report: &CycleReport) {
        let mut status = self.status.write().await;
        let newer = status.as_ref().is_none_or(|prev| {
            (report.observation.observed_at, report.finished_at)
                >= (prev.observation.observed_at, prev.finished_at)
        });

        if newer {
            *status = Some(report.clone());
        } else {
            debug!(
                observed_at = report.observation.observed_at,
                "Newer cycle already published, keeping it"
            );
        }
    }

    fn already_broadcast(&self, observation: &PriceObservation) -> bool {
        let last = self.last_broadcast.lock().unwrap_or_else(|e| e.into_inner());
        matches!(&*last, Some(prev) if prev.clean && prev.observation == *observation)
    }

    fn remember(&self, report: &CycleReport) {
        let mut last = self.last_broadcast.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(LastBroadcast {
            observation: report.observation.clone(),
            clean: report.failed_targets() == 0,
        });
    }

    async fn run_cycle_logged(&self) {
        info!("=== Starting poll cycle ===");

        match self.run_cycle().await {
            Ok(report) => {
                let updated = report
                    .targets
                    .iter()
                    .filter(|t| matches!(t.outcome, Outcome::Updated(_)))
                    .count();
                info!(
                    usd_price = %report.observation.usd_price,
                    targets = report.targets.len(),
                    updated,
                    failed = report.failed_targets(),
                    "Poll cycle finished"
                );
            }
            Err(e) => error!(error = %e, "Poll cycle aborted"),
        }
    }

    /// Tick every `interval` until `shutdown` resolves.
    ///
    /// The first cycle starts immediately. Cycles already in flight when
    /// shutdown arrives are left to finish on their own. An error from
    /// `shutdown` (a signal listener that could not be installed) stops the
    /// poller and is returned.
    pub async fn run(self: Arc<Self>, shutdown: impl Future<Output = std::io::Result<()>>) -> std::io::Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        tokio::pin!(shutdown);

        info!(
            interval_secs = self.interval.as_secs(),
            targets = self.broadcaster.targets().len(),
            "Poller started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let poller = Arc::clone(&self);
                    tokio::spawn(async move { poller.run_cycle_logged().await });
                }
                signal = &mut shutdown => {
                    if let Err(e) = &signal {
                        error!(error = %e, "Shutdown listener failed");
                    }
                    info!("Poller stopping");
                    return signal;
                }
            }
        }
    }
}
