use crate::{
    error::{Result, SyncError},
    types::PriceObservation,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of the market price
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn fetch(&self) -> Result<PriceObservation>;
}

/// One element of the ticker response
#[derive(Debug, Deserialize)]
struct TickerEntry {
    price_usd: String,
    last_updated: String,
}

/// Client for a CoinMarketCap-style ticker endpoint
pub struct TickerClient {
    http: reqwest::Client,
    url: String,
}

impl TickerClient {
    pub fn new(url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl PriceFeed for TickerClient {
    async fn fetch(&self) -> Result<PriceObservation> {
        debug!("Fetching price from {}", self.url);

        let body = self
            .http
            .get(&self.url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| SyncError::FeedUnavailable(e.to_string()))?
            .text()
            .await
            .map_err(|e| SyncError::FeedUnavailable(e.to_string()))?;

        parse_ticker(&body)
    }
}

/// Parse `[{ "price_usd": "...", "last_updated": "..." }]`.
///
/// Any problem with the payload makes the whole feed unavailable; there is no
/// partial recovery.
fn parse_ticker(body: &str) -> Result<PriceObservation> {
    let entries: Vec<TickerEntry> = serde_json::from_str(body)
        .map_err(|e| SyncError::FeedUnavailable(format!("Malformed ticker JSON: {}", e)))?;

    let entry = entries
        .first()
        .ok_or_else(|| SyncError::FeedUnavailable("Empty ticker response".to_string()))?;

    let usd_price = Decimal::from_str(entry.price_usd.trim())
        .map_err(|e| SyncError::FeedUnavailable(format!("Bad price_usd {:?}: {}", entry.price_usd, e)))?;
    if usd_price <= Decimal::ZERO {
        return Err(SyncError::FeedUnavailable(format!("Non-positive price {}", usd_price)));
    }

    let observed_at = entry
        .last_updated
        .trim()
        .parse::<i64>()
        .map_err(|e| SyncError::FeedUnavailable(format!("Bad last_updated {:?}: {}", entry.last_updated, e)))?;
    if observed_at <= 0 {
        return Err(SyncError::FeedUnavailable(format!("Non-positive last_updated {}", observed_at)));
    }

    Ok(PriceObservation { usd_price, observed_at })
}
