//! Pyth Network price feed via the Hermes REST API.
//!
//! Same oracle the venue settles against, so quoting and settlement see the
//! same number.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::FeedError;
use crate::feed::PriceFeed;

/// Hermes price feed ids per asset symbol.
static FEED_IDS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            "BTC",
            "0xe62df6c8b4a85fe1a67db44dc12de5db330f7ac66b72dc658afedf0f4a415b43",
        ),
        (
            "ETH",
            "0xff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace",
        ),
    ])
});

/// Pyth Hermes client.
#[derive(Debug, Clone)]
pub struct PythFeed {
    http: reqwest::Client,
    hermes_url: String,
}

impl PythFeed {
    /// Create a feed client from config.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.http_timeout_ms))
            .tcp_nodelay(true)
            .build()
            .unwrap_or_default();
        Self {
            http,
            hermes_url: config.pyth_hermes_url.clone(),
        }
    }

    /// The Hermes feed id for an asset, if one is configured.
    pub fn feed_id(asset: &str) -> Option<&'static str> {
        FEED_IDS.get(asset).copied()
    }
}

impl PriceFeed for PythFeed {
    #[instrument(skip(self))]
    async fn latest_price(&self, asset: &str) -> Result<f64, FeedError> {
        let feed_id =
            Self::feed_id(asset).ok_or_else(|| FeedError::UnknownAsset(asset.to_string()))?;

        let url = format!("{}/v2/updates/price/latest", self.hermes_url);
        let response = self
            .http
            .get(&url)
            .query(&[("ids[]", feed_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::Unavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: HermesResponse = response
            .json()
            .await
            .map_err(|e| FeedError::ParseError(format!("{e}")))?;

        let parsed = body
            .parsed
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| FeedError::Unavailable("no parsed price in response".to_string()))?;

        let mantissa: f64 = parsed
            .price
            .price
            .parse()
            .map_err(|e| FeedError::ParseError(format!("price mantissa: {e}")))?;
        let price = mantissa * 10f64.powi(parsed.price.expo);

        if price <= 0.0 || !price.is_finite() {
            return Err(FeedError::Unavailable(format!(
                "non-positive price {price} for {asset}"
            )));
        }

        debug!(asset, price, "price fetched");
        Ok(price)
    }
}

#[derive(Debug, Deserialize)]
struct HermesResponse {
    parsed: Option<Vec<ParsedEntry>>,
}

#[derive(Debug, Deserialize)]
struct ParsedEntry {
    price: PriceData,
}

#[derive(Debug, Deserialize)]
struct PriceData {
    /// Mantissa as a decimal string.
    price: String,
    /// Usually -8 for crypto feeds.
    expo: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_assets_have_feed_ids() {
        assert!(PythFeed::feed_id("BTC").is_some());
        assert!(PythFeed::feed_id("ETH").is_some());
        assert!(PythFeed::feed_id("DOGE").is_none());
    }

    #[test]
    fn hermes_payload_parses_and_scales() {
        let json = r#"{"parsed":[{"price":{"price":"10045012345678","expo":-8}}]}"#;
        let body: HermesResponse = serde_json::from_str(json).unwrap();
        let entry = &body.parsed.as_ref().unwrap()[0];
        let mantissa: f64 = entry.price.price.parse().unwrap();
        let price = mantissa * 10f64.powi(entry.price.expo);
        assert!((price - 100_450.123_456_78).abs() < 1e-6);
    }

    #[test]
    fn empty_payload_is_detected() {
        let json = r#"{"parsed":[]}"#;
        let body: HermesResponse = serde_json::from_str(json).unwrap();
        assert!(body.parsed.unwrap().is_empty());
    }
}
