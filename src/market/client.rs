//! Venue REST API client.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::{MarketError, TradingError};
use crate::market::types::{OpenOrder, OrderRequest, Outcome, QuickMarket, Side};
use crate::market::Exchange;

/// REST client for the venue's quick-market and order endpoints.
///
/// In dry-run mode submissions land in an internal paper book instead of the
/// venue; market discovery still hits the real API so the simulation prices
/// real markets.
#[derive(Debug)]
pub struct TurbineClient {
    http: reqwest::Client,
    api_url: String,
    api_key_id: Option<String>,
    api_key_secret: Option<String>,
    trader_address: String,
    paper: Option<Mutex<PaperBook>>,
}

#[derive(Debug, Default)]
struct PaperBook {
    next_id: u64,
    open: HashMap<String, OrderRequest>,
}

impl TurbineClient {
    /// Create a client from config with tuned HTTP settings.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(std::time::Duration::from_millis(500))
            .tcp_nodelay(true)
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(config.http_pool_size)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_url: config.turbine_api_url.clone(),
            api_key_id: config.turbine_api_key_id.clone(),
            api_key_secret: config.turbine_api_key_secret.clone(),
            trader_address: config.turbine_trader_address.clone(),
            paper: config.dry_run.then(|| Mutex::new(PaperBook::default())),
        }
    }

    /// The REST API base URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Whether orders are being paper-traded.
    pub fn is_dry_run(&self) -> bool {
        self.paper.is_some()
    }

    fn auth_headers(&self) -> Result<Vec<(&'static str, String)>, TradingError> {
        match (&self.api_key_id, &self.api_key_secret) {
            (Some(id), Some(secret)) => Ok(vec![
                ("X-Api-Key-Id", id.clone()),
                ("X-Api-Key-Secret", secret.clone()),
            ]),
            _ => Err(TradingError::AuthenticationFailed(
                "TURBINE_API_KEY_ID / TURBINE_API_KEY_SECRET not configured".to_string(),
            )),
        }
    }

    fn paper_book(&self) -> Option<std::sync::MutexGuard<'_, PaperBook>> {
        self.paper.as_ref().and_then(|m| m.lock().ok())
    }
}

impl Exchange for TurbineClient {
    fn trader_address(&self) -> &str {
        &self.trader_address
    }

    #[instrument(skip(self))]
    async fn get_active_market(&self, asset: &str) -> Result<Option<QuickMarket>, MarketError> {
        let url = format!("{}/api/v1/quick-markets/{}", self.api_url, asset);
        let response = self.http.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(MarketError::FetchFailed {
                asset: asset.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let envelope: QuickMarketEnvelope = response
            .json()
            .await
            .map_err(|e| MarketError::ParseError(format!("quick market payload: {e}")))?;

        let Some(data) = envelope.quick_market else {
            return Ok(None);
        };
        let Some(market_id) = data.market_id else {
            return Ok(None);
        };

        Ok(Some(QuickMarket {
            market_id,
            // The engine keys state by the symbol it polls with.
            asset: data
                .asset
                .unwrap_or_else(|| asset.to_string())
                .to_uppercase(),
            strike_price: data.start_price,
            start_time: data.start_time,
            end_time: data.end_time,
        }))
    }

    #[instrument(skip(self, request), fields(market = %request.market_id, side = %request.side, outcome = %request.outcome))]
    async fn submit_order(&self, request: &OrderRequest) -> Result<String, TradingError> {
        request.validate().map_err(TradingError::InvalidParams)?;

        if let Some(mut book) = self.paper_book() {
            book.next_id += 1;
            let order_id = format!("paper-{}", book.next_id);
            book.open.insert(order_id.clone(), request.clone());
            debug!(order_id = %order_id, "paper order recorded");
            return Ok(order_id);
        }

        let headers = self.auth_headers()?;
        let nonce = chrono::Utc::now().timestamp_millis().to_string();
        let payload = OrderPayload {
            market_id: &request.market_id,
            trader: &self.trader_address,
            side: request.side.wire_code(),
            outcome: request.outcome.wire_code(),
            price: request.price,
            size: request.size,
            expiration: request.expiration,
            nonce: &nonce,
        };

        let url = format!("{}/api/v1/orders", self.api_url);
        let mut req = self.http.post(&url).json(&payload);
        for (key, value) in headers {
            req = req.header(key, value);
        }

        let response = req
            .send()
            .await
            .map_err(|e| TradingError::SubmissionFailed(format!("http request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TradingError::SubmissionFailed(format!(
                "HTTP {status} - {body}"
            )));
        }

        let result: SubmitResponse = response
            .json()
            .await
            .map_err(|e| TradingError::SubmissionFailed(format!("bad response: {e}")))?;

        if let Some(error) = result.error {
            return Err(TradingError::SubmissionFailed(error));
        }
        result
            .order_hash
            .ok_or_else(|| TradingError::SubmissionFailed("no order hash in response".to_string()))
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order_id: &str) -> Result<(), TradingError> {
        if let Some(mut book) = self.paper_book() {
            book.open.remove(order_id);
            return Ok(());
        }

        let headers = self.auth_headers()?;
        let url = format!("{}/api/v1/orders/{}", self.api_url, order_id);
        let mut req = self.http.delete(&url);
        for (key, value) in headers {
            req = req.header(key, value);
        }

        let response = req.send().await.map_err(|e| TradingError::CancelFailed {
            order_id: order_id.to_string(),
            reason: format!("{e}"),
        })?;

        // A cancel for an order the venue no longer knows is not a failure.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(order_id, "cancel target already gone");
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(TradingError::CancelFailed {
                order_id: order_id.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_open_orders(&self, market_id: &str) -> Result<Vec<OpenOrder>, TradingError> {
        if let Some(book) = self.paper_book() {
            return Ok(book
                .open
                .iter()
                .filter(|(_, o)| o.market_id == market_id)
                .map(|(id, o)| OpenOrder {
                    order_id: id.clone(),
                    market_id: o.market_id.clone(),
                    outcome: o.outcome,
                    side: o.side,
                    price: o.price,
                    size: o.size,
                })
                .collect());
        }

        let headers = self.auth_headers()?;
        let url = format!("{}/api/v1/orders", self.api_url);
        let mut req = self.http.get(&url).query(&[
            ("trader", self.trader_address.as_str()),
            ("market_id", market_id),
            ("status", "open"),
        ]);
        for (key, value) in headers {
            req = req.header(key, value);
        }

        let response = req
            .send()
            .await
            .map_err(|e| TradingError::OpenOrdersFailed(format!("http request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TradingError::OpenOrdersFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let envelope: OrdersEnvelope = response
            .json()
            .await
            .map_err(|e| TradingError::OpenOrdersFailed(format!("bad response: {e}")))?;

        let orders = envelope
            .orders
            .unwrap_or_default()
            .into_iter()
            .filter_map(|o| {
                let order_id = o.order_hash?;
                Some(OpenOrder {
                    order_id,
                    market_id: o.market_id.unwrap_or_else(|| market_id.to_string()),
                    outcome: Outcome::from_wire_code(o.outcome),
                    side: Side::from_wire_code(o.side),
                    price: o.price,
                    size: o.size,
                })
            })
            .collect::<Vec<_>>();

        if orders.is_empty() {
            debug!(market_id, "no open orders reported");
        } else {
            debug!(market_id, count = orders.len(), "open orders fetched");
        }
        Ok(orders)
    }
}

/// `GET /api/v1/quick-markets/{asset}` envelope.
#[derive(Debug, Deserialize)]
struct QuickMarketEnvelope {
    #[serde(rename = "quickMarket")]
    quick_market: Option<QuickMarketData>,
}

#[derive(Debug, Deserialize)]
struct QuickMarketData {
    #[serde(rename = "marketId")]
    market_id: Option<String>,
    asset: Option<String>,
    #[serde(rename = "startPrice", default)]
    start_price: i64,
    #[serde(rename = "startTime", default)]
    start_time: i64,
    #[serde(rename = "endTime", default)]
    end_time: i64,
}

/// `POST /api/v1/orders` body.
#[derive(Debug, Serialize)]
struct OrderPayload<'a> {
    #[serde(rename = "marketId")]
    market_id: &'a str,
    trader: &'a str,
    side: u8,
    outcome: u8,
    price: i64,
    size: i64,
    expiration: i64,
    nonce: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(alias = "orderHash", alias = "order_hash", alias = "id")]
    order_hash: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrdersEnvelope {
    orders: Option<Vec<OpenOrderData>>,
}

#[derive(Debug, Deserialize)]
struct OpenOrderData {
    #[serde(rename = "orderHash", alias = "order_hash")]
    order_hash: Option<String>,
    #[serde(rename = "marketId", alias = "market_id")]
    market_id: Option<String>,
    #[serde(default)]
    side: u8,
    #[serde(default)]
    outcome: u8,
    #[serde(default)]
    price: i64,
    #[serde(default)]
    size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::SHARE_SCALE;

    fn dry_run_client() -> TurbineClient {
        let config = Config {
            turbine_trader_address: "0x1234567890abcdef1234567890abcdef12345678".to_string(),
            dry_run: true,
            ..Config::default()
        };
        TurbineClient::new(&config)
    }

    fn order(market_id: &str, price: i64) -> OrderRequest {
        OrderRequest {
            market_id: market_id.to_string(),
            outcome: Outcome::Yes,
            side: Side::Buy,
            price,
            size: SHARE_SCALE,
            expiration: 300,
        }
    }

    #[tokio::test]
    async fn paper_orders_round_trip() {
        let client = dry_run_client();
        assert!(client.is_dry_run());

        let id = client.submit_order(&order("mkt-1", 490_000)).await.unwrap();
        assert!(id.starts_with("paper-"));

        let open = client.list_open_orders("mkt-1").await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].order_id, id);
        assert_eq!(open[0].price, 490_000);

        // Orders on other markets are not reported.
        assert!(client.list_open_orders("mkt-2").await.unwrap().is_empty());

        client.cancel_order(&id).await.unwrap();
        assert!(client.list_open_orders("mkt-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn paper_submit_still_validates() {
        let client = dry_run_client();
        let bad = OrderRequest {
            price: 0,
            ..order("mkt-1", 490_000)
        };
        assert!(matches!(
            client.submit_order(&bad).await,
            Err(TradingError::InvalidParams(_))
        ));
    }

    #[test]
    fn live_client_requires_credentials() {
        let config = Config {
            turbine_trader_address: "0x1234567890abcdef1234567890abcdef12345678".to_string(),
            dry_run: false,
            ..Config::default()
        };
        let client = TurbineClient::new(&config);
        assert!(!client.is_dry_run());
        assert!(client.auth_headers().is_err());
    }

    #[test]
    fn quick_market_envelope_parses() {
        let json = r#"{"quickMarket":{"marketId":"mkt-9","asset":"BTC","startPrice":100000000000,"startTime":1000,"endTime":1900}}"#;
        let envelope: QuickMarketEnvelope = serde_json::from_str(json).unwrap();
        let data = envelope.quick_market.unwrap();
        assert_eq!(data.market_id.as_deref(), Some("mkt-9"));
        assert_eq!(data.start_price, 100_000_000_000);
        assert_eq!(data.end_time, 1_900);
    }

    #[test]
    fn orders_envelope_parses_wire_codes() {
        let json = r#"{"orders":[{"orderHash":"0xabc","marketId":"mkt-1","side":1,"outcome":0,"price":510000,"size":2000000}]}"#;
        let envelope: OrdersEnvelope = serde_json::from_str(json).unwrap();
        let orders = envelope.orders.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(Side::from_wire_code(orders[0].side), Side::Sell);
        assert_eq!(Outcome::from_wire_code(orders[0].outcome), Outcome::Yes);
    }
}
