//! Venue collaborator surface: types, the REST client, and a mock.

pub mod client;
pub mod mock;
pub mod types;

pub use client::TurbineClient;
pub use mock::{MockEvent, MockExchange};
pub use types::{
    OpenOrder, OrderRequest, Outcome, QuickMarket, Side, MAX_PRICE_FP, MIN_PRICE_FP, PRICE_SCALE,
    SHARE_SCALE,
};

use crate::error::{MarketError, TradingError};

/// Everything the quoting engine needs from the venue.
///
/// Submission is fire-and-forget: results are observed later by diffing the
/// local order cache against `list_open_orders`, which is the authoritative
/// source for fill reconciliation. Signing and transport details live behind
/// the implementation.
#[allow(async_fn_in_trait)]
pub trait Exchange {
    /// Our trader address, used to select our own orders.
    fn trader_address(&self) -> &str;

    /// The currently active quick market for an asset, if any.
    async fn get_active_market(&self, asset: &str) -> Result<Option<QuickMarket>, MarketError>;

    /// Submit an order; returns the venue's order id.
    async fn submit_order(&self, request: &OrderRequest) -> Result<String, TradingError>;

    /// Cancel a single order by id.
    async fn cancel_order(&self, order_id: &str) -> Result<(), TradingError>;

    /// All of our orders the venue reports as open on a market.
    async fn list_open_orders(&self, market_id: &str) -> Result<Vec<OpenOrder>, TradingError>;
}
