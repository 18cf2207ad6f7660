//! Reference price feed collaborator surface.

pub mod mock;
pub mod pyth;

pub use mock::MockFeed;
pub use pyth::PythFeed;

use crate::error::FeedError;

/// A source of the latest reference price for an asset, in USD.
///
/// Implementations must be idempotently re-callable; the engine polls once
/// per tick and skips the tick when the call fails.
#[allow(async_fn_in_trait)]
pub trait PriceFeed {
    /// Latest price for an asset symbol (e.g., "BTC"), in USD.
    async fn latest_price(&self, asset: &str) -> Result<f64, FeedError>;
}
