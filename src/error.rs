//! Unified error types for the market maker.

use thiserror::Error;

/// Unified error type for the market maker.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Market-related error.
    #[error("market error: {0}")]
    Market(#[from] MarketError),

    /// Trading/order error.
    #[error("trading error: {0}")]
    Trading(#[from] TradingError),

    /// Price feed error.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Market discovery and management errors.
#[derive(Error, Debug)]
pub enum MarketError {
    /// No active quick market for the asset.
    #[error("no active quick market for {asset}")]
    NoActiveMarket {
        /// Asset symbol that had no market.
        asset: String,
    },

    /// Failed to fetch market information.
    #[error("failed to fetch market for {asset}: {reason}")]
    FetchFailed {
        /// Asset that failed.
        asset: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to parse market data.
    #[error("failed to parse market data: {0}")]
    ParseError(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Trading and order execution errors.
#[derive(Error, Debug)]
pub enum TradingError {
    /// Order submission failed.
    #[error("order submission failed: {0}")]
    SubmissionFailed(String),

    /// Failed to cancel order.
    #[error("failed to cancel order {order_id}: {reason}")]
    CancelFailed {
        /// Order ID that failed to cancel.
        order_id: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to query open orders.
    #[error("failed to query open orders: {0}")]
    OpenOrdersFailed(String),

    /// Invalid order parameters.
    #[error("invalid order parameters: {0}")]
    InvalidParams(String),

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
}

/// Price feed errors.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The feed returned no usable price.
    #[error("price unavailable: {0}")]
    Unavailable(String),

    /// No feed id configured for the asset.
    #[error("no price feed configured for asset {0}")]
    UnknownAsset(String),

    /// Failed to parse feed payload.
    #[error("failed to parse feed response: {0}")]
    ParseError(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
