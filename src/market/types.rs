//! Market types for 15-minute binary prediction markets.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Fixed-point scale for prices: 1_000_000 = 100% probability.
pub const PRICE_SCALE: i64 = 1_000_000;

/// Fixed-point scale for share sizes (6 decimals).
pub const SHARE_SCALE: i64 = 1_000_000;

/// Lowest quotable price (1% probability).
pub const MIN_PRICE_FP: i64 = 10_000;

/// Highest quotable price (99% probability).
pub const MAX_PRICE_FP: i64 = 990_000;

/// Convert a probability in [0, 1] to the platform's fixed-point price,
/// clamped to the quotable range. Rounds to the nearest tick so that e.g.
/// 0.49 maps to 490_000 despite its inexact binary representation.
pub fn probability_to_price_fp(prob: f64) -> i64 {
    ((prob * PRICE_SCALE as f64).round() as i64).clamp(MIN_PRICE_FP, MAX_PRICE_FP)
}

/// Market outcome for binary quick markets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Reference price ends above strike.
    #[strum(serialize = "yes", serialize = "YES")]
    #[default]
    Yes,
    /// Reference price ends below strike.
    #[strum(serialize = "no", serialize = "NO")]
    No,
}

impl Outcome {
    /// Get the opposite outcome.
    pub fn opposite(&self) -> Self {
        match self {
            Outcome::Yes => Outcome::No,
            Outcome::No => Outcome::Yes,
        }
    }

    /// Wire representation (0 = YES, 1 = NO).
    pub fn wire_code(&self) -> u8 {
        match self {
            Outcome::Yes => 0,
            Outcome::No => 1,
        }
    }

    /// Parse the wire representation.
    pub fn from_wire_code(code: u8) -> Self {
        if code == 0 {
            Outcome::Yes
        } else {
            Outcome::No
        }
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order.
    #[strum(serialize = "BUY", serialize = "buy")]
    Buy,
    /// Sell order.
    #[strum(serialize = "SELL", serialize = "sell")]
    Sell,
}

impl Side {
    /// Wire representation (0 = BUY, 1 = SELL).
    pub fn wire_code(&self) -> u8 {
        match self {
            Side::Buy => 0,
            Side::Sell => 1,
        }
    }

    /// Parse the wire representation.
    pub fn from_wire_code(code: u8) -> Self {
        if code == 0 {
            Side::Buy
        } else {
            Side::Sell
        }
    }
}

/// Active quick market for an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickMarket {
    /// Unique market identifier.
    pub market_id: String,
    /// Asset symbol (e.g., "BTC").
    pub asset: String,
    /// Reference price when the market opened, in 1e6 fixed-point USD.
    pub strike_price: i64,
    /// Unix timestamp when the market opened.
    pub start_time: i64,
    /// Unix timestamp when the market settles (start + 900s).
    pub end_time: i64,
}

impl QuickMarket {
    /// Duration of a quick market in seconds.
    pub const WINDOW_SECONDS: i64 = 900;

    /// Strike price in USD.
    pub fn strike_usd(&self) -> f64 {
        self.strike_price as f64 / PRICE_SCALE as f64
    }

    /// Seconds until settlement (negative once past).
    pub fn seconds_remaining(&self, now_unix: i64) -> i64 {
        self.end_time - now_unix
    }

    /// Check if the market has settled.
    pub fn is_closed(&self, now_unix: i64) -> bool {
        now_unix >= self.end_time
    }

    /// Format remaining time as "Xm Ys".
    pub fn time_remaining_str(&self, now_unix: i64) -> String {
        let remaining = self.seconds_remaining(now_unix);
        if remaining <= 0 {
            "CLOSED".to_string()
        } else {
            format!("{}m {}s", remaining / 60, remaining % 60)
        }
    }
}

/// Order submission request in platform units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    /// Market to quote.
    pub market_id: String,
    /// Outcome being traded.
    pub outcome: Outcome,
    /// Buy or sell.
    pub side: Side,
    /// Limit price in 1e6 fixed point, [1, 999_999].
    pub price: i64,
    /// Size in 6-decimal shares.
    pub size: i64,
    /// Unix timestamp after which the order expires.
    pub expiration: i64,
}

impl OrderRequest {
    /// Validate price and size ranges before submission.
    pub fn validate(&self) -> Result<(), String> {
        if self.market_id.is_empty() {
            return Err("market_id is required".to_string());
        }
        if !(1..=999_999).contains(&self.price) {
            return Err(format!("price must be in [1, 999999], got {}", self.price));
        }
        if self.size <= 0 {
            return Err(format!("size must be positive, got {}", self.size));
        }
        Ok(())
    }

    /// Price as a probability in [0, 1].
    pub fn price_probability(&self) -> f64 {
        self.price as f64 / PRICE_SCALE as f64
    }
}

/// An order the exchange reports as resting on the book.
#[derive(Debug, Clone)]
pub struct OpenOrder {
    /// Order identifier (hash).
    pub order_id: String,
    /// Market the order rests on.
    pub market_id: String,
    /// Outcome being traded.
    pub outcome: Outcome,
    /// Buy or sell.
    pub side: Side,
    /// Limit price in 1e6 fixed point.
    pub price: i64,
    /// Size in 6-decimal shares.
    pub size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_market() -> QuickMarket {
        QuickMarket {
            market_id: "mkt-1".to_string(),
            asset: "BTC".to_string(),
            strike_price: 100_000_000_000,
            start_time: 1_000,
            end_time: 1_900,
        }
    }

    #[test]
    fn outcome_opposite_and_wire() {
        assert_eq!(Outcome::Yes.opposite(), Outcome::No);
        assert_eq!(Outcome::No.opposite(), Outcome::Yes);
        assert_eq!(Outcome::from_wire_code(0), Outcome::Yes);
        assert_eq!(Outcome::from_wire_code(1), Outcome::No);
        assert_eq!(Outcome::Yes.wire_code(), 0);
    }

    #[test]
    fn outcome_from_string_works() {
        use std::str::FromStr;
        assert_eq!(Outcome::from_str("yes").unwrap(), Outcome::Yes);
        assert_eq!(Outcome::from_str("NO").unwrap(), Outcome::No);
        assert_eq!(Side::from_str("buy").unwrap(), Side::Buy);
        assert_eq!(Side::from_str("SELL").unwrap(), Side::Sell);
    }

    #[test]
    fn quick_market_timing() {
        let market = test_market();
        assert_eq!(market.strike_usd(), 100_000.0);
        assert_eq!(market.seconds_remaining(1_600), 300);
        assert!(!market.is_closed(1_600));
        assert!(market.is_closed(1_900));
        assert_eq!(market.time_remaining_str(1_600), "5m 0s");
        assert_eq!(market.time_remaining_str(2_000), "CLOSED");
    }

    #[test]
    fn probability_conversion_rounds_and_clamps() {
        assert_eq!(probability_to_price_fp(0.49), 490_000);
        assert_eq!(probability_to_price_fp(0.5), 500_000);
        assert_eq!(probability_to_price_fp(0.0), MIN_PRICE_FP);
        assert_eq!(probability_to_price_fp(1.0), MAX_PRICE_FP);
    }

    #[test]
    fn order_request_validation() {
        let valid = OrderRequest {
            market_id: "mkt-1".to_string(),
            outcome: Outcome::Yes,
            side: Side::Buy,
            price: 500_000,
            size: SHARE_SCALE,
            expiration: 0,
        };
        assert!(valid.validate().is_ok());
        assert_eq!(valid.price_probability(), 0.5);

        let bad_price = OrderRequest {
            price: 1_000_001,
            ..valid.clone()
        };
        assert!(bad_price.validate().is_err());

        let bad_size = OrderRequest {
            size: 0,
            ..valid.clone()
        };
        assert!(bad_size.validate().is_err());

        let no_market = OrderRequest {
            market_id: String::new(),
            ..valid
        };
        assert!(no_market.validate().is_err());
    }
}
