//! Per-asset quoting state.

use std::collections::HashMap;

use time::OffsetDateTime;

use crate::config::Config;
use crate::engine::inventory::InventoryTracker;
use crate::engine::tracker::PriceTracker;
use crate::market::{Outcome, QuickMarket, Side};

/// Where the engine is in a market's quoting life.
///
/// `OrdersPulled` is terminal for the remainder of the market; only rotation
/// to a fresh market leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotePhase {
    /// Normal operation: pricing and requoting every tick.
    Quoting,
    /// All quotes withdrawn after adverse selection; dark until `until`.
    CircuitBreakerTripped {
        /// When the cooldown ends and quoting may resume.
        until: OffsetDateTime,
    },
    /// End-of-market pull executed; no quoting until rotation.
    OrdersPulled,
}

impl QuotePhase {
    /// Short label for logs and the status API.
    pub fn label(&self) -> &'static str {
        match self {
            QuotePhase::Quoting => "quoting",
            QuotePhase::CircuitBreakerTripped { .. } => "circuit_breaker",
            QuotePhase::OrdersPulled => "orders_pulled",
        }
    }
}

/// A locally tracked live order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveOrder {
    /// Outcome being quoted.
    pub outcome: Outcome,
    /// Buy or sell.
    pub side: Side,
    /// Limit price in 1e6 fixed point.
    pub price: i64,
    /// Size in 6-decimal shares.
    pub size: i64,
}

/// All mutable state the engine holds for one asset's current market.
///
/// Replaced wholesale on market rotation. `active_orders` is a cache of what
/// this engine believes is live; the exchange's open-order list is the truth
/// it gets reconciled against every tick.
#[derive(Debug)]
pub struct AssetMarketState {
    /// The market currently being quoted.
    pub market: QuickMarket,
    /// Latest fair YES probability.
    pub yes_target: f64,
    /// Always 1 - yes_target.
    pub no_target: f64,
    /// Latest computed spread.
    pub current_spread: f64,
    /// YES target when quotes were last replaced.
    pub yes_target_at_last_rebalance: f64,
    /// When quotes were last replaced.
    pub last_rebalance_time: Option<OffsetDateTime>,
    /// Orders this engine believes are resting, keyed by order id.
    pub active_orders: HashMap<String, ActiveOrder>,
    /// Price observation window.
    pub tracker: PriceTracker,
    /// Position and fill-flow bookkeeping.
    pub inventory: InventoryTracker,
    /// Current point in the quoting state machine.
    pub phase: QuotePhase,
}

impl AssetMarketState {
    /// Fresh state for a newly observed market.
    pub fn new(market: QuickMarket, config: &Config) -> Self {
        Self {
            market,
            yes_target: 0.5,
            no_target: 0.5,
            current_spread: config.base_spread,
            yes_target_at_last_rebalance: 0.5,
            last_rebalance_time: None,
            active_orders: HashMap::new(),
            tracker: PriceTracker::new(
                config.price_window_max_samples,
                config.price_window_max_age_secs,
                config.momentum_ema_alpha,
            ),
            inventory: InventoryTracker::new(config.adverse_window_secs),
            phase: QuotePhase::Quoting,
        }
    }

    /// Seconds between `now` and the last rebalance; `i64::MAX` if never.
    pub fn seconds_since_rebalance(&self, now: OffsetDateTime) -> i64 {
        match self.last_rebalance_time {
            Some(at) => (now - at).whole_seconds(),
            None => i64::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn market() -> QuickMarket {
        QuickMarket {
            market_id: "mkt-1".to_string(),
            asset: "BTC".to_string(),
            strike_price: 100_000_000_000,
            start_time: 0,
            end_time: 900,
        }
    }

    #[test]
    fn new_state_starts_neutral_and_quoting() {
        let state = AssetMarketState::new(market(), &Config::default());
        assert_eq!(state.yes_target, 0.5);
        assert_eq!(state.no_target, 0.5);
        assert_eq!(state.phase, QuotePhase::Quoting);
        assert!(state.active_orders.is_empty());
        assert_eq!(state.seconds_since_rebalance(datetime!(2025-06-01 12:00:00 UTC)), i64::MAX);
    }

    #[test]
    fn seconds_since_rebalance_counts_elapsed() {
        let mut state = AssetMarketState::new(market(), &Config::default());
        let t = datetime!(2025-06-01 12:00:00 UTC);
        state.last_rebalance_time = Some(t);
        assert_eq!(state.seconds_since_rebalance(t + time::Duration::seconds(7)), 7);
    }

    #[test]
    fn phase_labels() {
        assert_eq!(QuotePhase::Quoting.label(), "quoting");
        assert_eq!(QuotePhase::OrdersPulled.label(), "orders_pulled");
        let tripped = QuotePhase::CircuitBreakerTripped {
            until: datetime!(2025-06-01 12:00:00 UTC),
        };
        assert_eq!(tripped.label(), "circuit_breaker");
    }
}
