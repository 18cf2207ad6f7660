//! Market rotation handling.
//!
//! Quick markets rotate every 15 minutes. Stateful components (price window,
//! inventory, the quote state machine) are only correct within one market's
//! life, so rotation replaces the whole per-asset state rather than patching
//! fields.

use std::collections::HashMap;

use crate::config::Config;
use crate::engine::state::AssetMarketState;
use crate::market::QuickMarket;

/// What happened when the active market for an asset was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rotation {
    /// First market seen for this asset.
    Created,
    /// A new market replaced the previous one; all state was reset.
    Rotated {
        /// Market id that was retired.
        previous_market_id: String,
    },
    /// Same market as last tick.
    Unchanged,
}

/// Reconcile the tracked state for an asset against the currently active market.
pub fn observe_market(
    states: &mut HashMap<String, AssetMarketState>,
    config: &Config,
    market: QuickMarket,
) -> Rotation {
    let asset = market.asset.clone();
    match states.get_mut(&asset) {
        None => {
            states.insert(asset, AssetMarketState::new(market, config));
            Rotation::Created
        }
        Some(state) if state.market.market_id != market.market_id => {
            let previous_market_id = state.market.market_id.clone();
            *state = AssetMarketState::new(market, config);
            Rotation::Rotated { previous_market_id }
        }
        Some(state) => {
            // Settlement time can drift; track the venue's latest word.
            state.market.end_time = market.end_time;
            Rotation::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state::QuotePhase;
    use crate::market::{Outcome, Side};
    use time::macros::datetime;

    fn market(id: &str, end_time: i64) -> QuickMarket {
        QuickMarket {
            market_id: id.to_string(),
            asset: "BTC".to_string(),
            strike_price: 100_000_000_000,
            start_time: 0,
            end_time,
        }
    }

    #[test]
    fn first_observation_creates_state() {
        let mut states = HashMap::new();
        let config = Config::default();
        let rotation = observe_market(&mut states, &config, market("mkt-1", 900));
        assert_eq!(rotation, Rotation::Created);
        assert!(states.contains_key("BTC"));
    }

    #[test]
    fn same_market_updates_end_time_only() {
        let mut states = HashMap::new();
        let config = Config::default();
        observe_market(&mut states, &config, market("mkt-1", 900));
        if let Some(state) = states.get_mut("BTC") {
            state.yes_target = 0.7;
        }

        let rotation = observe_market(&mut states, &config, market("mkt-1", 905));
        assert_eq!(rotation, Rotation::Unchanged);
        let state = &states["BTC"];
        assert_eq!(state.market.end_time, 905);
        assert_eq!(state.yes_target, 0.7);
    }

    #[test]
    fn new_market_resets_everything() {
        let mut states = HashMap::new();
        let config = Config::default();
        observe_market(&mut states, &config, market("mkt-1", 900));

        {
            let state = states.get_mut("BTC").expect("state exists");
            state.yes_target = 0.9;
            state.phase = QuotePhase::OrdersPulled;
            state.tracker.record_at(100_000.0, datetime!(2025-06-01 12:00:00 UTC));
            state.inventory.record_fill_at(
                Side::Buy,
                Outcome::Yes,
                500_000,
                1_000_000,
                datetime!(2025-06-01 12:00:00 UTC),
            );
        }

        let rotation = observe_market(&mut states, &config, market("mkt-2", 1_800));
        assert_eq!(
            rotation,
            Rotation::Rotated {
                previous_market_id: "mkt-1".to_string()
            }
        );

        let state = &states["BTC"];
        assert_eq!(state.market.market_id, "mkt-2");
        assert_eq!(state.yes_target, 0.5);
        assert_eq!(state.phase, QuotePhase::Quoting);
        assert!(state.tracker.is_empty());
        assert_eq!(state.inventory.fill_count(), 0);
    }
}
