//! Per-tick orchestration: pricing, requoting, risk controls, reconciliation.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::engine::ladder::LadderBuilder;
use crate::engine::lifecycle::{self, Rotation};
use crate::engine::model::{ModelInputs, ProbabilityModel, Quote};
use crate::engine::state::{ActiveOrder, AssetMarketState, QuotePhase};
use crate::error::{BotError, TradingError};
use crate::feed::PriceFeed;
use crate::market::types::probability_to_price_fp;
use crate::market::{Exchange, OrderRequest, Outcome, Side};
use crate::metrics;

/// Snapshot of one asset's quoting state for the status API.
#[derive(Debug, Clone, Serialize)]
pub struct AssetStatus {
    /// Asset symbol.
    pub asset: String,
    /// Market currently quoted.
    pub market_id: String,
    /// State machine phase label.
    pub phase: &'static str,
    /// Current fair YES probability.
    pub yes_target: f64,
    /// Current fair NO probability.
    pub no_target: f64,
    /// Current spread.
    pub spread: f64,
    /// Orders believed live.
    pub open_orders: usize,
    /// Normalized net exposure.
    pub net_exposure: f64,
}

/// The quoting engine: one instance drives every tracked asset, one asset at
/// a time within a tick.
///
/// Every per-asset step returns a `Result`; a transport failure anywhere
/// skips that asset's tick and the next interval retries. Nothing in here is
/// fatal to the process.
pub struct RebalanceController<E, P> {
    exchange: E,
    feed: P,
    config: Config,
    model: ProbabilityModel,
    ladder: LadderBuilder,
    states: HashMap<String, AssetMarketState>,
}

impl<E: Exchange, P: PriceFeed> RebalanceController<E, P> {
    /// Create a controller over the given collaborators.
    pub fn new(exchange: E, feed: P, config: Config) -> Self {
        let model = ProbabilityModel::from_config(&config);
        let ladder = LadderBuilder::from_config(&config);
        Self {
            exchange,
            feed,
            config,
            model,
            ladder,
            states: HashMap::new(),
        }
    }

    /// Run one tick across all tracked assets.
    pub async fn tick(&mut self) {
        let now = OffsetDateTime::now_utc();
        for asset in self.config.asset_list() {
            if let Err(error) = self.tick_asset(&asset, now).await {
                warn!(asset = %asset, error = %error, "tick skipped, will retry next interval");
                metrics::inc_ticks_skipped();
            }
        }
    }

    /// Run one tick for a single asset at an explicit time.
    #[instrument(skip_all, fields(asset = %asset))]
    pub async fn tick_asset(&mut self, asset: &str, now: OffsetDateTime) -> Result<(), BotError> {
        let tick_start = Instant::now();

        let Some(market) = self.exchange.get_active_market(asset).await? else {
            debug!(asset, "no active market");
            return Ok(());
        };

        match lifecycle::observe_market(&mut self.states, &self.config, market) {
            Rotation::Created => info!(asset, "tracking first market for asset"),
            Rotation::Rotated { previous_market_id } => {
                info!(asset, previous = %previous_market_id, "market rotated, state reset");
                metrics::inc_market_rotations();
            }
            Rotation::Unchanged => {}
        }

        let Some(state) = self.states.get_mut(asset) else {
            return Ok(());
        };

        if matches!(state.phase, QuotePhase::OrdersPulled) {
            debug!(asset, "orders pulled, waiting for rotation");
            return Ok(());
        }

        // A quote resting through settlement carries unhedgeable tail risk:
        // pull everything once the market gets close enough.
        let now_unix = now.unix_timestamp();
        let remaining = state.market.seconds_remaining(now_unix);
        if remaining <= self.config.pull_window_secs {
            info!(asset, remaining, "inside end-of-market window, pulling all quotes");
            Self::cancel_tracked(&self.exchange, state).await;
            state.phase = QuotePhase::OrdersPulled;
            metrics::inc_order_pulls();
            return Ok(());
        }

        Self::reconcile_fills(&self.exchange, &self.config, state, now).await?;

        if let QuotePhase::CircuitBreakerTripped { until } = state.phase {
            if now < until {
                debug!(asset, "circuit breaker active, staying dark");
                return Ok(());
            }
            info!(asset, "circuit breaker cooldown elapsed, resuming");
            state.phase = QuotePhase::Quoting;
        }

        if state
            .inventory
            .is_adversely_selected(self.config.adverse_fill_threshold, now)
        {
            let until = now + Duration::seconds(self.config.breaker_cooldown_secs);
            warn!(
                asset,
                net_exposure = state.inventory.net_exposure(),
                cooldown_secs = self.config.breaker_cooldown_secs,
                "one-sided fill flow detected, tripping circuit breaker"
            );
            Self::cancel_tracked(&self.exchange, state).await;
            state.phase = QuotePhase::CircuitBreakerTripped { until };
            metrics::inc_breaker_trips();
            return Ok(());
        }

        let feed_start = Instant::now();
        let price = self.feed.latest_price(asset).await?;
        metrics::record_feed_latency(feed_start, asset);

        state.tracker.record_at(price, now);
        let signals = state.tracker.signals(now);

        let quote = self.model.compute(ModelInputs {
            strike_usd: state.market.strike_usd(),
            current_price: price,
            seconds_remaining: remaining,
            signals: &signals,
            net_exposure: state.inventory.net_exposure(),
        });

        let target_delta = (quote.yes_target - state.yes_target_at_last_rebalance).abs();
        let elapsed = state.seconds_since_rebalance(now);
        let should_rebalance = state.active_orders.is_empty()
            || (target_delta > self.config.rebalance_threshold
                && elapsed >= self.config.min_rebalance_secs)
            || (signals.volatility > self.config.volatility_alert_threshold
                && elapsed >= self.config.volatility_rebalance_floor_secs);

        // Adopt the fresh quote even when holding, so the next delta is
        // measured from current reality rather than stale state.
        state.yes_target = quote.yes_target;
        state.no_target = quote.no_target;
        state.current_spread = quote.spread;
        metrics::record_yes_target(asset, quote.yes_target);

        if !should_rebalance {
            debug!(
                asset,
                yes_target = quote.yes_target,
                delta = target_delta,
                "holding current ladder"
            );
            metrics::record_tick_latency(tick_start, asset);
            return Ok(());
        }

        info!(
            asset,
            price,
            yes_target = quote.yes_target,
            spread = quote.spread,
            delta = target_delta,
            remaining,
            "replacing quote ladder"
        );
        Self::graceful_rebalance(
            &self.exchange,
            &self.config,
            &self.ladder,
            state,
            &quote,
            now_unix,
        )
        .await;

        state.yes_target_at_last_rebalance = quote.yes_target;
        state.last_rebalance_time = Some(now);
        metrics::inc_rebalances();
        metrics::record_tick_latency(tick_start, asset);
        Ok(())
    }

    /// Cancel all outstanding orders for every tracked asset (shutdown path).
    pub async fn shutdown(&mut self) {
        for (asset, state) in self.states.iter_mut() {
            if state.active_orders.is_empty() {
                continue;
            }
            info!(asset = %asset, count = state.active_orders.len(), "cancelling outstanding orders");
            Self::cancel_tracked(&self.exchange, state).await;
        }
    }

    /// Snapshot of every tracked asset for the status API.
    pub fn statuses(&self) -> Vec<AssetStatus> {
        let mut statuses: Vec<AssetStatus> = self
            .states
            .iter()
            .map(|(asset, state)| AssetStatus {
                asset: asset.clone(),
                market_id: state.market.market_id.clone(),
                phase: state.phase.label(),
                yes_target: state.yes_target,
                no_target: state.no_target,
                spread: state.current_spread,
                open_orders: state.active_orders.len(),
                net_exposure: state.inventory.net_exposure(),
            })
            .collect();
        statuses.sort_by(|a, b| a.asset.cmp(&b.asset));
        statuses
    }

    /// Tracked state for an asset, if any.
    pub fn state(&self, asset: &str) -> Option<&AssetMarketState> {
        self.states.get(asset)
    }

    /// Cancel everything in the local order cache; individual failures are
    /// logged and do not block the remaining cancels.
    async fn cancel_tracked(exchange: &E, state: &mut AssetMarketState) {
        let order_ids: Vec<String> = state.active_orders.keys().cloned().collect();
        let results = join_all(order_ids.iter().map(|id| exchange.cancel_order(id))).await;

        let mut cancelled = 0u64;
        for (order_id, result) in order_ids.iter().zip(results) {
            match result {
                Ok(()) => cancelled += 1,
                Err(error) => warn!(order_id = %order_id, error = %error, "cancel failed"),
            }
        }
        state.active_orders.clear();
        metrics::inc_quotes_cancelled(cancelled);
    }

    /// Diff the local order cache against the exchange's open-order set.
    ///
    /// A tracked order the exchange no longer reports open is an implicit
    /// fill: it is booked into the inventory and replaced at the *current*
    /// fair price for its side, never at the stale fill price.
    async fn reconcile_fills(
        exchange: &E,
        config: &Config,
        state: &mut AssetMarketState,
        now: OffsetDateTime,
    ) -> Result<(), TradingError> {
        if state.active_orders.is_empty() {
            return Ok(());
        }

        let open = exchange.list_open_orders(&state.market.market_id).await?;
        let open_ids: HashSet<&str> = open.iter().map(|o| o.order_id.as_str()).collect();

        let filled: Vec<(String, ActiveOrder)> = state
            .active_orders
            .iter()
            .filter(|(order_id, _)| !open_ids.contains(order_id.as_str()))
            .map(|(order_id, order)| (order_id.clone(), *order))
            .collect();

        for (order_id, order) in filled {
            state.active_orders.remove(&order_id);
            state
                .inventory
                .record_fill_at(order.side, order.outcome, order.price, order.size, now);
            metrics::inc_fills_detected();
            info!(
                order_id = %order_id,
                outcome = %order.outcome,
                side = %order.side,
                price = order.price,
                size = order.size,
                "fill detected via reconciliation"
            );

            let target = match order.outcome {
                Outcome::Yes => state.yes_target,
                Outcome::No => state.no_target,
            };
            let half = state.current_spread / 2.0;
            let price = probability_to_price_fp(match order.side {
                Side::Buy => target - half,
                Side::Sell => target + half,
            });

            let replacement = OrderRequest {
                market_id: state.market.market_id.clone(),
                outcome: order.outcome,
                side: order.side,
                price,
                size: order.size,
                expiration: now.unix_timestamp() + config.order_expiration_secs,
            };
            match exchange.submit_order(&replacement).await {
                Ok(new_id) => {
                    state.active_orders.insert(
                        new_id,
                        ActiveOrder {
                            outcome: order.outcome,
                            side: order.side,
                            price,
                            size: order.size,
                        },
                    );
                    metrics::inc_quotes_submitted(1);
                }
                Err(error) => {
                    warn!(error = %error, "failed to replace filled order");
                }
            }
        }
        Ok(())
    }

    /// Replace the ladder without a liquidity gap: the new ladder goes up
    /// first, in-flight matches get a moment to settle, then the old orders
    /// come down.
    async fn graceful_rebalance(
        exchange: &E,
        config: &Config,
        ladder: &LadderBuilder,
        state: &mut AssetMarketState,
        quote: &Quote,
        now_unix: i64,
    ) {
        let requests = ladder.build(
            &state.market.market_id,
            quote,
            config.allocation_usdc,
            now_unix,
        );
        let old_ids: Vec<String> = state.active_orders.keys().cloned().collect();

        // Submissions are independent I/O; run them concurrently and join
        // before touching state.
        let results = join_all(requests.iter().map(|r| exchange.submit_order(r))).await;

        let mut placed = 0u64;
        for (request, result) in requests.iter().zip(results) {
            match result {
                Ok(order_id) => {
                    state.active_orders.insert(
                        order_id,
                        ActiveOrder {
                            outcome: request.outcome,
                            side: request.side,
                            price: request.price,
                            size: request.size,
                        },
                    );
                    placed += 1;
                }
                Err(error) => {
                    warn!(
                        outcome = %request.outcome,
                        side = %request.side,
                        price = request.price,
                        error = %error,
                        "failed to place ladder level"
                    );
                }
            }
        }
        metrics::inc_quotes_submitted(placed);
        debug!(placed, total = requests.len(), "new ladder submitted");

        if old_ids.is_empty() {
            return;
        }

        if config.settle_pause_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(config.settle_pause_ms)).await;
        }

        let results = join_all(old_ids.iter().map(|id| exchange.cancel_order(id))).await;
        let mut cancelled = 0u64;
        for (order_id, result) in old_ids.iter().zip(results) {
            match result {
                Ok(()) => cancelled += 1,
                Err(error) => warn!(order_id = %order_id, error = %error, "cancel failed"),
            }
            state.active_orders.remove(order_id);
        }
        metrics::inc_quotes_cancelled(cancelled);
    }
}
