//! Multi-level quote ladder construction with geometric capital allocation.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use smallvec::SmallVec;
use tracing::debug;

use crate::config::Config;
use crate::engine::model::{Quote, MOMENTUM_NUDGE_CLAMP};
use crate::market::types::probability_to_price_fp;
use crate::market::{OrderRequest, Outcome, Side, PRICE_SCALE, SHARE_SCALE};

/// Builds priced, sized order ladders from a quote target and a capital budget.
#[derive(Debug, Clone)]
pub struct LadderBuilder {
    num_levels: usize,
    lambda: f64,
    suppression_deviation: f64,
    alloc_min: f64,
    alloc_max: f64,
    min_level_notional: Decimal,
    order_expiration_secs: i64,
}

impl LadderBuilder {
    /// Build a ladder builder from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            num_levels: config.num_levels.max(1),
            lambda: config.geometric_lambda,
            suppression_deviation: config.suppression_deviation,
            alloc_min: config.alloc_skew_min,
            alloc_max: config.alloc_skew_max,
            min_level_notional: config.min_level_notional,
            order_expiration_secs: config.order_expiration_secs,
        }
    }

    /// Produce the full two-outcome ladder for a market.
    ///
    /// Returns an empty vec when both outcomes end up suppressed or the
    /// budget is too small for any level to clear the minimum notional.
    pub fn build(
        &self,
        market_id: &str,
        quote: &Quote,
        budget: Decimal,
        now_unix: i64,
    ) -> Vec<OrderRequest> {
        let mut orders = Vec::with_capacity(self.num_levels * 4);
        let suppressed = self.suppressed_outcome(quote);
        let expiration = now_unix + self.order_expiration_secs;

        let yes_fraction = quote.yes_target.clamp(self.alloc_min, self.alloc_max);
        let budget_yes = budget * decimal(yes_fraction);
        let budget_no = budget - budget_yes;

        for (outcome, target, bucket) in [
            (Outcome::Yes, quote.yes_target, budget_yes),
            (Outcome::No, quote.no_target, budget_no),
        ] {
            if suppressed == Some(outcome) {
                debug!(%outcome, target, "outcome suppressed, not quoting");
                continue;
            }
            self.build_outcome(market_id, outcome, target, quote.spread, bucket, expiration, &mut orders);
        }

        orders
    }

    fn build_outcome(
        &self,
        market_id: &str,
        outcome: Outcome,
        target: f64,
        spread: f64,
        bucket: Decimal,
        expiration: i64,
        orders: &mut Vec<OrderRequest>,
    ) {
        let half = spread / 2.0;

        // Bands one spread wide on each side of the target.
        let bid_max = (target - half).clamp(0.01, 0.99);
        let bid_min = (bid_max - spread).clamp(0.01, bid_max);
        let ask_min = (target + half).clamp(0.01, 0.99);
        let ask_max = (ask_min + spread).clamp(ask_min, 0.99);

        // Capital prefers buying the cheap side of an outcome.
        let buy_fraction = (1.0 - target).clamp(self.alloc_min, self.alloc_max);
        let buy_bucket = bucket * decimal(buy_fraction);
        let sell_bucket = bucket - buy_bucket;

        let buy_weights = geometric_weights(self.num_levels, self.lambda, Side::Buy);
        let sell_weights = geometric_weights(self.num_levels, self.lambda, Side::Sell);
        let bid_prices = level_prices(bid_min, bid_max, self.num_levels);
        let ask_prices = level_prices(ask_min, ask_max, self.num_levels);

        for (side, weights, prices, side_bucket) in [
            (Side::Buy, &buy_weights, &bid_prices, buy_bucket),
            (Side::Sell, &sell_weights, &ask_prices, sell_bucket),
        ] {
            for (i, (&weight, &price)) in weights.iter().zip(prices.iter()).enumerate() {
                let level_usdc = side_bucket * decimal(weight);
                if level_usdc < self.min_level_notional {
                    continue;
                }
                let size = shares_from_usdc(level_usdc, price);
                if size <= 0 {
                    continue;
                }
                let request = OrderRequest {
                    market_id: market_id.to_string(),
                    outcome,
                    side,
                    price,
                    size,
                    expiration,
                };
                if let Err(reason) = request.validate() {
                    debug!(%outcome, %side, level = i, reason = %reason, "skipping invalid ladder level");
                    continue;
                }
                orders.push(request);
            }
        }
    }

    /// Decide whether one outcome is priced too near certainty to quote.
    ///
    /// The raw trigger is the deviation of the YES target from 0.5. A
    /// momentum nudge pointing the same way at half its clamp or more
    /// triggers suppression from 70% of the raw threshold.
    pub fn suppressed_outcome(&self, quote: &Quote) -> Option<Outcome> {
        let deviation = quote.yes_target - 0.5;
        if deviation.abs() > self.suppression_deviation {
            return Some(losing_outcome(deviation));
        }

        let nudge = quote.momentum_nudge;
        if deviation.abs() > 0.7 * self.suppression_deviation
            && nudge != 0.0
            && nudge.signum() == deviation.signum()
            && nudge.abs() >= MOMENTUM_NUDGE_CLAMP / 2.0
        {
            return Some(losing_outcome(deviation));
        }

        None
    }
}

fn losing_outcome(deviation: f64) -> Outcome {
    if deviation > 0.0 {
        Outcome::No
    } else {
        Outcome::Yes
    }
}

/// Normalized geometric weights for `n` ladder levels.
///
/// Buy weights grow with the index (level prices ascend, so the best bid is
/// last); sell weights shrink (the best ask is first). Lambda above 1 biases
/// capital toward the best price.
pub fn geometric_weights(n: usize, lambda: f64, side: Side) -> SmallVec<[f64; 8]> {
    let n = n.max(1);
    let mut weights: SmallVec<[f64; 8]> = SmallVec::with_capacity(n);
    for i in 0..n {
        let exponent = match side {
            Side::Buy => i as f64,
            Side::Sell => (n - 1 - i) as f64,
        };
        weights.push(lambda.powf(exponent));
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        let uniform = 1.0 / n as f64;
        weights.iter_mut().for_each(|w| *w = uniform);
        return weights;
    }
    weights.iter_mut().for_each(|w| *w /= total);
    weights
}

/// Evenly spaced fixed-point prices across [min_prob, max_prob].
pub fn level_prices(min_prob: f64, max_prob: f64, n: usize) -> SmallVec<[i64; 8]> {
    let mut prices: SmallVec<[i64; 8]> = SmallVec::with_capacity(n.max(1));
    if n <= 1 {
        let mid = (min_prob + max_prob) / 2.0;
        prices.push(probability_to_price_fp(mid));
        return prices;
    }
    let step = (max_prob - min_prob) / (n - 1) as f64;
    for i in 0..n {
        prices.push(probability_to_price_fp(min_prob + step * i as f64));
    }
    prices
}

/// Convert a USDC amount into 6-decimal shares at a fixed-point price.
pub fn shares_from_usdc(usdc: Decimal, price_fp: i64) -> i64 {
    if price_fp <= 0 {
        return 0;
    }
    let numerator = usdc * Decimal::from(SHARE_SCALE) * Decimal::from(PRICE_SCALE);
    (numerator / Decimal::from(price_fp))
        .floor()
        .to_i64()
        .unwrap_or(0)
}

fn decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{MAX_PRICE_FP, MIN_PRICE_FP};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn builder() -> LadderBuilder {
        LadderBuilder::from_config(&Config::default())
    }

    fn quote(yes: f64, spread: f64) -> Quote {
        Quote {
            yes_target: yes,
            no_target: 1.0 - yes,
            spread,
            momentum_nudge: 0.0,
        }
    }

    #[test]
    fn geometric_weights_sum_to_one() {
        for n in [1usize, 2, 4, 6, 12] {
            for side in [Side::Buy, Side::Sell] {
                let weights = geometric_weights(n, 1.5, side);
                let total: f64 = weights.iter().sum();
                assert!((total - 1.0).abs() < 1e-9, "n={n} side={side} total={total}");
            }
        }
    }

    #[test]
    fn buy_weights_increase_sell_weights_decrease() {
        let buy = geometric_weights(6, 1.5, Side::Buy);
        let sell = geometric_weights(6, 1.5, Side::Sell);
        for i in 1..6 {
            assert!(buy[i] > buy[i - 1]);
            assert!(sell[i] < sell[i - 1]);
        }
    }

    #[test]
    fn level_prices_are_even_and_clamped() {
        let prices = level_prices(0.45, 0.55, 6);
        assert_eq!(prices.len(), 6);
        assert_eq!(prices[0], 450_000);
        assert_eq!(prices[5], 550_000);
        for i in 1..6 {
            assert!(prices[i] > prices[i - 1]);
        }

        let clamped = level_prices(0.001, 0.999, 2);
        assert_eq!(clamped[0], MIN_PRICE_FP);
        assert_eq!(clamped[1], MAX_PRICE_FP);
    }

    #[test]
    fn single_level_uses_midpoint() {
        let prices = level_prices(0.40, 0.60, 1);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0], 500_000);
    }

    #[test]
    fn shares_from_usdc_converts_fixed_point() {
        // $1 at 50% buys 2 shares.
        assert_eq!(shares_from_usdc(dec!(1), 500_000), 2 * SHARE_SCALE);
        // $0.50 at 25% buys 2 shares.
        assert_eq!(shares_from_usdc(dec!(0.50), 250_000), 2 * SHARE_SCALE);
        assert_eq!(shares_from_usdc(dec!(1), 0), 0);
    }

    #[test]
    fn balanced_quote_produces_four_sided_ladder() {
        let orders = builder().build("mkt-1", &quote(0.5, 0.02), dec!(40), 1_000);
        assert!(!orders.is_empty());

        let yes_bids = orders
            .iter()
            .filter(|o| o.outcome == Outcome::Yes && o.side == Side::Buy)
            .count();
        let yes_asks = orders
            .iter()
            .filter(|o| o.outcome == Outcome::Yes && o.side == Side::Sell)
            .count();
        let no_bids = orders
            .iter()
            .filter(|o| o.outcome == Outcome::No && o.side == Side::Buy)
            .count();
        assert!(yes_bids > 0 && yes_asks > 0 && no_bids > 0);

        for order in &orders {
            assert!(order.validate().is_ok());
            assert_eq!(order.market_id, "mkt-1");
            assert_eq!(order.expiration, 1_000 + 300);
        }
    }

    #[test]
    fn bids_sit_below_target_asks_above() {
        let orders = builder().build("mkt-1", &quote(0.5, 0.02), dec!(40), 0);
        let target_fp = 500_000;
        for order in orders.iter().filter(|o| o.outcome == Outcome::Yes) {
            match order.side {
                Side::Buy => assert!(order.price < target_fp),
                Side::Sell => assert!(order.price > target_fp),
            }
        }
    }

    #[test]
    fn extreme_target_suppresses_losing_outcome() {
        let ladder = builder();
        // YES at 90%: NO is the losing side.
        let orders = ladder.build("mkt-1", &quote(0.90, 0.02), dec!(40), 0);
        assert!(!orders.is_empty());
        assert!(orders.iter().all(|o| o.outcome == Outcome::Yes));

        // YES at 10%: YES is the losing side.
        let orders = ladder.build("mkt-1", &quote(0.10, 0.02), dec!(40), 0);
        assert!(!orders.is_empty());
        assert!(orders.iter().all(|o| o.outcome == Outcome::No));
    }

    #[test]
    fn momentum_reinforces_suppression_below_raw_threshold() {
        let ladder = builder();
        // Deviation 0.30 is below the raw 0.35 threshold but above 70% of it.
        let weak = quote(0.80, 0.02);
        assert_eq!(ladder.suppressed_outcome(&weak), None);

        let pushed = Quote {
            momentum_nudge: MOMENTUM_NUDGE_CLAMP / 2.0,
            ..weak
        };
        assert_eq!(ladder.suppressed_outcome(&pushed), Some(Outcome::No));

        // Momentum against the deviation does not reinforce.
        let opposed = Quote {
            momentum_nudge: -MOMENTUM_NUDGE_CLAMP,
            ..weak
        };
        assert_eq!(ladder.suppressed_outcome(&opposed), None);
    }

    #[test]
    fn sub_notional_levels_are_skipped() {
        // A two-cent budget cannot clear $0.01 per level once split across
        // outcomes, sides and six weighted levels.
        let orders = builder().build("mkt-1", &quote(0.5, 0.02), dec!(0.02), 0);
        assert!(orders.is_empty());
    }

    #[test]
    fn capital_concentrates_at_best_price() {
        let orders = builder().build("mkt-1", &quote(0.5, 0.02), dec!(400), 0);
        let mut yes_bids: Vec<&OrderRequest> = orders
            .iter()
            .filter(|o| o.outcome == Outcome::Yes && o.side == Side::Buy)
            .collect();
        yes_bids.sort_by_key(|o| o.price);
        assert!(yes_bids.len() >= 2);
        // Highest bid (best) carries the most notional.
        let notional =
            |o: &OrderRequest| (o.price as i128) * (o.size as i128);
        let best = yes_bids.last().map(|o| notional(o)).unwrap_or(0);
        let worst = yes_bids.first().map(|o| notional(o)).unwrap_or(0);
        assert!(best > worst);
    }

    #[test]
    fn allocation_skews_toward_likely_outcome() {
        let orders = builder().build("mkt-1", &quote(0.65, 0.02), dec!(400), 0);
        let notional = |o: &&OrderRequest| (o.price as i128) * (o.size as i128);
        let yes_total: i128 = orders
            .iter()
            .filter(|o| o.outcome == Outcome::Yes)
            .map(|o| notional(&o))
            .sum();
        let no_total: i128 = orders
            .iter()
            .filter(|o| o.outcome == Outcome::No)
            .map(|o| notional(&o))
            .sum();
        assert!(yes_total > no_total);
    }
}
