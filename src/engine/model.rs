//! Fair-value probability model for binary quick markets.
//!
//! Converts the deviation of the reference price from the strike into a
//! YES-probability by normalizing against the volatility expected over the
//! remaining life of the market: the same percentage deviation is near
//! certainty seconds before settlement and barely signal with minutes left.

use crate::config::Config;
use crate::engine::tracker::PriceSignals;

/// Hard cap on the probability shift the momentum signal may contribute.
pub const MOMENTUM_NUDGE_CLAMP: f64 = 0.10;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Inputs for one fair-value computation.
#[derive(Debug, Clone, Copy)]
pub struct ModelInputs<'a> {
    /// Strike price in USD.
    pub strike_usd: f64,
    /// Latest reference price in USD.
    pub current_price: f64,
    /// Seconds until the market settles.
    pub seconds_remaining: i64,
    /// Signals from the observation window.
    pub signals: &'a PriceSignals,
    /// Normalized net exposure in [-1, 1].
    pub net_exposure: f64,
}

/// A computed two-sided quote target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    /// Fair YES probability in [1 - max_probability, max_probability].
    pub yes_target: f64,
    /// Always 1 - yes_target.
    pub no_target: f64,
    /// Spread around the targets, in probability units.
    pub spread: f64,
    /// The bounded momentum contribution that went into yes_target.
    pub momentum_nudge: f64,
}

/// Statistical fair-value model. All parameters come from [`Config`].
#[derive(Debug, Clone)]
pub struct ProbabilityModel {
    base_spread: f64,
    min_spread: f64,
    max_spread: f64,
    max_probability: f64,
    base_daily_volatility: f64,
    poll_interval_secs: f64,
    momentum_factor: f64,
    momentum_scale: f64,
    momentum_spread_factor: f64,
    volatility_spread_factor: f64,
    inventory_skew_factor: f64,
    pull_window_secs: i64,
    widen_window_secs: i64,
}

impl ProbabilityModel {
    /// Build a model from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_spread: config.base_spread,
            min_spread: config.min_spread,
            max_spread: config.max_spread,
            max_probability: config.max_probability,
            base_daily_volatility: config.base_daily_volatility,
            poll_interval_secs: config.poll_interval_secs.max(1) as f64,
            momentum_factor: config.momentum_factor,
            momentum_scale: config.momentum_scale,
            momentum_spread_factor: config.momentum_spread_factor,
            volatility_spread_factor: config.volatility_spread_factor,
            inventory_skew_factor: config.inventory_skew_factor,
            pull_window_secs: config.pull_window_secs,
            widen_window_secs: config.widen_window_secs,
        }
    }

    /// Compute the fair YES/NO targets and the spread to quote around them.
    pub fn compute(&self, inputs: ModelInputs<'_>) -> Quote {
        if inputs.strike_usd <= 0.0 || inputs.current_price <= 0.0 {
            return Quote {
                yes_target: 0.5,
                no_target: 0.5,
                spread: self.base_spread,
                momentum_nudge: 0.0,
            };
        }

        let remaining_secs = inputs.seconds_remaining.max(1);
        let remaining = remaining_secs as f64;

        let return_deviation = (inputs.current_price - inputs.strike_usd) / inputs.strike_usd;

        // Instantaneous volatility per sqrt-second, floored so a quiet window
        // never collapses the denominator.
        let vol_floor = self.base_daily_volatility / SECONDS_PER_DAY.sqrt();
        let vol_per_sqrt_sec =
            (inputs.signals.volatility / self.poll_interval_secs.sqrt()).max(vol_floor);
        let expected_vol_to_expiry = vol_per_sqrt_sec * remaining.sqrt();

        let z = if expected_vol_to_expiry > 0.0 {
            return_deviation / expected_vol_to_expiry
        } else {
            0.0
        };

        let mut yes_target = normal_cdf(z);

        let momentum_nudge = (inputs.signals.momentum * self.momentum_factor
            / self.momentum_scale)
            .clamp(-MOMENTUM_NUDGE_CLAMP, MOMENTUM_NUDGE_CLAMP);
        yes_target += momentum_nudge;

        // Quote away from inventory: long YES pushes the YES target down.
        yes_target -= inputs.net_exposure * self.inventory_skew_factor;

        yes_target = yes_target.clamp(1.0 - self.max_probability, self.max_probability);

        let spread = self.spread(inputs.signals, remaining_secs);

        Quote {
            yes_target,
            no_target: 1.0 - yes_target,
            spread,
            momentum_nudge,
        }
    }

    fn spread(&self, signals: &PriceSignals, seconds_remaining: i64) -> f64 {
        let mut spread = self.base_spread;
        spread *= 1.0 + signals.volatility * self.volatility_spread_factor;
        spread *= 1.0
            + (signals.momentum.abs() * self.momentum_spread_factor / self.momentum_scale);

        // Widen into settlement: informed flow concentrates there, and the
        // quotes are about to be pulled anyway.
        if seconds_remaining > self.pull_window_secs && seconds_remaining < self.widen_window_secs {
            let progress = 1.0 - seconds_remaining as f64 / self.widen_window_secs as f64;
            spread *= 1.0 + 2.0 * progress;
        }

        spread.clamp(self.min_spread, self.max_spread)
    }
}

/// Standard normal cumulative distribution function.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Error function approximation (Abramowitz & Stegun 7.1.26).
///
/// The zero case is handled up front: the polynomial's coefficients do not
/// sum to exactly one, and Phi(0) must be exactly 0.5.
fn erf(x: f64) -> f64 {
    if x == 0.0 {
        return 0.0;
    }

    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}
