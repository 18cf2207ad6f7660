//! Rolling price observation window and derived trading signals.

use std::collections::VecDeque;

use time::{Duration, OffsetDateTime};

/// Number of trailing samples used for the velocity estimate.
const VELOCITY_SAMPLES: usize = 5;

/// A single timestamped price reading.
#[derive(Debug, Clone, Copy)]
struct PriceSample {
    price: f64,
    observed_at: OffsetDateTime,
}

/// Signals derived from the observation window.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceSignals {
    /// Latest observed price (0 when the window is empty).
    pub current_price: f64,
    /// Price change per second over the trailing samples.
    pub velocity: f64,
    /// Sample standard deviation of consecutive fractional returns.
    pub volatility: f64,
    /// EMA of velocity, persisted across queries.
    pub momentum: f64,
    /// True when the latest sample is older than the window allows.
    pub is_stale: bool,
}

/// Bounded window of price observations for one asset.
///
/// Samples older than `max_age` are pruned on every insert, and the window
/// never holds more than `max_samples` entries. Momentum is a stateful EMA
/// of velocity updated on each insert.
#[derive(Debug)]
pub struct PriceTracker {
    window: VecDeque<PriceSample>,
    max_samples: usize,
    max_age: Duration,
    ema_alpha: f64,
    momentum_ema: f64,
}

impl PriceTracker {
    /// Create a tracker with the given window bounds and EMA smoothing factor.
    pub fn new(max_samples: usize, max_age_secs: i64, ema_alpha: f64) -> Self {
        Self {
            window: VecDeque::with_capacity(max_samples.min(128)),
            max_samples: max_samples.max(1),
            max_age: Duration::seconds(max_age_secs.max(1)),
            ema_alpha: ema_alpha.clamp(0.0, 1.0),
            momentum_ema: 0.0,
        }
    }

    /// Record a price observation at the current time.
    pub fn record(&mut self, price: f64) {
        self.record_at(price, OffsetDateTime::now_utc());
    }

    /// Record a price observation at an explicit time.
    pub fn record_at(&mut self, price: f64, at: OffsetDateTime) {
        self.window.push_back(PriceSample { price, observed_at: at });
        self.prune(at);
        let velocity = self.velocity();
        self.momentum_ema = self.ema_alpha * velocity + (1.0 - self.ema_alpha) * self.momentum_ema;
    }

    /// Clear the window and the momentum EMA (market rotation).
    pub fn reset(&mut self) {
        self.window.clear();
        self.momentum_ema = 0.0;
    }

    /// Number of samples currently retained.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Compute signals from the current window contents.
    pub fn signals(&self, now: OffsetDateTime) -> PriceSignals {
        let Some(latest) = self.window.back() else {
            return PriceSignals {
                is_stale: true,
                ..PriceSignals::default()
            };
        };

        PriceSignals {
            current_price: latest.price,
            velocity: self.velocity(),
            volatility: self.volatility(),
            momentum: self.momentum_ema,
            is_stale: now - latest.observed_at > self.max_age,
        }
    }

    fn prune(&mut self, now: OffsetDateTime) {
        let cutoff = now - self.max_age;
        while let Some(front) = self.window.front() {
            if front.observed_at < cutoff {
                self.window.pop_front();
            } else {
                break;
            }
        }
        while self.window.len() > self.max_samples {
            self.window.pop_front();
        }
    }

    /// Price change per second between the earliest of the last
    /// min(VELOCITY_SAMPLES, n) samples and the latest.
    fn velocity(&self) -> f64 {
        let n = self.window.len();
        if n < 2 {
            return 0.0;
        }
        let span = n.min(VELOCITY_SAMPLES);
        let first = self.window[n - span];
        let last = self.window[n - 1];
        let elapsed = (last.observed_at - first.observed_at).as_seconds_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        (last.price - first.price) / elapsed
    }

    /// Sample standard deviation of consecutive fractional returns over the
    /// entire retained window. Needs at least two returns (three samples).
    fn volatility(&self) -> f64 {
        let n = self.window.len();
        if n < 3 {
            return 0.0;
        }

        let mut returns = Vec::with_capacity(n - 1);
        for i in 1..n {
            let prev = self.window[i - 1].price;
            if prev != 0.0 {
                returns.push((self.window[i].price - prev) / prev);
            }
        }
        if returns.len() < 2 {
            return 0.0;
        }

        let m = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / m;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (m - 1.0);
        variance.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn t0() -> OffsetDateTime {
        datetime!(2025-06-01 12:00:00 UTC)
    }

    fn tracker() -> PriceTracker {
        PriceTracker::new(60, 120, 0.3)
    }

    #[test]
    fn empty_window_is_fully_stale() {
        let tracker = tracker();
        let signals = tracker.signals(t0());
        assert!(signals.is_stale);
        assert_eq!(signals.current_price, 0.0);
        assert_eq!(signals.velocity, 0.0);
        assert_eq!(signals.volatility, 0.0);
    }

    #[test]
    fn single_sample_has_price_but_no_velocity() {
        let mut tracker = tracker();
        tracker.record_at(100_000.0, t0());
        let signals = tracker.signals(t0());
        assert_eq!(signals.current_price, 100_000.0);
        assert_eq!(signals.velocity, 0.0);
        assert_eq!(signals.volatility, 0.0);
        assert!(!signals.is_stale);
    }

    #[test]
    fn velocity_uses_trailing_five_samples() {
        let mut tracker = tracker();
        // 10 samples, 1s apart, +10 per step. Velocity window covers the
        // last five: (last - first_of_5) / 4s = 40 / 4 = 10.
        for i in 0..10 {
            tracker.record_at(100_000.0 + 10.0 * i as f64, t0() + Duration::seconds(i));
        }
        let signals = tracker.signals(t0() + Duration::seconds(9));
        assert!((signals.velocity - 10.0).abs() < 1e-9);
    }

    #[test]
    fn velocity_zero_when_timestamps_collapse() {
        let mut tracker = tracker();
        tracker.record_at(100.0, t0());
        tracker.record_at(200.0, t0());
        assert_eq!(tracker.signals(t0()).velocity, 0.0);
    }

    #[test]
    fn volatility_needs_three_samples() {
        let mut tracker = tracker();
        tracker.record_at(100.0, t0());
        tracker.record_at(101.0, t0() + Duration::seconds(1));
        assert_eq!(tracker.signals(t0() + Duration::seconds(1)).volatility, 0.0);

        tracker.record_at(100.0, t0() + Duration::seconds(2));
        let vol = tracker
            .signals(t0() + Duration::seconds(2))
            .volatility;
        assert!(vol > 0.0);
    }

    #[test]
    fn constant_prices_have_zero_volatility() {
        let mut tracker = tracker();
        for i in 0..5 {
            tracker.record_at(100.0, t0() + Duration::seconds(i));
        }
        assert_eq!(tracker.signals(t0() + Duration::seconds(4)).volatility, 0.0);
    }

    #[test]
    fn momentum_is_ema_of_velocity() {
        let mut tracker = tracker();
        tracker.record_at(100.0, t0());
        // Second sample: velocity = 10/s, EMA = 0.3 * 10 = 3.
        tracker.record_at(110.0, t0() + Duration::seconds(1));
        let signals = tracker.signals(t0() + Duration::seconds(1));
        assert!((signals.momentum - 3.0).abs() < 1e-9);
    }

    #[test]
    fn reset_clears_window_and_momentum() {
        let mut tracker = tracker();
        tracker.record_at(100.0, t0());
        tracker.record_at(110.0, t0() + Duration::seconds(1));
        assert!(tracker.signals(t0() + Duration::seconds(1)).momentum != 0.0);

        tracker.reset();
        assert!(tracker.is_empty());
        let signals = tracker.signals(t0() + Duration::seconds(2));
        assert_eq!(signals.momentum, 0.0);
        assert!(signals.is_stale);
    }

    #[test]
    fn old_samples_are_pruned() {
        let mut tracker = PriceTracker::new(60, 10, 0.3);
        tracker.record_at(100.0, t0());
        tracker.record_at(101.0, t0() + Duration::seconds(30));
        // First sample fell out of the 10s window.
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn window_is_bounded_by_max_samples() {
        let mut tracker = PriceTracker::new(3, 3600, 0.3);
        for i in 0..10 {
            tracker.record_at(100.0 + i as f64, t0() + Duration::seconds(i));
        }
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn staleness_detected_after_max_age() {
        let mut tracker = PriceTracker::new(60, 10, 0.3);
        tracker.record_at(100.0, t0());
        assert!(!tracker.signals(t0() + Duration::seconds(5)).is_stale);
        assert!(tracker.signals(t0() + Duration::seconds(11)).is_stale);
    }
}
