//! Per-asset position bookkeeping and adverse-selection detection.

use std::collections::VecDeque;

use time::{Duration, OffsetDateTime};

use crate::market::{Outcome, Side};

/// Minimum fills in the trailing window before the one-sided ratio means anything.
const MIN_FILLS_FOR_SIGNAL: usize = 3;

/// A detected fill, retained only long enough to feed the adverse-selection ratio.
#[derive(Debug, Clone)]
pub struct FillRecord {
    /// Side of our order that filled.
    pub side: Side,
    /// Outcome that was traded.
    pub outcome: Outcome,
    /// Fill price in 1e6 fixed point.
    pub price: i64,
    /// Fill size in 6-decimal shares.
    pub size: i64,
    /// When the fill was detected.
    pub filled_at: OffsetDateTime,
}

/// Tracks signed per-outcome exposure and recent fill flow for one asset.
#[derive(Debug)]
pub struct InventoryTracker {
    yes_position: i64,
    no_position: i64,
    fills: VecDeque<FillRecord>,
    window: Duration,
}

impl InventoryTracker {
    /// Create a tracker whose fill history spans `window_secs` seconds.
    pub fn new(window_secs: i64) -> Self {
        Self {
            yes_position: 0,
            no_position: 0,
            fills: VecDeque::new(),
            window: Duration::seconds(window_secs.max(1)),
        }
    }

    /// Record a fill at the current time.
    pub fn record_fill(&mut self, side: Side, outcome: Outcome, price: i64, size: i64) {
        self.record_fill_at(side, outcome, price, size, OffsetDateTime::now_utc());
    }

    /// Record a fill at an explicit time.
    pub fn record_fill_at(
        &mut self,
        side: Side,
        outcome: Outcome,
        price: i64,
        size: i64,
        at: OffsetDateTime,
    ) {
        let signed = match side {
            Side::Buy => size,
            Side::Sell => -size,
        };
        match outcome {
            Outcome::Yes => self.yes_position += signed,
            Outcome::No => self.no_position += signed,
        }

        self.fills.push_back(FillRecord {
            side,
            outcome,
            price,
            size,
            filled_at: at,
        });
        self.prune(at);
    }

    /// Signed YES position in 6-decimal shares.
    pub fn yes_position(&self) -> i64 {
        self.yes_position
    }

    /// Signed NO position in 6-decimal shares.
    pub fn no_position(&self) -> i64 {
        self.no_position
    }

    /// Normalized net exposure in [-1, 1]; positive means long YES.
    pub fn net_exposure(&self) -> f64 {
        let gross = self.yes_position.abs() + self.no_position.abs();
        if gross == 0 {
            return 0.0;
        }
        (self.yes_position - self.no_position) as f64 / gross as f64
    }

    /// True when recent flow is one-sided enough to suggest informed counterparties.
    ///
    /// With fewer than three fills in the trailing window there is no signal
    /// and the answer is always false.
    pub fn is_adversely_selected(&self, threshold: f64, now: OffsetDateTime) -> bool {
        let cutoff = now - self.window;
        let mut buys = 0usize;
        let mut sells = 0usize;
        for fill in self.fills.iter().rev() {
            if fill.filled_at < cutoff {
                break;
            }
            match fill.side {
                Side::Buy => buys += 1,
                Side::Sell => sells += 1,
            }
        }

        let total = buys + sells;
        if total < MIN_FILLS_FOR_SIGNAL {
            return false;
        }
        buys.max(sells) as f64 / total as f64 > threshold
    }

    /// Number of retained fill records.
    pub fn fill_count(&self) -> usize {
        self.fills.len()
    }

    /// Zero all state (market rotation).
    pub fn reset(&mut self) {
        self.yes_position = 0;
        self.no_position = 0;
        self.fills.clear();
    }

    fn prune(&mut self, now: OffsetDateTime) {
        let cutoff = now - self.window;
        while let Some(front) = self.fills.front() {
            if front.filled_at < cutoff {
                self.fills.pop_front();
            } else {
                break;
            }
        }
    }
}
