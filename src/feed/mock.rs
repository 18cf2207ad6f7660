//! Scriptable price feed for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::FeedError;
use crate::feed::PriceFeed;

#[derive(Debug, Default)]
struct MockFeedState {
    queue: VecDeque<f64>,
    last: Option<f64>,
    fail: bool,
}

/// In-memory price feed. Queued prices are served in order; once the queue
/// drains the last price repeats, mirroring a quiet market.
#[derive(Debug, Clone, Default)]
pub struct MockFeed {
    inner: Arc<Mutex<MockFeedState>>,
}

impl MockFeed {
    /// Create an empty feed (fails until a price is pushed).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a feed that returns a constant price.
    pub fn constant(price: f64) -> Self {
        let feed = Self::default();
        feed.push(price);
        feed
    }

    /// Queue a price.
    pub fn push(&self, price: f64) {
        let mut state = self.inner.lock().expect("mock feed lock poisoned");
        state.queue.push_back(price);
    }

    /// Make the feed fail until turned off.
    pub fn set_failing(&self, fail: bool) {
        self.inner.lock().expect("mock feed lock poisoned").fail = fail;
    }
}

impl PriceFeed for MockFeed {
    async fn latest_price(&self, asset: &str) -> Result<f64, FeedError> {
        let mut state = self.inner.lock().expect("mock feed lock poisoned");
        if state.fail {
            return Err(FeedError::Unavailable("mock feed failure".to_string()));
        }
        if let Some(price) = state.queue.pop_front() {
            state.last = Some(price);
            return Ok(price);
        }
        state
            .last
            .ok_or_else(|| FeedError::Unavailable(format!("no price scripted for {asset}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_queued_prices_then_repeats_last() {
        let feed = MockFeed::new();
        feed.push(100.0);
        feed.push(101.0);

        assert_eq!(feed.latest_price("BTC").await.unwrap(), 100.0);
        assert_eq!(feed.latest_price("BTC").await.unwrap(), 101.0);
        assert_eq!(feed.latest_price("BTC").await.unwrap(), 101.0);
    }

    #[tokio::test]
    async fn empty_feed_fails() {
        let feed = MockFeed::new();
        assert!(feed.latest_price("BTC").await.is_err());
    }

    #[tokio::test]
    async fn failure_injection_toggles() {
        let feed = MockFeed::constant(100.0);
        feed.set_failing(true);
        assert!(feed.latest_price("BTC").await.is_err());
        feed.set_failing(false);
        assert_eq!(feed.latest_price("BTC").await.unwrap(), 100.0);
    }
}
