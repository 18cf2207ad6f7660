//! Mock exchange for unit and integration testing.
//!
//! Tests script the authoritative open-order set and inspect exactly what the
//! engine submitted and cancelled, in order.

use std::sync::{Arc, Mutex};

use crate::error::{MarketError, TradingError};
use crate::market::types::{OpenOrder, OrderRequest, QuickMarket};
use crate::market::Exchange;

/// One observable action the engine took against the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    /// An order was submitted and assigned this id.
    Submitted(String),
    /// An order was cancelled.
    Cancelled(String),
}

#[derive(Debug, Default)]
struct MockState {
    market: Option<QuickMarket>,
    open_orders: Vec<OpenOrder>,
    submitted: Vec<OrderRequest>,
    events: Vec<MockEvent>,
    next_id: u64,
    fail_submit: bool,
    fail_cancel: bool,
    fail_list: bool,
    fail_market: bool,
    /// When true (the default), submitted orders join the open set so the
    /// engine's cache and the "exchange" agree until a test removes one.
    auto_open: bool,
}

/// Scriptable in-memory exchange.
#[derive(Debug, Clone)]
pub struct MockExchange {
    inner: Arc<Mutex<MockState>>,
    trader: String,
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchange {
    /// Create an empty mock with auto-opened submissions.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState {
                auto_open: true,
                ..MockState::default()
            })),
            trader: "0xmock0000000000000000000000000000000001".to_string(),
        }
    }

    /// Create a mock that already serves the given active market.
    pub fn with_market(market: QuickMarket) -> Self {
        let mock = Self::new();
        mock.set_market(Some(market));
        mock
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().expect("mock exchange lock poisoned")
    }

    /// Replace the active market.
    pub fn set_market(&self, market: Option<QuickMarket>) {
        self.lock().market = market;
    }

    /// Simulate a fill by removing an order from the authoritative open set.
    pub fn remove_open_order(&self, order_id: &str) {
        self.lock().open_orders.retain(|o| o.order_id != order_id);
    }

    /// All order ids currently open.
    pub fn open_order_ids(&self) -> Vec<String> {
        self.lock().open_orders.iter().map(|o| o.order_id.clone()).collect()
    }

    /// Snapshot of the authoritative open set.
    pub fn open_orders(&self) -> Vec<OpenOrder> {
        self.lock().open_orders.clone()
    }

    /// Everything the engine submitted, in order.
    pub fn submitted(&self) -> Vec<OrderRequest> {
        self.lock().submitted.clone()
    }

    /// Ids the engine cancelled, in order.
    pub fn cancelled(&self) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::Cancelled(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Full submit/cancel event sequence.
    pub fn events(&self) -> Vec<MockEvent> {
        self.lock().events.clone()
    }

    /// Drop recorded submissions and events (keeps the open set).
    pub fn clear_recordings(&self) {
        let mut state = self.lock();
        state.submitted.clear();
        state.events.clear();
    }

    /// Make submissions fail.
    pub fn set_fail_submit(&self, fail: bool) {
        self.lock().fail_submit = fail;
    }

    /// Make cancels fail.
    pub fn set_fail_cancel(&self, fail: bool) {
        self.lock().fail_cancel = fail;
    }

    /// Make open-order queries fail.
    pub fn set_fail_list(&self, fail: bool) {
        self.lock().fail_list = fail;
    }

    /// Make market discovery fail.
    pub fn set_fail_market(&self, fail: bool) {
        self.lock().fail_market = fail;
    }
}

impl Exchange for MockExchange {
    fn trader_address(&self) -> &str {
        &self.trader
    }

    async fn get_active_market(&self, asset: &str) -> Result<Option<QuickMarket>, MarketError> {
        let state = self.lock();
        if state.fail_market {
            return Err(MarketError::FetchFailed {
                asset: asset.to_string(),
                reason: "mock market failure".to_string(),
            });
        }
        Ok(state
            .market
            .clone()
            .filter(|m| m.asset.eq_ignore_ascii_case(asset)))
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<String, TradingError> {
        let mut state = self.lock();
        if state.fail_submit {
            return Err(TradingError::SubmissionFailed(
                "mock submit failure".to_string(),
            ));
        }
        request.validate().map_err(TradingError::InvalidParams)?;

        state.next_id += 1;
        let order_id = format!("mock-{}", state.next_id);
        state.submitted.push(request.clone());
        state.events.push(MockEvent::Submitted(order_id.clone()));
        if state.auto_open {
            let open = OpenOrder {
                order_id: order_id.clone(),
                market_id: request.market_id.clone(),
                outcome: request.outcome,
                side: request.side,
                price: request.price,
                size: request.size,
            };
            state.open_orders.push(open);
        }
        Ok(order_id)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), TradingError> {
        let mut state = self.lock();
        if state.fail_cancel {
            return Err(TradingError::CancelFailed {
                order_id: order_id.to_string(),
                reason: "mock cancel failure".to_string(),
            });
        }
        state.open_orders.retain(|o| o.order_id != order_id);
        state.events.push(MockEvent::Cancelled(order_id.to_string()));
        Ok(())
    }

    async fn list_open_orders(&self, market_id: &str) -> Result<Vec<OpenOrder>, TradingError> {
        let state = self.lock();
        if state.fail_list {
            return Err(TradingError::OpenOrdersFailed(
                "mock list failure".to_string(),
            ));
        }
        Ok(state
            .open_orders
            .iter()
            .filter(|o| o.market_id == market_id)
            .cloned()
            .collect())
    }
}
