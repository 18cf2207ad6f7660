//! The pricing and quoting decision engine.
//!
//! - [`tracker`]: rolling price window and derived signals
//! - [`inventory`]: position bookkeeping and adverse-selection detection
//! - [`model`]: normal-CDF fair-value model and dynamic spread
//! - [`ladder`]: multi-level quote construction with geometric sizing
//! - [`state`]: per-asset state and the quoting state machine
//! - [`lifecycle`]: market rotation handling
//! - [`controller`]: the per-tick orchestrator

pub mod controller;
pub mod inventory;
pub mod ladder;
pub mod lifecycle;
pub mod model;
pub mod state;
pub mod tracker;

pub use controller::{AssetStatus, RebalanceController};
pub use inventory::{FillRecord, InventoryTracker};
pub use ladder::LadderBuilder;
pub use model::{ModelInputs, ProbabilityModel, Quote};
pub use state::{ActiveOrder, AssetMarketState, QuotePhase};
pub use tracker::{PriceSignals, PriceTracker};
