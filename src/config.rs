//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Venue API ===
    /// REST API base URL.
    #[serde(default = "default_api_url")]
    pub turbine_api_url: String,

    /// Optional API key id for authenticated endpoints.
    #[serde(default)]
    pub turbine_api_key_id: Option<String>,

    /// Optional API key secret.
    #[serde(default)]
    pub turbine_api_key_secret: Option<String>,

    /// Trader wallet address used to identify our own orders.
    #[serde(default)]
    pub turbine_trader_address: String,

    // === Price Feed ===
    /// Pyth Hermes base URL.
    #[serde(default = "default_hermes_url")]
    pub pyth_hermes_url: String,

    /// Comma-separated asset symbols to quote (e.g., "BTC,ETH").
    #[serde(default = "default_assets")]
    pub assets: String,

    // === Capital & Ladder ===
    /// Total USDC allocation per market, split across outcomes, sides and levels.
    #[serde(default = "default_allocation")]
    pub allocation_usdc: Decimal,

    /// Price levels per side per outcome.
    #[serde(default = "default_num_levels")]
    pub num_levels: usize,

    /// Geometric distribution parameter (> 1 concentrates size at the best price).
    #[serde(default = "default_lambda")]
    pub geometric_lambda: f64,

    /// Skip ladder levels whose notional falls below this (USDC).
    #[serde(default = "default_min_notional")]
    pub min_level_notional: Decimal,

    /// Suppress the losing outcome when |yes_target - 0.5| exceeds this.
    #[serde(default = "default_suppression_deviation")]
    pub suppression_deviation: f64,

    /// Lower bound of the capital split between outcomes and sides.
    #[serde(default = "default_alloc_skew_min")]
    pub alloc_skew_min: f64,

    /// Upper bound of the capital split between outcomes and sides.
    #[serde(default = "default_alloc_skew_max")]
    pub alloc_skew_max: f64,

    // === Pricing Model ===
    /// Base spread around the target probability.
    #[serde(default = "default_base_spread")]
    pub base_spread: f64,

    /// Spread floor.
    #[serde(default = "default_min_spread")]
    pub min_spread: f64,

    /// Spread ceiling.
    #[serde(default = "default_max_spread")]
    pub max_spread: f64,

    /// Cap on the fair-value probability (targets live in [1-cap, cap]).
    #[serde(default = "default_max_probability")]
    pub max_probability: f64,

    /// Volatility floor, expressed as a daily fractional move.
    #[serde(default = "default_base_daily_volatility")]
    pub base_daily_volatility: f64,

    /// Probability nudge per unit of scaled momentum.
    #[serde(default = "default_momentum_factor")]
    pub momentum_factor: f64,

    /// Calibration divisor converting raw momentum (USD/s) into a small fraction.
    #[serde(default = "default_momentum_scale")]
    pub momentum_scale: f64,

    /// Spread multiplier per unit of scaled |momentum|.
    #[serde(default = "default_momentum_spread_factor")]
    pub momentum_spread_factor: f64,

    /// Spread multiplier per unit of window volatility.
    #[serde(default = "default_volatility_spread_factor")]
    pub volatility_spread_factor: f64,

    /// Probability shift per unit of net exposure, quoting away from inventory.
    #[serde(default = "default_inventory_skew_factor")]
    pub inventory_skew_factor: f64,

    // === Rebalancing ===
    /// Requote when the target moved by more than this since the last requote.
    #[serde(default = "default_rebalance_threshold")]
    pub rebalance_threshold: f64,

    /// Minimum seconds between rebalances.
    #[serde(default = "default_min_rebalance_secs")]
    pub min_rebalance_secs: i64,

    /// Volatility reading that allows a faster requote.
    #[serde(default = "default_volatility_alert_threshold")]
    pub volatility_alert_threshold: f64,

    /// Shorter rebalance floor used when volatility is elevated.
    #[serde(default = "default_volatility_rebalance_floor_secs")]
    pub volatility_rebalance_floor_secs: i64,

    /// Milliseconds to let in-flight matches settle before cancelling old quotes.
    #[serde(default = "default_settle_pause_ms")]
    pub settle_pause_ms: u64,

    // === Risk Controls ===
    /// Pull all quotes when this close (seconds) to settlement.
    #[serde(default = "default_pull_window_secs")]
    pub pull_window_secs: i64,

    /// Start widening the spread when this close (seconds) to settlement.
    #[serde(default = "default_widen_window_secs")]
    pub widen_window_secs: i64,

    /// One-sided fill ratio that trips the circuit breaker.
    #[serde(default = "default_adverse_fill_threshold")]
    pub adverse_fill_threshold: f64,

    /// Trailing window for the adverse-selection ratio (seconds).
    #[serde(default = "default_adverse_window_secs")]
    pub adverse_window_secs: i64,

    /// Seconds the circuit breaker stays dark once tripped.
    #[serde(default = "default_breaker_cooldown_secs")]
    pub breaker_cooldown_secs: i64,

    // === Signal Window ===
    /// Maximum price samples retained per asset.
    #[serde(default = "default_price_window_max_samples")]
    pub price_window_max_samples: usize,

    /// Maximum age of retained price samples (seconds).
    #[serde(default = "default_price_window_max_age_secs")]
    pub price_window_max_age_secs: i64,

    /// EMA smoothing factor for momentum.
    #[serde(default = "default_momentum_ema_alpha")]
    pub momentum_ema_alpha: f64,

    // === Scheduling ===
    /// Seconds between engine ticks (price poll interval).
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds attached to every order as expiration.
    #[serde(default = "default_order_expiration_secs")]
    pub order_expiration_secs: i64,

    // === Operation Modes ===
    /// Simulation mode (orders are kept in a local paper book).
    #[serde(default = "default_true")]
    pub dry_run: bool,

    // === HTTP Client ===
    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Idle connections kept per host.
    #[serde(default = "default_http_pool_size")]
    pub http_pool_size: usize,

    // === Server Configuration ===
    /// HTTP server port for health/status endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Prometheus exporter port.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_api_url() -> String {
    "https://api.turbinefi.com".to_string()
}

fn default_hermes_url() -> String {
    "https://hermes.pyth.network".to_string()
}

fn default_assets() -> String {
    "BTC".to_string()
}

fn default_allocation() -> Decimal {
    Decimal::new(40, 0) // $40
}

fn default_num_levels() -> usize {
    6
}

fn default_lambda() -> f64 {
    1.5
}

fn default_min_notional() -> Decimal {
    Decimal::new(1, 2) // $0.01
}

fn default_suppression_deviation() -> f64 {
    0.35
}

fn default_alloc_skew_min() -> f64 {
    0.2
}

fn default_alloc_skew_max() -> f64 {
    0.8
}

fn default_base_spread() -> f64 {
    0.02
}

fn default_min_spread() -> f64 {
    0.005
}

fn default_max_spread() -> f64 {
    0.10
}

fn default_max_probability() -> f64 {
    0.99
}

fn default_base_daily_volatility() -> f64 {
    0.03 // 3%/day
}

fn default_momentum_factor() -> f64 {
    0.05
}

fn default_momentum_scale() -> f64 {
    1e6
}

fn default_momentum_spread_factor() -> f64 {
    0.5
}

fn default_volatility_spread_factor() -> f64 {
    25.0
}

fn default_inventory_skew_factor() -> f64 {
    0.05
}

fn default_rebalance_threshold() -> f64 {
    0.02
}

fn default_min_rebalance_secs() -> i64 {
    5
}

fn default_volatility_alert_threshold() -> f64 {
    0.004
}

fn default_volatility_rebalance_floor_secs() -> i64 {
    2
}

fn default_settle_pause_ms() -> u64 {
    500
}

fn default_pull_window_secs() -> i64 {
    30
}

fn default_widen_window_secs() -> i64 {
    120
}

fn default_adverse_fill_threshold() -> f64 {
    0.80
}

fn default_adverse_window_secs() -> i64 {
    30
}

fn default_breaker_cooldown_secs() -> i64 {
    60
}

fn default_price_window_max_samples() -> usize {
    60
}

fn default_price_window_max_age_secs() -> i64 {
    120
}

fn default_momentum_ema_alpha() -> f64 {
    0.3
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_order_expiration_secs() -> i64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_http_timeout_ms() -> u64 {
    2000
}

fn default_http_pool_size() -> usize {
    10
}

fn default_port() -> u16 {
    8080
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Tracked asset symbols, uppercased.
    pub fn asset_list(&self) -> Vec<String> {
        self.assets
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.turbine_trader_address.is_empty() {
            return Err("TURBINE_TRADER_ADDRESS is required".to_string());
        }
        if !self.turbine_trader_address.starts_with("0x") {
            return Err("TURBINE_TRADER_ADDRESS must start with 0x".to_string());
        }
        if self.asset_list().is_empty() {
            return Err("ASSETS must name at least one asset".to_string());
        }
        if self.allocation_usdc <= Decimal::ZERO {
            return Err("ALLOCATION_USDC must be positive".to_string());
        }
        if self.num_levels == 0 || self.num_levels > 16 {
            return Err("NUM_LEVELS must be in [1, 16]".to_string());
        }
        if self.geometric_lambda <= 1.0 {
            return Err("GEOMETRIC_LAMBDA must be greater than 1".to_string());
        }
        if !(0.5..=1.0).contains(&self.max_probability) {
            return Err("MAX_PROBABILITY must be in [0.5, 1.0]".to_string());
        }
        if self.min_spread <= 0.0 || self.min_spread > self.max_spread {
            return Err("spread bounds must satisfy 0 < MIN_SPREAD <= MAX_SPREAD".to_string());
        }
        if self.base_spread < self.min_spread || self.base_spread > self.max_spread {
            return Err("BASE_SPREAD must lie within [MIN_SPREAD, MAX_SPREAD]".to_string());
        }
        if !(0.0..=1.0).contains(&self.momentum_ema_alpha) {
            return Err("MOMENTUM_EMA_ALPHA must be in [0, 1]".to_string());
        }
        if self.alloc_skew_min < 0.0
            || self.alloc_skew_max > 1.0
            || self.alloc_skew_min >= self.alloc_skew_max
        {
            return Err("allocation skew bounds must satisfy 0 <= min < max <= 1".to_string());
        }
        if self.pull_window_secs >= self.widen_window_secs {
            return Err("PULL_WINDOW_SECS must be smaller than WIDEN_WINDOW_SECS".to_string());
        }
        if self.poll_interval_secs == 0 {
            return Err("POLL_INTERVAL_SECS must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            turbine_api_url: default_api_url(),
            turbine_api_key_id: None,
            turbine_api_key_secret: None,
            turbine_trader_address: String::new(),
            pyth_hermes_url: default_hermes_url(),
            assets: default_assets(),
            allocation_usdc: default_allocation(),
            num_levels: default_num_levels(),
            geometric_lambda: default_lambda(),
            min_level_notional: default_min_notional(),
            suppression_deviation: default_suppression_deviation(),
            alloc_skew_min: default_alloc_skew_min(),
            alloc_skew_max: default_alloc_skew_max(),
            base_spread: default_base_spread(),
            min_spread: default_min_spread(),
            max_spread: default_max_spread(),
            max_probability: default_max_probability(),
            base_daily_volatility: default_base_daily_volatility(),
            momentum_factor: default_momentum_factor(),
            momentum_scale: default_momentum_scale(),
            momentum_spread_factor: default_momentum_spread_factor(),
            volatility_spread_factor: default_volatility_spread_factor(),
            inventory_skew_factor: default_inventory_skew_factor(),
            rebalance_threshold: default_rebalance_threshold(),
            min_rebalance_secs: default_min_rebalance_secs(),
            volatility_alert_threshold: default_volatility_alert_threshold(),
            volatility_rebalance_floor_secs: default_volatility_rebalance_floor_secs(),
            settle_pause_ms: default_settle_pause_ms(),
            pull_window_secs: default_pull_window_secs(),
            widen_window_secs: default_widen_window_secs(),
            adverse_fill_threshold: default_adverse_fill_threshold(),
            adverse_window_secs: default_adverse_window_secs(),
            breaker_cooldown_secs: default_breaker_cooldown_secs(),
            price_window_max_samples: default_price_window_max_samples(),
            price_window_max_age_secs: default_price_window_max_age_secs(),
            momentum_ema_alpha: default_momentum_ema_alpha(),
            poll_interval_secs: default_poll_interval_secs(),
            order_expiration_secs: default_order_expiration_secs(),
            dry_run: true,
            http_timeout_ms: default_http_timeout_ms(),
            http_pool_size: default_http_pool_size(),
            port: default_port(),
            metrics_port: default_metrics_port(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            turbine_trader_address: "0x1234567890abcdef1234567890abcdef12345678".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn default_values_are_sensible() {
        assert_eq!(default_num_levels(), 6);
        assert_eq!(default_lambda(), 1.5);
        assert_eq!(default_base_spread(), 0.02);
        assert!(default_true());
        assert_eq!(default_allocation(), Decimal::new(40, 0));
    }

    #[test]
    fn validate_accepts_defaults_with_address() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_address() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_lambda() {
        let config = Config {
            geometric_lambda: 1.0,
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_windows() {
        let config = Config {
            pull_window_secs: 300,
            widen_window_secs: 120,
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn asset_list_parses_and_uppercases() {
        let config = Config {
            assets: "btc, eth,".to_string(),
            ..valid_config()
        };
        assert_eq!(config.asset_list(), vec!["BTC".to_string(), "ETH".to_string()]);
    }
}
