//! Market maker entry point.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use turbine_mm::api::{create_router, AppState};
use turbine_mm::config::Config;
use turbine_mm::engine::RebalanceController;
use turbine_mm::feed::{PriceFeed, PythFeed};
use turbine_mm::market::{Exchange, TurbineClient};
use turbine_mm::metrics;
use turbine_mm::utils::shutdown_signal;

/// Probability-based market maker for 15-minute binary prediction markets.
#[derive(Parser, Debug)]
#[command(name = "turbine-mm")]
#[command(about = "Automated market maker for 15-minute binary prediction markets")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// Run in dry-run mode (orders stay in a local paper book).
    #[arg(long)]
    dry_run: Option<bool>,

    /// HTTP server port for health/status.
    #[arg(short, long, default_value = "8080")]
    port: u16,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the market making loop (default).
    Run {
        /// Run in dry-run mode (orders stay in a local paper book).
        #[arg(long)]
        dry_run: Option<bool>,

        /// HTTP server port for health/status.
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Discover the current active quick market for an asset.
    DiscoverMarket {
        /// Asset symbol.
        #[arg(default_value = "BTC")]
        asset: String,
    },

    /// Fetch the current reference price for an asset.
    CheckFeed {
        /// Asset symbol.
        #[arg(default_value = "BTC")]
        asset: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("turbine_mm=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    metrics::init_metrics();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::DiscoverMarket { asset }) => cmd_discover_market(&asset).await,
        Some(Command::CheckFeed { asset }) => cmd_check_feed(&asset).await,
        Some(Command::Run { dry_run, port }) => cmd_run(dry_run, port).await,
        None => cmd_run(args.dry_run, args.port).await,
    }
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("TURBINE MM - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Assets: {}", config.asset_list().join(", "));
    println!("  Allocation: ${} per market", config.allocation_usdc);
    println!(
        "  Ladder: {} levels/side, lambda {}",
        config.num_levels, config.geometric_lambda
    );
    println!(
        "  Spread: {:.2}% base, [{:.2}%, {:.2}%]",
        config.base_spread * 100.0,
        config.min_spread * 100.0,
        config.max_spread * 100.0
    );
    println!(
        "  Rebalance: >{:.1}% target shift, min {}s apart",
        config.rebalance_threshold * 100.0,
        config.min_rebalance_secs
    );
    println!(
        "  Risk: pull at {}s, breaker {:.0}% one-sided for {}s cooldown",
        config.pull_window_secs,
        config.adverse_fill_threshold * 100.0,
        config.breaker_cooldown_secs
    );
    println!("  Poll interval: {}s", config.poll_interval_secs);
    println!("  Dry Run: {}", config.dry_run);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Discover the current active quick market for an asset.
async fn cmd_discover_market(asset: &str) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("TURBINE MM - MARKET DISCOVERY");
    println!("======================================================================");

    let config = Config::load()?;
    let client = TurbineClient::new(&config);

    println!("\nSearching for active {} quick market...\n", asset);

    match client.get_active_market(asset).await? {
        Some(market) => {
            let now = time::OffsetDateTime::now_utc().unix_timestamp();
            println!("MARKET FOUND");
            println!("----------------------------------------------------------------------");
            println!("  Market ID: {}", market.market_id);
            println!("  Strike: ${:.2}", market.strike_usd());
            println!("  Time Remaining: {}", market.time_remaining_str(now));
            println!("======================================================================");
        }
        None => {
            println!("NO ACTIVE MARKET FOUND");
            println!("\nQuick markets open every 15 minutes. Try again shortly.");
            println!("======================================================================");
        }
    }

    Ok(())
}

/// Fetch the current reference price for an asset.
async fn cmd_check_feed(asset: &str) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("TURBINE MM - PRICE FEED CHECK");
    println!("======================================================================");

    let config = Config::load()?;
    let feed = PythFeed::new(&config);

    print!("\nFetching {} price... ", asset);
    match feed.latest_price(asset).await {
        Ok(price) => {
            println!("OK");
            println!("  {} = ${:.2}", asset, price);
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Feed check failed"));
        }
    }
    println!("======================================================================");

    Ok(())
}

/// Run the market making loop.
async fn cmd_run(dry_run_override: Option<bool>, port: u16) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let mut config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Some(dry_run) = dry_run_override {
        config.dry_run = dry_run;
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    info!("========================================");
    info!("TURBINE MARKET MAKER");
    info!("========================================");
    info!("Mode: {}", if config.dry_run { "DRY RUN" } else { "LIVE TRADING" });
    info!("Assets: {}", config.asset_list().join(", "));
    info!(
        "Allocation: ${} ({} levels/side, lambda {})",
        config.allocation_usdc, config.num_levels, config.geometric_lambda
    );
    info!(
        "Spread: {:.2}% base, widening inside {}s of settlement",
        config.base_spread * 100.0,
        config.widen_window_secs
    );
    info!(
        "Rebalance: >{:.1}% target shift, min {}s apart",
        config.rebalance_threshold * 100.0,
        config.min_rebalance_secs
    );
    info!(
        "Risk: pull quotes at {}s, circuit breaker at {:.0}% one-sided fills",
        config.pull_window_secs,
        config.adverse_fill_threshold * 100.0
    );
    info!("========================================");

    // Prometheus exporter.
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    if let Err(e) = PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
    {
        warn!(error = %e, "Prometheus exporter failed to start, continuing without it");
    } else {
        info!("Prometheus exporter listening on {}", metrics_addr);
    }

    // Health/status server.
    let app_state = AppState::new();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());
    let _server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    // Collaborators and the engine.
    let exchange = TurbineClient::new(&config);
    let feed = PythFeed::new(&config);
    let poll_interval = Duration::from_secs(config.poll_interval_secs);
    let mut controller = RebalanceController::new(exchange, feed, config);

    info!("Starting quoting loop...");
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                controller.tick().await;

                let statuses = controller.statuses();
                app_state.set_ready(!statuses.is_empty());
                *app_state.statuses.write().await = statuses;
            }
            _ = &mut shutdown => {
                info!("Shutting down, cancelling outstanding orders...");
                controller.shutdown().await;
                break;
            }
        }
    }

    info!("Bot stopped.");
    Ok(())
}
