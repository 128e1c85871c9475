//! Market ladder command-line entry point.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use market_ladder::config::Config;
use market_ladder::feed;
use market_ladder::market::{load_view, refresh_book, MarketClient, Outcome, ViewKey};
use market_ladder::metrics;
use market_ladder::orderbook::DepthView;
use market_ladder::reconcile::{ViewAction, ViewState};
use market_ladder::trading::{estimate_limit, Action};
use market_ladder::utils::{format_2dp, format_cents, format_usd, shutdown_signal};

const BAR_WIDTH: u32 = 20;

/// Order-book ladder and live order/position viewer.
#[derive(Parser, Debug)]
#[command(name = "market-ladder")]
#[command(about = "Depth ladders, fill estimates and live orders for binary prediction markets")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Serve Prometheus metrics on this port.
    #[arg(long, global = true)]
    metrics_port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check configuration validity.
    CheckConfig,

    /// Print the depth ladder for one outcome.
    Book {
        /// Market ID.
        #[arg(long)]
        market: String,

        /// Outcome to view (yes or no).
        #[arg(long, default_value = "yes")]
        outcome: Outcome,
    },

    /// Estimate a market order, or a limit order with --price.
    Quote {
        /// Market ID.
        #[arg(long)]
        market: String,

        /// Outcome to trade (yes or no).
        #[arg(long, default_value = "yes")]
        outcome: Outcome,

        /// buy or sell.
        #[arg(long)]
        action: Action,

        /// Dollars to spend (buy) or contracts to sell.
        #[arg(long)]
        amount: Decimal,

        /// Limit price in cents; `amount` is then a contract count.
        #[arg(long)]
        price: Option<Decimal>,
    },

    /// Follow the book, open orders and positions live.
    Watch {
        /// Market ID.
        #[arg(long)]
        market: String,

        /// Outcome to view (yes or no).
        #[arg(long, default_value = "yes")]
        outcome: Outcome,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Commands report load errors themselves; logging falls back to defaults.
    let log_config = Config::load().unwrap_or_default();
    let filter = EnvFilter::try_new(log_config.log_directive(args.verbose))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    if let Some(port) = args.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        info!(%addr, "Prometheus exporter listening");
    }
    metrics::init_metrics();

    match args.command {
        Command::CheckConfig => cmd_check_config(),
        Command::Book { market, outcome } => cmd_book(ViewKey::new(market, outcome)).await,
        Command::Quote {
            market,
            outcome,
            action,
            amount,
            price,
        } => cmd_quote(ViewKey::new(market, outcome), action, amount, price).await,
        Command::Watch { market, outcome } => cmd_watch(ViewKey::new(market, outcome)).await,
    }
}

fn load_config() -> market_ladder::Result<Config> {
    Config::load_validated()
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("MARKET LADDER - CONFIGURATION CHECK");
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
    if let Err(e) = config.validate() {
        println!("FAILED");
        println!("  Error: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed"));
    }
    println!("OK");

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  API URL: {}", config.api_url);
    println!("  Push URL: {}", config.ws_url);
    println!(
        "  Auth Token: {}",
        if config.auth_token.is_some() { "set" } else { "not set" }
    );
    println!("  Taker Fee: {}%", config.taker_fee);
    println!("  Maker Fee: {}%", config.maker_fee);
    println!("  HTTP Timeout: {}ms", config.http_timeout_ms);
    println!("  Channel Capacity: {}", config.channel_capacity);
    println!("  Log Filter: {}", config.log_directive(false));
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

fn print_side(label: &str, view: &DepthView) {
    println!("{label}");
    if view.is_empty() {
        println!("  (no liquidity)");
        return;
    }
    for (i, level) in view.levels.iter().enumerate() {
        let bar_len = (view.relative_depth(i) * Decimal::from(BAR_WIDTH))
            .round()
            .to_usize()
            .unwrap_or(0);
        println!(
            "  {:>9} {:>12} {:>12}  {}",
            format_cents(Some(level.price)),
            format_2dp(level.size),
            format_usd(view.cumulative[i] / Outcome::PAR_CENTS),
            "#".repeat(bar_len)
        );
    }
}

fn print_view(view: &ViewState) {
    let summary = view.summary();
    println!("======================================================================");
    println!("{}", view.key());
    println!("======================================================================");
    match view.depth() {
        Some(depth) => {
            print_side("ASKS", &depth.asks);
            println!(
                "---- spread {} | last {} ----",
                summary.spread_display(),
                summary.last_price_display()
            );
            print_side("BIDS", &depth.bids);
        }
        None => println!("(no valid book yet)"),
    }

    println!("----------------------------------------------------------------------");
    println!("Open orders: {}", view.orders().len());
    for (market, orders) in view.orders().groups() {
        for order in orders {
            println!(
                "  [{market}] {} {} {} @ {} ({}/{} filled, {})",
                order.id,
                order.action,
                order.side,
                format_cents(Some(order.price)),
                format_2dp(order.exec_qty),
                format_2dp(order.quantity),
                order.status
            );
        }
    }
    println!("Positions: {}", view.positions().len());
    for position in view.positions().iter() {
        println!(
            "  [{}] {} x{} entry {} last {} pnl {}",
            position.market_id,
            position.side,
            format_2dp(position.quantity),
            format_cents(position.entry_price()),
            format_cents(position.last),
            position
                .pnl()
                .map(format_usd)
                .unwrap_or_else(|| "-".to_string())
        );
    }
}

async fn cmd_book(key: ViewKey) -> anyhow::Result<()> {
    let config = load_config()?;
    let client = MarketClient::new(&config)?;
    let mut view = ViewState::new(key);

    let report = load_view(&client, &mut view).await?;
    if !report.book_accepted {
        warn!("Book snapshot was malformed and has been discarded");
    }
    print_view(&view);
    Ok(())
}

async fn cmd_quote(
    key: ViewKey,
    action: Action,
    amount: Decimal,
    price: Option<Decimal>,
) -> anyhow::Result<()> {
    let config = load_config()?;

    if let Some(price) = price {
        let estimate = estimate_limit(action, price, amount, config.maker_fee)
            .ok_or_else(|| anyhow::anyhow!("Limit order total is out of range"))?;
        println!("Limit {action} {amount} @ {}", format_cents(Some(price)));
        println!("  Total: {}", format_usd(estimate.total));
        println!("  Payout if correct: {}", format_usd(estimate.payout_if_correct));
        return Ok(());
    }

    let client = MarketClient::new(&config)?;
    let mut view = ViewState::new(key);
    load_view(&client, &mut view).await?;

    let estimate = view.quote(action, amount, config.taker_fee);
    println!("Market {action} {amount} on {}", view.key());
    println!("  Contracts: {}", format_2dp(estimate.contracts));
    println!("  Avg price: {}", estimate.avg_price_display());
    match action {
        Action::Buy => {
            println!("  Cost: {}", format_usd(estimate.total_cost));
            println!("  Payout if correct: {}", estimate.payout_display());
            println!("  Unspent: {}", format_usd(estimate.remaining));
        }
        Action::Sell => {
            println!("  Gross: {}", format_usd(estimate.total_cost));
            println!("  Proceeds after fee: {}", estimate.payout_display());
            println!("  Unfilled: {}", format_2dp(estimate.remaining));
        }
    }
    Ok(())
}

async fn cmd_watch(key: ViewKey) -> anyhow::Result<()> {
    let config = load_config()?;
    let client = MarketClient::new(&config)?;
    let mut view = ViewState::new(key);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let mut subscription =
            feed::subscribe(&config, view.key(), view.subscription()).await?;
        load_view(&client, &mut view).await?;
        print_view(&view);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping watch");
                    return Ok(());
                }
                envelope = subscription.recv() => {
                    let Some(envelope) = envelope else {
                        break;
                    };
                    match view.handle(envelope) {
                        ViewAction::Applied(_) => print_view(&view),
                        ViewAction::RefreshBook => {
                            match refresh_book(&client, &mut view).await {
                                Ok(_) => print_view(&view),
                                Err(e) => error!(error = %e, "Book refresh failed"),
                            }
                        }
                        ViewAction::Stale | ViewAction::Ignored => {}
                    }
                }
            }
        }

        warn!(view = %view.key(), "Push channel closed, resubscribing");
        drop(subscription);
        let key = view.key().clone();
        view.switch_to(key);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
