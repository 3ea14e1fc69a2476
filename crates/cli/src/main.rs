//! Command line entry point for the range keeper.
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use clmm_keeper_data::collector::{FeedCollector, SignalCollector};
use clmm_keeper_data::providers::{RamsesYieldProvider, SpotPriceProvider};
use clmm_keeper_data::repositories::HistoryStore;
use clmm_keeper_domain::entities::SignalSnapshot;
use clmm_keeper_domain::math::{adjust_for_decimals, find_range_from_sqrt_price};
use clmm_keeper_execution::lifecycle::LifecycleTracker;
use clmm_keeper_execution::service::KeeperService;
use clmm_keeper_execution::strategy::{
    Collaborators, ControllerConfig, DecisionCycle, PlannedAction, PositionController,
};
use clmm_keeper_protocols::oneinch::OneInchClient;
use clmm_keeper_protocols::ramses::RamsesClient;
use dotenv::dotenv;
use primitive_types::U256;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod config;
mod logging;

use config::Config;

#[derive(Parser)]
#[command(name = "clmm-keeper")]
#[command(about = "Signal-driven range keeper for a concentrated-liquidity position", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the collection and decision cycles on their schedules
    Run {
        /// Only collect prices, yields and signals
        #[arg(long)]
        collect_only: bool,
    },
    /// Run one collection cycle and print the signal row
    Collect {
        /// Skip the feeds and only recompute signals from stored history
        #[arg(long)]
        signals_only: bool,
    },
    /// Evaluate the gate and the position against chain state
    Check {
        /// Act on the result instead of only reporting it
        #[arg(long)]
        execute: bool,
    },
    /// Print the range derived from a raw pool price slot
    Range {
        /// Pool sqrtPriceX96 as a decimal integer
        #[arg(long, value_parser = parse_u256)]
        sqrt_price_x96: U256,
    },
}

fn parse_u256(raw: &str) -> std::result::Result<U256, String> {
    U256::from_dec_str(raw.trim()).map_err(|e| format!("not a decimal integer: {e:?}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::from_env()?,
    };
    config.logging.init()?;

    match cli.command {
        Commands::Run { collect_only } => run(&config, collect_only).await,
        Commands::Collect { signals_only } => collect(&config, signals_only).await,
        Commands::Check { execute } => check(&config, execute).await,
        Commands::Range { sqrt_price_x96 } => {
            print_range(&config, sqrt_price_x96);
            Ok(())
        }
    }
}

async fn open_store(config: &Config) -> Result<HistoryStore> {
    let store = HistoryStore::new(
        config.storage.clone(),
        config.feeds.assets(),
        config.instruments.clone(),
    );
    store.init().await.context("initializing history files")?;
    Ok(store)
}

fn feed_collector(config: &Config, store: &HistoryStore) -> FeedCollector {
    let timeout = Duration::from_secs(config.feeds.request_timeout_secs);
    FeedCollector::new(
        Arc::new(SpotPriceProvider::new(
            config.feeds.clone(),
            config.secrets.coingecko_api_key.clone(),
        )),
        Arc::new(RamsesYieldProvider::new(config.feeds.yield_url.clone(), timeout)),
        store,
        config.instruments.clone(),
    )
}

fn signal_collector(config: &Config, store: &HistoryStore) -> Result<SignalCollector> {
    Ok(SignalCollector::new(
        store,
        &config.instruments,
        &config.pairs,
        config.volatility.clone(),
        &config.strategy,
    )?)
}

fn decision_cycle(config: &Config, store: &HistoryStore) -> Result<DecisionCycle> {
    let chain = Arc::new(
        RamsesClient::connect(&config.chain, config.rpc_url(), config.secrets.private_key()?)
            .context("connecting to the chain")?,
    );
    let aggregator = Arc::new(OneInchClient::new(
        config.chain.aggregator_url.clone(),
        config.secrets.inch_api_key()?,
        Duration::from_secs(config.chain.call_timeout_secs),
    ));
    let wallet = chain.wallet_address().to_string();
    info!(wallet = %wallet, pool = %config.chain.pool_address, "Chain client ready");

    let controller = PositionController::new(
        Collaborators::from_chain(chain, aggregator),
        ControllerConfig::new(wallet, &config.chain, &config.strategy, &config.range),
    )
    .with_retry(config.retry.clone())
    .with_lifecycle(Arc::new(LifecycleTracker::new()));

    Ok(DecisionCycle::new(
        Arc::new(store.signals()),
        &config.strategy,
        Arc::new(controller),
    )
    .with_retry(config.retry.clone()))
}

fn keeper_service(config: &Config, store: &HistoryStore) -> Result<KeeperService> {
    Ok(KeeperService::new(
        Arc::new(signal_collector(config, store)?),
        config.schedule.clone(),
    )
    .with_feeds(Arc::new(feed_collector(config, store)))
    .with_retry(config.retry.clone()))
}

async fn run(config: &Config, collect_only: bool) -> Result<()> {
    let store = open_store(config).await?;
    let mut service = keeper_service(config, &store)?;
    if !collect_only {
        service = service.with_decision(Arc::new(decision_cycle(config, &store)?));
    }

    info!(collect_only, "Keeper starting");
    Arc::new(service)
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await;
    Ok(())
}

async fn collect(config: &Config, signals_only: bool) -> Result<()> {
    let store = open_store(config).await?;
    let service = keeper_service(config, &store)?;
    if !signals_only {
        if let Err(e) = service.collect_prices().await {
            error!(error = %e, "Price collection failed");
        }
        if let Err(e) = service.collect_yields().await {
            error!(error = %e, "Yield collection failed");
        }
    }
    let snapshot = service
        .collect_signals(Utc::now())
        .await
        .context("computing signals")?;
    print_signal(&snapshot);
    Ok(())
}

async fn check(config: &Config, execute: bool) -> Result<()> {
    let store = open_store(config).await?;
    let cycle = decision_cycle(config, &store)?;
    let now = Utc::now();

    if execute {
        let report = cycle.run(now).await?;
        println!("Gate:    {:?}", report.gate);
        match report.outcome {
            Some(outcome) => println!("Outcome: {outcome:?}"),
            None => println!("Outcome: controller not run"),
        }
        print_history(cycle.controller().lifecycle()).await;
        return Ok(());
    }

    match cycle.check_gate(now).await? {
        Some(gate) => {
            println!(
                "Gate:    {} ({})",
                if gate.condition { "pass" } else { "fail" },
                gate.reason
            );
            println!(
                "         apr={:?} volatility={:?} age={}s",
                gate.apr, gate.volatility, gate.age_secs
            );
        }
        None => println!("Gate:    no signal recorded"),
    }

    let assessment = cycle.controller().assess().await?;
    println!(
        "Pool:    tick {} sqrtPriceX96 {}",
        assessment.slot.tick, assessment.slot.sqrt_price_x96
    );
    match assessment.action {
        PlannedAction::Hold(position) => println!(
            "Action:  hold #{} [{}, {}]",
            position.token_id, position.tick_lower, position.tick_upper
        ),
        PlannedAction::Exit(position) => println!(
            "Action:  exit #{} [{}, {}] liquidity {}",
            position.token_id, position.tick_lower, position.tick_upper, position.liquidity
        ),
        PlannedAction::Enter => println!("Action:  enter"),
    }
    Ok(())
}

async fn print_history(lifecycle: &LifecycleTracker) {
    for event in lifecycle.get_events().await {
        println!(
            "Event:   {:?} {}",
            event.event_type,
            event.tx_hash.as_deref().unwrap_or("-")
        );
    }
    for position in lifecycle.get_open_positions().await {
        println!(
            "Open:    #{} [{}, {}] since {}",
            position.token_id,
            position.tick_lower,
            position.tick_upper,
            position.opened_at.to_rfc3339()
        );
    }
    let stats = lifecycle.get_aggregate_stats().await;
    println!(
        "Totals:  {} positions ({} open), {} trades, {} deferred, {} skipped",
        stats.total_positions,
        stats.open_positions,
        stats.trades,
        stats.deferred_entries,
        stats.skipped_entries
    );
}

fn print_signal(snapshot: &SignalSnapshot) {
    println!("Signals at {}", snapshot.timestamp.to_rfc3339());
    for (column, value) in &snapshot.values {
        match value {
            Some(v) => println!("{column:<28} | {v:>12.4}"),
            None => println!("{column:<28} | {:>12}", "-"),
        }
    }
}

fn print_range(config: &Config, sqrt_price_x96: U256) {
    match find_range_from_sqrt_price(sqrt_price_x96, &config.range) {
        Ok(proposal) => {
            let base = &config.chain.base_token;
            let quote = &config.chain.quote_token;
            println!("Pool price:  {:.10}", proposal.reference_price);
            println!(
                "Price:       {:.10} {} per {}",
                adjust_for_decimals(proposal.reference_price, base.decimals, quote.decimals),
                quote.symbol,
                base.symbol
            );
            println!(
                "Ticks:       [{}, {}] width {}",
                proposal.tick_lower,
                proposal.tick_upper,
                proposal.width()
            );
            println!(
                "Price range: [{:.10}, {:.10}]",
                proposal.lower_price_bound, proposal.upper_price_bound
            );
            println!("Above price: {:.4}", proposal.proportion);
        }
        Err(e) => println!("No range for {sqrt_price_x96}: {e}"),
    }
}
