use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use futures_util::future::join_all;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

// Internal Crates
use drphil_core::constants::POWER_POLL_INTERVAL;
use executor::{DryRunBroadcaster, RemoteSigner};
use strategy::analytics::vote_log::VoteJournal;
use strategy::ports::{ChainPort, TelemetryPort, VoteBroadcastPort};
use strategy::scheduler::SchedulerTiming;
use strategy::{EngineParts, VoteEngine};

mod cli;
mod config;
mod dispatcher;
mod listener;
mod metrics;
mod relay;
mod replay;
mod rpc;
mod telemetry;

use crate::cli::Cli;
use crate::config::{DrphilConfig, ExecutionMode};
use crate::dispatcher::StreamDispatcher;
use crate::listener::{EventSource, NodeStream, StreamEvent};
use crate::metrics::BotMetrics;
use crate::relay::RedisRelay;
use crate::rpc::JsonRpcClient;

#[tokio::main]
async fn main() {
    dotenv().ok();
    let cli = Cli::parse();

    // The log directory lives in the config, so load it before logging starts.
    let loaded = DrphilConfig::load(&cli.config);
    let log_dir = loaded
        .as_ref()
        .map(|c| c.log_dir.clone())
        .unwrap_or_else(|_| "logs".to_string());
    let _log_guard = init_logging(&log_dir);

    info!("🚀 drphil bootstrapping [Composition Root]...");

    let config = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("❌ CRITICAL: Failed to load {}: {}", cli.config.display(), e);
            process::exit(1);
        }
    };

    // Startup Validation (Fail Fast)
    if let Err(e) = config.validate() {
        error!("❌ Configuration Validation Failed: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(cli, config).await {
        error!("❌ {:#}", e);
        process::exit(1);
    }
}

/// Stdout plus a daily rolling file in `log_dir`.
fn init_logging(log_dir: &str) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_appender = tracing_appender::rolling::daily(log_dir, "drphil.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    guard
}

async fn run(cli: Cli, config: DrphilConfig) -> Result<()> {
    let rules = config.to_rules()?;
    let lists = config.to_lists()?;
    let credentials = config.credentials()?;

    info!(
        "✅ Config Loaded & Validated: node={}, execution={:?}",
        config.chain_options.url, config.execution_mode
    );

    if let Err(e) = drphil_core::telemetry::init_metrics() {
        warn!("Metrics registry not initialised: {}", e);
    }
    let metrics = Arc::new(BotMetrics::new());

    // Adapters (Infrastructure Layer)
    let chain: Arc<dyn ChainPort> = Arc::new(JsonRpcClient::new(&config.chain_options.url)?);

    let broadcaster: Arc<dyn VoteBroadcastPort> = match config.execution_mode {
        ExecutionMode::Simulation => {
            info!("🛡️ Simulation mode: votes are logged, never broadcast");
            Arc::new(DryRunBroadcaster::new())
        }
        ExecutionMode::Live => {
            let url = config
                .signer_url
                .as_deref()
                .context("signer_url is required in Live mode")?;
            info!("📡 Live mode: broadcasting through {}", url);
            Arc::new(RemoteSigner::new(url)?)
        }
    };

    tokio::fs::create_dir_all(&config.log_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.log_dir))?;
    let journal_path = format!("{}/votes.csv", config.log_dir);
    let journal = match VoteJournal::new(&journal_path).await {
        Ok(journal) => Some(Arc::new(journal)),
        Err(e) => {
            warn!("⚠️ Vote journal disabled: {:#}", e);
            None
        }
    };

    // Domain Services (Strategy Layer)
    let engine = Arc::new(VoteEngine::new(EngineParts {
        chain: Arc::clone(&chain),
        broadcaster,
        rules,
        lists,
        credentials,
        telemetry: Some(Arc::clone(&metrics) as Arc<dyn TelemetryPort>),
        journal,
        timing: SchedulerTiming::default(),
    }));

    if let Err(e) = engine.startup().await {
        warn!("Unable to read voter accounts at startup: {:#}", e);
    }

    if let Some(port) = config.metrics_port {
        tokio::spawn(async move {
            if let Err(e) = telemetry::serve_metrics(port).await {
                error!("❌ Metrics server stopped: {:#}", e);
            }
        });
    }

    let power = engine.power();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(POWER_POLL_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = power.poll().await {
                warn!("Unable to refresh vote power: {:#}", e);
            }
        }
    });

    let dispatcher = StreamDispatcher::new(Arc::clone(&engine));
    let (tx, rx) = mpsc::channel::<StreamEvent>(1024);

    let replay_blocks = cli.replay_blocks();
    if replay_blocks > 0 {
        let chain = Arc::clone(&chain);
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = replay::replay(chain, replay_blocks, tx).await {
                warn!("Replay failed: {:#}", e);
            }
        });
    }

    if !cli.streaming() {
        drop(tx);
        let tasks = dispatcher.run(rx, shutdown_signal()).await;
        info!("Waiting on {} pending vote task(s) before exit", tasks.len());
        tokio::select! {
            _ = join_all(tasks) => {}
            _ = shutdown_signal() => info!("🛑 Shutdown signal received"),
        }
        metrics.print_summary();
        return Ok(());
    }

    let source: Arc<dyn EventSource> = match &config.meeseeker_options {
        Some(relay) => Arc::new(RedisRelay::new(relay)),
        None => Arc::new(NodeStream::new(Arc::clone(&chain))),
    };
    tokio::spawn(listener::supervise(source, tx, Arc::clone(&metrics)));

    let _ = dispatcher.run(rx, shutdown_signal()).await;
    metrics.print_summary();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
