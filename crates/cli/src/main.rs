use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use gmxlp_core::{Alert, AppConfig, Notifier, SnapshotProvider};
use gmxlp_data::{GmxClient, GmxSnapshotProvider};
use gmxlp_engine::{AllocationEngine, PaperExecutor};
use gmxlp_notify::{LogNotifier, TelegramNotifier};
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Parser)]
#[command(name = "gmxlp")]
#[command(about = "Capital allocator for GMX GM liquidity pools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the allocation loop at the configured cadence
    Run {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
        /// Plan and alert without executing any signal
        #[arg(long)]
        dry_run: bool,
        /// Uninvested capital available for allocation, USD
        #[arg(long, default_value = "0")]
        capital: Decimal,
    },
    /// Score all pools once and print the ranking table
    Rankings {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
    /// Run the risk monitor once against current positions
    RiskCheck {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run {
            config,
            dry_run,
            capital,
        } => run_allocator(&config, dry_run, capital).await?,
        Commands::Rankings { config } => run_rankings(&config).await?,
        Commands::RiskCheck { config } => run_risk_check(&config).await?,
    }

    Ok(())
}

/// Notifier used by the loop: every alert goes to the log, and to Telegram
/// when configured.
struct CliNotifier {
    log: LogNotifier,
    telegram: TelegramNotifier,
}

impl CliNotifier {
    fn new(config: &AppConfig) -> Self {
        Self {
            log: LogNotifier,
            telegram: TelegramNotifier::new(&config.notifications.telegram),
        }
    }
}

#[async_trait]
impl Notifier for CliNotifier {
    async fn notify(&self, alert: &Alert) -> Result<()> {
        self.log.notify(alert).await?;
        self.telegram.notify(alert).await
    }
}

fn provider(config: &AppConfig) -> GmxSnapshotProvider {
    let client = GmxClient::new(config.network.stats_api_url.clone());
    let wallet = if config.wallet.address.is_empty() {
        None
    } else {
        Some(config.wallet.address.clone())
    };
    GmxSnapshotProvider::new(client, wallet)
}

async fn run_allocator(config_path: &str, dry_run: bool, capital: Decimal) -> Result<()> {
    let config = gmxlp_core::ConfigLoader::load(config_path)
        .with_context(|| format!("loading config from {config_path}"))?;

    tracing::info!(
        chain = %config.network.chain,
        profile = %config.strategy.profile,
        interval_secs = config.execution.check_interval_secs,
        dry_run,
        %capital,
        "starting allocator"
    );

    let notifier = CliNotifier::new(&config);
    let snapshot_provider = provider(&config);
    let mut engine = AllocationEngine::new(
        config,
        snapshot_provider,
        PaperExecutor::new(),
        notifier,
        capital,
        dry_run,
    )?;

    tokio::select! {
        result = engine.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received Ctrl+C, shutting down");
            Ok(())
        }
    }
}

async fn run_rankings(config_path: &str) -> Result<()> {
    let config = gmxlp_core::ConfigLoader::load(config_path)
        .with_context(|| format!("loading config from {config_path}"))?;
    let profile = config.strategy.profile.clone();

    let snapshot_provider = provider(&config);
    let engine = AllocationEngine::new(
        config,
        snapshot_provider,
        PaperExecutor::new(),
        LogNotifier,
        Decimal::ZERO,
        true,
    )?;

    let rankings = engine.rankings().await?;

    println!("\n{}", "=".repeat(92));
    println!("Pool Rankings - profile: {profile}");
    println!("{}", "=".repeat(92));
    println!(
        "{:<4} {:<12} {:>8} {:>14} {:>9} {:>8} {:>8} {:>8} {:>8}",
        "#", "Pool", "APY", "TVL", "Score", "sAPY", "sRisk", "sLiq", "sBal"
    );
    println!("{}", "-".repeat(92));

    for (index, row) in rankings.iter().enumerate() {
        println!(
            "{:<4} {:<12} {:>7.1}% {:>14} {:>9.4} {:>8.3} {:>8.3} {:>8.3} {:>8.3}",
            index + 1,
            row.name,
            row.apy * 100.0,
            row.tvl.round(),
            row.composite,
            row.apy_score,
            row.risk_score,
            row.liquidity_score,
            row.balance_score,
        );
    }

    println!("{}", "=".repeat(92));
    println!("{} pools scored\n", rankings.len());

    Ok(())
}

async fn run_risk_check(config_path: &str) -> Result<()> {
    let config = gmxlp_core::ConfigLoader::load(config_path)
        .with_context(|| format!("loading config from {config_path}"))?;

    let snapshot = provider(&config).snapshot().await?;
    let markets: HashMap<_, _> = snapshot
        .markets
        .iter()
        .map(|m| (m.market_key.clone(), m.clone()))
        .collect();
    let stats: HashMap<_, _> = snapshot
        .stats
        .iter()
        .map(|s| (s.market_key.clone(), s.clone()))
        .collect();

    let report = gmxlp_risk::evaluate(
        &snapshot.positions,
        &markets,
        &stats,
        &config.strategy,
        &config.risk,
    )?;
    let summary = gmxlp_risk::risk_summary(&snapshot.positions, &report);

    println!("\n{}", "=".repeat(80));
    println!(
        "Risk Check - {} position(s), total value {}",
        snapshot.positions.len(),
        summary.total_value_usd.round_dp(2)
    );
    println!("{}", "=".repeat(80));

    if report.alerts.is_empty() {
        println!("No findings.");
    } else {
        for alert in &report.alerts {
            let scope = alert.market_key.as_deref().unwrap_or("portfolio");
            println!(
                "{} [{:?}/{:?}] {:<12} {}",
                alert.emoji(),
                alert.severity,
                alert.category,
                scope,
                alert.message,
            );
        }
    }

    println!("{}", "-".repeat(80));
    println!("Risk level: {:?}", summary.level);
    if report.emergency_exit {
        println!("EMERGENCY EXIT: stop-loss breached, close all positions");
    }
    println!();

    Ok(())
}
