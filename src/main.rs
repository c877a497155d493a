//! Comet Large Borrow Monitor
//!
//! Watches Compound V3 (Comet) markets and reports:
//! - Absorptions of large borrow positions
//! - Large borrow positions that are no longer collateralized
//!
//! Runs a one-time backfill of every configured market, then polls for new
//! blocks and emits findings as JSON log lines.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use comet_monitor_chain::{CometV3Protocol, ProviderManager};
use comet_monitor_core::{AgentState, CometMonitor, Finding, MonitorConfig, ResolvedNetwork};

/// Environment variable names.
mod env {
    pub const CHAIN_ID: &str = "CHAIN_ID";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}

/// Delay between failed initialization attempts.
const INIT_RETRY_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Print startup banner
    print_banner();

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let chain_id: u64 = match std::env::var(env::CHAIN_ID) {
        Ok(v) => v
            .parse()
            .with_context(|| format!("Invalid {}: {}", env::CHAIN_ID, v))?,
        Err(_) => 1,
    };

    let config = MonitorConfig::from_env()?;
    let network = config.network(chain_id)?;
    info!(
        chain_id = network.chain_id,
        network = %network.name,
        comets = network.comets.len(),
        "Network configuration loaded"
    );

    let provider = Arc::new(
        ProviderManager::new(&network.rpc_url, network.multicall_address)
            .await
            .context("Failed to connect to RPC")?,
    );

    let rpc_chain_id = provider.chain_id().await?;
    if rpc_chain_id != network.chain_id {
        anyhow::bail!(
            "RPC reports chain {} but network {} is configured for chain {}",
            rpc_chain_id,
            network.name,
            network.chain_id
        );
    }

    let source = Arc::new(CometV3Protocol::new(
        provider.clone(),
        network.settings.multicall_size,
    ));
    let monitor = CometMonitor::new(source, &network);

    tokio::select! {
        result = run(&monitor, &provider, &network) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            Ok(())
        }
    }
}

fn init_tracing() {
    let json = std::env::var(env::LOG_FORMAT).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,comet_monitor_core=debug,comet_monitor_chain=debug")
            }),
        )
        .init();
}

/// Initialize, then process every new block in order.
async fn run(
    monitor: &CometMonitor<CometV3Protocol>,
    provider: &ProviderManager,
    network: &ResolvedNetwork,
) -> Result<()> {
    let mut state = AgentState::new();

    info!("Starting backfill...");
    loop {
        match monitor.initialize(&mut state).await {
            Ok(()) => break,
            Err(e) => {
                error!(error = %e, "Initialization failed, retrying");
                tokio::time::sleep(INIT_RETRY_DELAY).await;
            }
        }
    }

    let mut next_block = state
        .initialization_block()
        .map_or(0, |block| block.saturating_add(1));

    let mut ticker = tokio::time::interval(network.settings.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(from_block = next_block, "Starting block loop...");
    loop {
        ticker.tick().await;

        let head = match provider.block_number().await {
            Ok(head) => head,
            Err(e) => {
                warn!(error = %e, "Failed to fetch head");
                continue;
            }
        };

        while next_block <= head {
            let block = match provider.block_info(next_block).await {
                Ok(block) => block,
                Err(e) => {
                    warn!(block = next_block, error = %e, "Failed to fetch block");
                    break;
                }
            };

            match monitor.on_block(&mut state, block).await {
                Ok(findings) => {
                    findings.iter().for_each(publish);
                    next_block += 1;
                }
                Err(e) => {
                    // State is unchanged, the same block is retried next tick
                    error!(block = next_block, error = %e, "Block processing failed");
                    break;
                }
            }
        }
    }
}

/// Emit a finding as a JSON log line.
fn publish(finding: &Finding) {
    match serde_json::to_string(finding) {
        Ok(json) => info!(
            alert_id = finding.alert_id,
            comet = %finding.contract,
            block = finding.block_number,
            finding = %json,
            "Finding"
        ),
        Err(e) => error!(alert_id = finding.alert_id, error = %e, "Failed to serialize finding"),
    }
}

/// Print startup banner.
fn print_banner() {
    println!(
        r#"
    ╔═╗┌─┐┌┬┐┌─┐┌┬┐  ╔╦╗┌─┐┌┐┌┬┌┬┐┌─┐┬─┐
    ║  │ ││││├┤  │   ║║║│ │││││ │ │ │├┬┘
    ╚═╝└─┘┴ ┴└─┘ ┴   ╩ ╩└─┘┘└┘┴ ┴ └─┘┴└─
    Large Borrow Monitor v0.1.0
    "#
    );
}
