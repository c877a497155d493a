//! Per-network monitor configuration as written in TOML.

use serde::{Deserialize, Serialize};

/// Top-level configuration file: one `[[network]]` table per chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(rename = "network", default)]
    pub networks: Vec<NetworkConfig>,
}

/// Settings for one chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Chain ID
    pub chain_id: u64,
    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,
    /// HTTP RPC endpoint, `${VAR}` is expanded from the environment
    pub rpc_url: String,
    /// Multicall3 deployment (canonical address if unset)
    #[serde(default)]
    pub multicall_address: Option<String>,

    /// Minimum seconds between two risk alerts for the same borrower
    #[serde(default = "default_alert_interval")]
    pub alert_interval_secs: u64,
    /// Maximum sub-calls per multicall round trip
    #[serde(default = "default_multicall_size")]
    pub multicall_size: usize,
    /// Blocks per backfill log window
    #[serde(default = "default_block_range")]
    pub log_fetching_block_range: u64,
    /// Minimum milliseconds between backfill windows
    #[serde(default = "default_fetching_interval")]
    pub log_fetching_interval_ms: u64,
    /// Findings returned per block, the rest wait in the buffer
    #[serde(default = "default_max_findings")]
    pub max_findings_per_block: usize,
    /// Largest block gap that is caught up instead of skipped
    #[serde(default)]
    pub gap_fill_max_blocks: u64,
    /// Head polling interval for the binary
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Monitored Comet markets
    #[serde(rename = "comet", default)]
    pub comets: Vec<CometConfig>,
}

fn default_alert_interval() -> u64 {
    60 * 60
}
fn default_multicall_size() -> usize {
    100
}
fn default_block_range() -> u64 {
    2000
}
fn default_fetching_interval() -> u64 {
    2000
}
fn default_max_findings() -> usize {
    10
}
fn default_poll_interval() -> u64 {
    1000
}

/// One Comet market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CometConfig {
    /// Market address
    pub address: String,
    /// Block the market was deployed at, backfill starts here
    pub deployment_block: u64,
    /// Present-value borrow, in base-asset units, at which a position is large
    pub base_large_threshold: String,
    /// Capacity of the market's monitoring list
    pub monitoring_list_length: usize,
}
