//! Loading, environment expansion and validation of the network config.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use anyhow::{bail, Context, Result};
use tracing::info;

use super::{CometConfig, MonitorConfig, NetworkConfig};

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/networks.toml";

/// Engine tunables for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Re-alert cooldown in seconds
    pub alert_interval: u64,
    pub multicall_size: usize,
    pub log_fetching_block_range: u64,
    pub log_fetching_interval: Duration,
    pub max_findings_per_block: usize,
    pub gap_fill_max_blocks: u64,
    pub poll_interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            alert_interval: 3600,
            multicall_size: 100,
            log_fetching_block_range: 2000,
            log_fetching_interval: Duration::from_millis(2000),
            max_findings_per_block: 10,
            gap_fill_max_blocks: 0,
            poll_interval: Duration::from_millis(1000),
        }
    }
}

/// Validated Comet market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CometMarket {
    pub address: Address,
    pub deployment_block: u64,
    pub large_threshold: U256,
    pub monitoring_list_length: usize,
}

/// Fully resolved network configuration.
#[derive(Debug, Clone)]
pub struct ResolvedNetwork {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub multicall_address: Option<Address>,
    pub settings: MonitorSettings,
    pub comets: Vec<CometMarket>,
}

impl MonitorConfig {
    /// Load and expand a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse config {:?}", path))
    }

    /// Parse TOML and expand `${VAR}` references.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: MonitorConfig = toml::from_str(content)?;
        config.expand_env_vars();
        Ok(config)
    }

    /// Load from `MONITOR_CONFIG`, falling back to [`DEFAULT_CONFIG_PATH`].
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("MONITOR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        info!(path = %path, "Loading monitor configuration");
        Self::from_file(path)
    }

    /// Expand environment variables in config values.
    pub fn expand_env_vars(&mut self) {
        for network in &mut self.networks {
            network.rpc_url = expand_env(&network.rpc_url);
        }
    }

    /// Chain IDs present in the file.
    pub fn chain_ids(&self) -> Vec<u64> {
        self.networks.iter().map(|n| n.chain_id).collect()
    }

    /// Resolve and validate the network for `chain_id`.
    pub fn network(&self, chain_id: u64) -> Result<ResolvedNetwork> {
        let network = self
            .networks
            .iter()
            .find(|n| n.chain_id == chain_id)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No network configured for chain {} (configured: {:?})",
                    chain_id,
                    self.chain_ids()
                )
            })?;

        network
            .resolve()
            .with_context(|| format!("Invalid configuration for chain {}", chain_id))
    }
}

impl NetworkConfig {
    fn resolve(&self) -> Result<ResolvedNetwork> {
        if self.multicall_size == 0 {
            bail!("multicall_size must be positive");
        }
        if self.log_fetching_block_range == 0 {
            bail!("log_fetching_block_range must be positive");
        }
        if self.max_findings_per_block == 0 {
            bail!("max_findings_per_block must be positive");
        }
        if self.comets.is_empty() {
            bail!("at least one [[network.comet]] is required");
        }

        let multicall_address = self
            .multicall_address
            .as_deref()
            .map(|s| s.parse::<Address>().map_err(|e| anyhow::anyhow!("Invalid multicall_address '{}': {}", s, e)))
            .transpose()?;

        let mut seen = HashSet::new();
        let comets = self
            .comets
            .iter()
            .map(|c| {
                let market = c.resolve()?;
                if !seen.insert(market.address) {
                    bail!("duplicate comet address {}", market.address);
                }
                Ok(market)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ResolvedNetwork {
            chain_id: self.chain_id,
            name: self
                .name
                .clone()
                .unwrap_or_else(|| format!("chain-{}", self.chain_id)),
            rpc_url: self.rpc_url.clone(),
            multicall_address,
            settings: MonitorSettings {
                alert_interval: self.alert_interval_secs,
                multicall_size: self.multicall_size,
                log_fetching_block_range: self.log_fetching_block_range,
                log_fetching_interval: Duration::from_millis(self.log_fetching_interval_ms),
                max_findings_per_block: self.max_findings_per_block,
                gap_fill_max_blocks: self.gap_fill_max_blocks,
                poll_interval: Duration::from_millis(self.poll_interval_ms),
            },
            comets,
        })
    }
}

impl CometConfig {
    fn resolve(&self) -> Result<CometMarket> {
        let address: Address = self
            .address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid comet address '{}': {}", self.address, e))?;
        let large_threshold = U256::from_str_radix(self.base_large_threshold.trim(), 10).map_err(|e| {
            anyhow::anyhow!(
                "Invalid base_large_threshold '{}' for {}: {}",
                self.base_large_threshold,
                address,
                e
            )
        })?;
        if self.monitoring_list_length == 0 {
            bail!("monitoring_list_length must be positive for {}", address);
        }

        Ok(CometMarket {
            address,
            deployment_block: self.deployment_block,
            large_threshold,
            monitoring_list_length: self.monitoring_list_length,
        })
    }
}

/// Expand ${VAR_NAME} patterns with environment variable values.
fn expand_env(s: &str) -> String {
    let mut result = s.to_string();
    let Ok(re) = regex_lite::Regex::new(r"\$\{([^}]+)\}") else {
        return result;
    };

    for cap in re.captures_iter(s) {
        if let (Some(full_match), Some(var_match)) = (cap.get(0), cap.get(1)) {
            if let Ok(value) = std::env::var(var_match.as_str()) {
                result = result.replace(full_match.as_str(), &value);
            }
        }
    }

    result
}
