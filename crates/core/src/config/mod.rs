//! Configuration for the Comet monitor.
//!
//! This module provides:
//! - TOML network configuration (RPC, timing, batching, monitored markets)
//! - `${VAR}` expansion from the environment
//! - Validation into a resolved per-network form

mod loader;
mod network;

pub use loader::{CometMarket, MonitorSettings, ResolvedNetwork, DEFAULT_CONFIG_PATH};
pub use network::{CometConfig, MonitorConfig, NetworkConfig};
