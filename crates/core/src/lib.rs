//! Comet monitor core logic.
//!
//! This crate provides the large borrow monitoring engine:
//! - Fixed-point present value of Comet principals
//! - Bounded, sorted per-market monitoring lists
//! - Rate-limited historical backfill
//! - Per-block list updates, absorption reporting and collateralization checks
//! - A finding buffer that carries overflow to the next block
//! - Network configuration loading

mod backfill;
pub mod config;
mod error;
mod finding;
mod finding_buffer;
mod monitor;
mod monitoring_list;
pub mod rate;
mod rate_limit;
mod state;

#[cfg(test)]
mod testing;

pub use backfill::{backfill, BackfillOutcome};
pub use config::{CometMarket, MonitorConfig, MonitorSettings, ResolvedNetwork};
pub use error::MonitorError;
pub use finding::{chain_name, Finding, FindingKind, Severity};
pub use finding_buffer::FindingBuffer;
pub use monitor::CometMonitor;
pub use monitoring_list::{BorrowPosition, MonitoringList, UpsertOutcome};
pub use rate_limit::MinIntervalScheduler;
pub use state::{AgentState, Phase};
