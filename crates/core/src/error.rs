//! Engine errors.

use alloy::primitives::Address;
use comet_monitor_chain::ChainError;
use thiserror::Error;

/// Failure of an `initialize` or `on_block` invocation.
///
/// Raised after all state changes for the invocation have been discarded.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("failed to read chain head: {0}")]
    Head(#[source] ChainError),

    #[error("failed to snapshot rates for comet {comet}: {source}")]
    Snapshot {
        comet: Address,
        #[source]
        source: ChainError,
    },

    #[error("backfill of comet {comet} failed in blocks {from}..={to}: {source}")]
    Backfill {
        comet: Address,
        from: u64,
        to: u64,
        #[source]
        source: ChainError,
    },

    #[error("processing block {block} failed for comet {comet}: {source}")]
    Block {
        comet: Address,
        block: u64,
        #[source]
        source: ChainError,
    },
}
