//! Error types for chain reads.

use alloy::primitives::Address;
use alloy::transports::TransportError;
use thiserror::Error;

/// Errors raised while talking to the chain.
///
/// Every variant is surfaced to the caller. Nothing here is retried or
/// silently converted into a default value.
#[derive(Debug, Error)]
pub enum ChainError {
    /// RPC transport or node error.
    #[error("rpc request failed: {0}")]
    Rpc(#[from] TransportError),

    /// ABI decoding of a call result failed.
    #[error("abi decode failed: {0}")]
    Decode(#[from] alloy::sol_types::Error),

    /// A sub-call inside a grouped read reverted.
    #[error("call {index} to {target} failed inside multicall (calldata 0x{calldata})")]
    CallFailed {
        index: usize,
        target: Address,
        calldata: String,
    },

    /// The multicall returned a different number of results than calls sent.
    #[error("multicall returned {got} results for {expected} calls")]
    ResultCountMismatch { expected: usize, got: usize },

    /// A call returned fewer bytes than its ABI requires.
    #[error("short return data from {target}: {len} bytes")]
    ShortReturnData { target: Address, len: usize },

    /// The contract reported an index scale of zero.
    #[error("invalid rate snapshot for {comet}: base index scale is zero")]
    ZeroIndexScale { comet: Address },

    /// Block not found on the node.
    #[error("block {0} not found")]
    BlockNotFound(u64),

    /// RPC URL could not be parsed.
    #[error("invalid rpc url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}
