//! Protocol abstraction for Comet market reads.
//!
//! The monitor only talks to a market through [`CometSource`]. The production
//! implementation is [`CometV3Protocol`], which goes through an RPC provider
//! and Multicall3; tests substitute an in-memory market.
//!
//! # Example
//!
//! ```rust,ignore
//! use comet_monitor_chain::protocol::{BlockTag, CometSource};
//!
//! let rate = source.rate_snapshot(comet, BlockTag::Number(head)).await?;
//! let principals = source.principals(comet, &accounts, BlockTag::Number(head)).await?;
//! ```

mod comet_v3;

pub use comet_v3::CometV3Protocol;

use alloy::eips::{BlockId, BlockNumberOrTag};
use alloy::primitives::{Address, I256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChainError;
use crate::events::CometEvent;

/// Block at which a read is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockTag {
    Latest,
    Number(u64),
}

impl From<BlockTag> for BlockId {
    fn from(tag: BlockTag) -> Self {
        match tag {
            BlockTag::Latest => BlockId::Number(BlockNumberOrTag::Latest),
            BlockTag::Number(n) => BlockId::Number(BlockNumberOrTag::Number(n)),
        }
    }
}

/// Borrow index and its scale, read together at one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub base_borrow_index: U256,
    pub base_index_scale: U256,
}

impl RateSnapshot {
    /// Rejects a zero scale, which would make every present value undefined.
    pub fn new(
        comet: Address,
        base_borrow_index: U256,
        base_index_scale: U256,
    ) -> Result<Self, ChainError> {
        if base_index_scale.is_zero() {
            return Err(ChainError::ZeroIndexScale { comet });
        }
        Ok(Self {
            base_borrow_index,
            base_index_scale,
        })
    }
}

/// Block number and timestamp (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: u64,
}

/// Read access to Comet markets on one chain.
///
/// Every grouped read is all-or-nothing: if any account's sub-call fails the
/// whole call returns an error. Results are in the same order as `accounts`.
#[async_trait]
pub trait CometSource: Send + Sync {
    /// Latest block number.
    async fn head(&self) -> Result<u64, ChainError>;

    /// Principal-changing events emitted by `comet` in `[from, to]`, in log order.
    async fn fetch_events(
        &self,
        comet: Address,
        from: u64,
        to: u64,
    ) -> Result<Vec<CometEvent>, ChainError>;

    /// Borrow index and index scale at `block`.
    async fn rate_snapshot(&self, comet: Address, block: BlockTag)
        -> Result<RateSnapshot, ChainError>;

    /// Signed principal of each account at `block`.
    async fn principals(
        &self,
        comet: Address,
        accounts: &[Address],
        block: BlockTag,
    ) -> Result<Vec<I256>, ChainError>;

    /// `isBorrowCollateralized` for each account at `block`.
    async fn collateralization(
        &self,
        comet: Address,
        accounts: &[Address],
        block: BlockTag,
    ) -> Result<Vec<bool>, ChainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_tag_to_block_id() {
        assert_eq!(
            BlockId::from(BlockTag::Number(17)),
            BlockId::Number(BlockNumberOrTag::Number(17))
        );
        assert_eq!(
            BlockId::from(BlockTag::Latest),
            BlockId::Number(BlockNumberOrTag::Latest)
        );
    }

    #[test]
    fn test_rate_snapshot_rejects_zero_scale() {
        let comet = Address::repeat_byte(0xC0);
        assert!(matches!(
            RateSnapshot::new(comet, U256::from(10u64), U256::ZERO),
            Err(ChainError::ZeroIndexScale { comet: c }) if c == comet
        ));
        let rate = RateSnapshot::new(comet, U256::from(10u64), U256::from(2u64)).unwrap();
        assert_eq!(rate.base_index_scale, U256::from(2u64));
    }
}
