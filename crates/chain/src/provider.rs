//! RPC provider management.
//! Uses Alloy providers for type-safe RPC interactions.

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use alloy::sol_types::SolCall;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::batch::{CallOutcome, CallRequest, MulticallTransport};
use crate::contracts::{IMulticall3, MULTICALL3};
use crate::error::ChainError;
use crate::protocol::{BlockInfo, BlockTag};

/// Provider manager for one chain's RPC endpoint.
#[derive(Debug, Clone)]
pub struct ProviderManager {
    /// HTTP RPC URL
    rpc_url: String,
    /// Multicall3 deployment used for grouped reads
    multicall_address: Address,
}

impl ProviderManager {
    /// Create a provider manager and verify the endpoint answers.
    ///
    /// `multicall_address` defaults to the canonical Multicall3 deployment.
    pub async fn new(rpc_url: &str, multicall_address: Option<Address>) -> Result<Self, ChainError> {
        let manager = Self {
            rpc_url: rpc_url.to_string(),
            multicall_address: multicall_address.unwrap_or(MULTICALL3),
        };

        let block = manager.block_number().await?;
        info!(
            block = block,
            multicall = %manager.multicall_address,
            "Provider connection verified"
        );

        Ok(manager)
    }

    fn http(&self) -> Result<impl Provider, ChainError> {
        let url = Url::parse(&self.rpc_url).map_err(|e| ChainError::InvalidUrl {
            url: self.rpc_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(ProviderBuilder::new().on_http(url))
    }

    /// Get the multicall address.
    pub fn multicall_address(&self) -> Address {
        self.multicall_address
    }

    /// Get current block number.
    pub async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.http()?.get_block_number().await?)
    }

    /// Get chain ID.
    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.http()?.get_chain_id().await?)
    }

    /// Get number and timestamp of block `number`.
    pub async fn block_info(&self, number: u64) -> Result<BlockInfo, ChainError> {
        let block = self
            .http()?
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .await?
            .ok_or(ChainError::BlockNotFound(number))?;

        Ok(BlockInfo {
            number,
            timestamp: block.header.timestamp,
        })
    }

    /// Fetch logs emitted by `address` with any of `signatures` as topic0 in `[from, to]`.
    #[instrument(skip(self, signatures), fields(address = %address))]
    pub async fn get_logs(
        &self,
        address: Address,
        signatures: Vec<B256>,
        from: u64,
        to: u64,
    ) -> Result<Vec<Log>, ChainError> {
        let filter = Filter::new()
            .address(address)
            .event_signature(signatures)
            .from_block(from)
            .to_block(to);

        let logs = self.http()?.get_logs(&filter).await?;
        debug!(count = logs.len(), "Fetched logs");
        Ok(logs)
    }
}

#[async_trait]
impl MulticallTransport for ProviderManager {
    async fn aggregate(
        &self,
        calls: &[CallRequest],
        block: BlockTag,
    ) -> Result<Vec<CallOutcome>, ChainError> {
        let calls = calls
            .iter()
            .map(|call| IMulticall3::Call3 {
                target: call.target,
                allowFailure: true,
                callData: call.call_data.clone(),
            })
            .collect();
        let calldata = IMulticall3::aggregate3Call { calls }.abi_encode();

        let tx = TransactionRequest::default()
            .to(self.multicall_address)
            .input(calldata.into());

        let raw = self.http()?.call(tx).block(block.into()).await?;
        let decoded = IMulticall3::aggregate3Call::abi_decode_returns(&raw, true)?;

        Ok(decoded
            .returnData
            .into_iter()
            .map(|r| CallOutcome {
                success: r.success,
                return_data: r.returnData,
            })
            .collect())
    }
}
