//! Compound V3 (Comet) implementation of [`CometSource`].

use std::sync::Arc;

use alloy::primitives::{Address, I256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{BlockTag, CometSource, RateSnapshot};
use crate::batch::{BatchedReader, CallRequest};
use crate::contracts::{principal_event_signatures, IComet};
use crate::error::ChainError;
use crate::events::CometEvent;
use crate::provider::ProviderManager;

/// Comet reads over an RPC provider, grouped through Multicall3.
pub struct CometV3Protocol {
    provider: Arc<ProviderManager>,
    reader: BatchedReader<Arc<ProviderManager>>,
}

impl CometV3Protocol {
    /// `multicall_size` caps the number of sub-calls per `aggregate3`.
    pub fn new(provider: Arc<ProviderManager>, multicall_size: usize) -> Self {
        let reader = BatchedReader::new(Arc::clone(&provider), multicall_size);
        Self { provider, reader }
    }
}

/// Read a 32-byte signed word from the head of the return data.
///
/// `int104` is sign-extended to a full word by the ABI, so the first word is
/// already the two's complement I256 value.
fn leading_signed_word(target: Address, data: &[u8]) -> Result<I256, ChainError> {
    let word: [u8; 32] = data
        .get(..32)
        .and_then(|w| w.try_into().ok())
        .ok_or(ChainError::ShortReturnData {
            target,
            len: data.len(),
        })?;
    Ok(I256::from_be_bytes(word))
}

#[async_trait]
impl CometSource for CometV3Protocol {
    async fn head(&self) -> Result<u64, ChainError> {
        self.provider.block_number().await
    }

    #[instrument(skip(self), fields(comet = %comet))]
    async fn fetch_events(
        &self,
        comet: Address,
        from: u64,
        to: u64,
    ) -> Result<Vec<CometEvent>, ChainError> {
        let logs = self
            .provider
            .get_logs(comet, principal_event_signatures(), from, to)
            .await?;
        let events: Vec<CometEvent> = logs.iter().filter_map(CometEvent::from_log).collect();
        debug!(logs = logs.len(), events = events.len(), "Fetched Comet events");
        Ok(events)
    }

    async fn rate_snapshot(
        &self,
        comet: Address,
        block: BlockTag,
    ) -> Result<RateSnapshot, ChainError> {
        let calls = [
            CallRequest::new(comet, &IComet::totalsBasicCall {}),
            CallRequest::new(comet, &IComet::baseIndexScaleCall {}),
        ];
        let results = self.reader.read_all(&calls, block).await?;
        let [totals, scale] = results.as_slice() else {
            return Err(ChainError::ResultCountMismatch {
                expected: 2,
                got: results.len(),
            });
        };

        let totals = IComet::totalsBasicCall::abi_decode_returns(totals, true)?._0;
        let scale = IComet::baseIndexScaleCall::abi_decode_returns(scale, true)?._0;

        RateSnapshot::new(
            comet,
            U256::from(totals.baseBorrowIndex),
            U256::from(scale),
        )
    }

    async fn principals(
        &self,
        comet: Address,
        accounts: &[Address],
        block: BlockTag,
    ) -> Result<Vec<I256>, ChainError> {
        let calls: Vec<CallRequest> = accounts
            .iter()
            .map(|&account| CallRequest::new(comet, &IComet::userBasicCall { account }))
            .collect();
        self.reader
            .read_all(&calls, block)
            .await?
            .iter()
            .map(|data| leading_signed_word(comet, data))
            .collect()
    }

    async fn collateralization(
        &self,
        comet: Address,
        accounts: &[Address],
        block: BlockTag,
    ) -> Result<Vec<bool>, ChainError> {
        let calls: Vec<IComet::isBorrowCollateralizedCall> = accounts
            .iter()
            .map(|&account| IComet::isBorrowCollateralizedCall { account })
            .collect();
        let results = self.reader.read_calls(comet, &calls, block).await?;
        Ok(results.into_iter().map(|r| r._0).collect())
    }
}
