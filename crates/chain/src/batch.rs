//! Grouped contract reads.
//!
//! A logical read of N calls is split into chunks of `batch_size`, each chunk
//! goes out as one `aggregate3`, and results come back in request order. A
//! single failed sub-call fails the whole read.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{debug, instrument};

use crate::error::ChainError;
use crate::protocol::BlockTag;

/// One call inside a grouped read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub target: Address,
    pub call_data: Bytes,
}

impl CallRequest {
    /// Encode a typed call against `target`.
    pub fn new<C: SolCall>(target: Address, call: &C) -> Self {
        Self {
            target,
            call_data: call.abi_encode().into(),
        }
    }
}

/// Raw outcome of one sub-call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub success: bool,
    pub return_data: Bytes,
}

/// Executes one chunk of calls in a single round trip.
#[async_trait]
pub trait MulticallTransport: Send + Sync {
    async fn aggregate(
        &self,
        calls: &[CallRequest],
        block: BlockTag,
    ) -> Result<Vec<CallOutcome>, ChainError>;
}

#[async_trait]
impl<T: MulticallTransport + ?Sized> MulticallTransport for Arc<T> {
    async fn aggregate(
        &self,
        calls: &[CallRequest],
        block: BlockTag,
    ) -> Result<Vec<CallOutcome>, ChainError> {
        (**self).aggregate(calls, block).await
    }
}

/// Splits reads into fixed-size multicall batches.
pub struct BatchedReader<T> {
    transport: T,
    batch_size: usize,
}

impl<T: MulticallTransport> BatchedReader<T> {
    /// `batch_size` of zero is treated as one.
    pub fn new(transport: T, batch_size: usize) -> Self {
        Self {
            transport,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Execute every call and return the raw return data in request order.
    #[instrument(skip(self, calls), fields(calls = calls.len(), batch_size = self.batch_size))]
    pub async fn read_all(
        &self,
        calls: &[CallRequest],
        block: BlockTag,
    ) -> Result<Vec<Bytes>, ChainError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = calls.chunks(self.batch_size).enumerate().map(|(n, chunk)| {
            let offset = n * self.batch_size;
            async move {
                let outcomes = self.transport.aggregate(chunk, block).await?;
                if outcomes.len() != chunk.len() {
                    return Err(ChainError::ResultCountMismatch {
                        expected: chunk.len(),
                        got: outcomes.len(),
                    });
                }
                outcomes
                    .into_iter()
                    .zip(chunk)
                    .enumerate()
                    .map(|(i, (outcome, request))| {
                        if outcome.success {
                            Ok(outcome.return_data)
                        } else {
                            Err(ChainError::CallFailed {
                                index: offset + i,
                                target: request.target,
                                calldata: hex::encode(&request.call_data),
                            })
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()
            }
        });

        let results: Vec<Bytes> = try_join_all(chunks).await?.into_iter().flatten().collect();
        debug!(results = results.len(), "Grouped read complete");
        Ok(results)
    }

    /// Execute typed calls against one target and decode each return value.
    pub async fn read_calls<C: SolCall>(
        &self,
        target: Address,
        calls: &[C],
        block: BlockTag,
    ) -> Result<Vec<C::Return>, ChainError> {
        let requests: Vec<CallRequest> = calls.iter().map(|c| CallRequest::new(target, c)).collect();
        self.read_all(&requests, block)
            .await?
            .iter()
            .map(|data| C::abi_decode_returns(data, true).map_err(ChainError::from))
            .collect()
    }
}
