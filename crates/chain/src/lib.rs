//! Comet monitor chain interaction layer.
//!
//! This crate provides:
//! - Contract bindings for Comet markets and Multicall3
//! - Decoding of principal-changing Comet events
//! - Grouped contract reads with all-or-nothing semantics
//! - The [`CometSource`] seam and its RPC-backed implementation

mod batch;
mod contracts;
mod error;
mod events;
pub mod protocol;
mod provider;

pub use batch::{BatchedReader, CallOutcome, CallRequest, MulticallTransport};
pub use contracts::{principal_event_signatures, IComet, IMulticall3, TotalsBasic, MULTICALL3};
pub use error::ChainError;
pub use events::{potential_borrowers, CometEvent};
pub use protocol::{BlockInfo, BlockTag, CometSource, CometV3Protocol, RateSnapshot};
pub use provider::ProviderManager;
