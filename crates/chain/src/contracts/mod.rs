//! Contract bindings for the Comet market and Multicall3.
//!
//! ```rust,ignore
//! use comet_monitor_chain::{principal_event_signatures, IComet};
//!
//! let filter = Filter::new()
//!     .address(comet)
//!     .event_signature(principal_event_signatures());
//! ```

pub mod comet;
pub mod multicall;

pub use comet::{principal_event_signatures, IComet, TotalsBasic};
pub use multicall::{IMulticall3, MULTICALL3};
