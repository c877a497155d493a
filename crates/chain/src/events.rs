//! Decoded Comet events that change account principals.

use alloy::primitives::{Address, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::contracts::IComet;

/// Principal-changing event emitted by a Comet market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CometEvent {
    Supply {
        from: Address,
        dst: Address,
        amount: U256,
        block_number: u64,
    },
    Transfer {
        from: Address,
        to: Address,
        amount: U256,
        block_number: u64,
    },
    Withdraw {
        src: Address,
        to: Address,
        amount: U256,
        block_number: u64,
    },
    AbsorbDebt {
        absorber: Address,
        borrower: Address,
        base_paid_out: U256,
        usd_value: U256,
        block_number: u64,
    },
}

impl CometEvent {
    /// Get the event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Supply { .. } => "Supply",
            Self::Transfer { .. } => "Transfer",
            Self::Withdraw { .. } => "Withdraw",
            Self::AbsorbDebt { .. } => "AbsorbDebt",
        }
    }

    /// Get the block number.
    pub fn block_number(&self) -> u64 {
        match self {
            Self::Supply { block_number, .. }
            | Self::Transfer { block_number, .. }
            | Self::Withdraw { block_number, .. }
            | Self::AbsorbDebt { block_number, .. } => *block_number,
        }
    }

    /// Every party named by this event.
    ///
    /// The zero address (mint/burn leg of a base `Transfer`) is skipped.
    pub fn parties(&self) -> impl Iterator<Item = Address> {
        let parties = match self {
            Self::Supply { from, dst, .. } => [*dst, *from],
            Self::Transfer { from, to, .. } => [*from, *to],
            Self::Withdraw { src, to, .. } => [*src, *to],
            Self::AbsorbDebt {
                absorber, borrower, ..
            } => [*borrower, *absorber],
        };
        parties.into_iter().filter(|account| !account.is_zero())
    }

    /// Decode a raw log. Returns `None` for logs that are not principal events.
    pub fn from_log(log: &Log) -> Option<Self> {
        let block_number = log.block_number.unwrap_or(0);
        let topic0 = *log.topics().first()?;
        let data = log.data();

        let decoded = if topic0 == IComet::Supply::SIGNATURE_HASH {
            IComet::Supply::decode_log_data(data, true).map(|e| Self::Supply {
                from: e.from,
                dst: e.dst,
                amount: e.amount,
                block_number,
            })
        } else if topic0 == IComet::Transfer::SIGNATURE_HASH {
            IComet::Transfer::decode_log_data(data, true).map(|e| Self::Transfer {
                from: e.from,
                to: e.to,
                amount: e.amount,
                block_number,
            })
        } else if topic0 == IComet::Withdraw::SIGNATURE_HASH {
            IComet::Withdraw::decode_log_data(data, true).map(|e| Self::Withdraw {
                src: e.src,
                to: e.to,
                amount: e.amount,
                block_number,
            })
        } else if topic0 == IComet::AbsorbDebt::SIGNATURE_HASH {
            IComet::AbsorbDebt::decode_log_data(data, true).map(|e| Self::AbsorbDebt {
                absorber: e.absorber,
                borrower: e.borrower,
                base_paid_out: e.basePaidOut,
                usd_value: e.usdValue,
                block_number,
            })
        } else {
            debug!(topic = %topic0, address = %log.address(), "Skipping unknown log");
            return None;
        };

        match decoded {
            Ok(event) => Some(event),
            Err(e) => {
                debug!(topic = %topic0, error = %e, "Failed to decode Comet log");
                None
            }
        }
    }
}

/// Distinct accounts touched by `events`, in order of first appearance.
pub fn potential_borrowers(events: &[CometEvent]) -> Vec<Address> {
    let mut seen = HashSet::new();
    events
        .iter()
        .flat_map(CometEvent::parties)
        .filter(|account| seen.insert(*account))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc_log(address: Address, data: alloy::primitives::LogData, block: u64) -> Log {
        Log {
            inner: alloy::primitives::Log { address, data },
            block_number: Some(block),
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_withdraw() {
        let comet = Address::repeat_byte(0xC0);
        let event = IComet::Withdraw {
            src: Address::repeat_byte(1),
            to: Address::repeat_byte(2),
            amount: U256::from(500u64),
        };
        let log = rpc_log(comet, event.encode_log_data(), 42);

        let decoded = CometEvent::from_log(&log).unwrap();
        assert_eq!(
            decoded,
            CometEvent::Withdraw {
                src: Address::repeat_byte(1),
                to: Address::repeat_byte(2),
                amount: U256::from(500u64),
                block_number: 42,
            }
        );
        assert_eq!(decoded.name(), "Withdraw");
        assert_eq!(decoded.block_number(), 42);
    }

    #[test]
    fn test_decode_absorb_debt() {
        let event = IComet::AbsorbDebt {
            absorber: Address::repeat_byte(9),
            borrower: Address::repeat_byte(3),
            basePaidOut: U256::from(1_000u64),
            usdValue: U256::from(999u64),
        };
        let log = rpc_log(Address::repeat_byte(0xC0), event.encode_log_data(), 7);

        match CometEvent::from_log(&log) {
            Some(CometEvent::AbsorbDebt {
                absorber,
                borrower,
                base_paid_out,
                ..
            }) => {
                assert_eq!(absorber, Address::repeat_byte(9));
                assert_eq!(borrower, Address::repeat_byte(3));
                assert_eq!(base_paid_out, U256::from(1_000u64));
            }
            other => panic!("unexpected decode result: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_topic_is_skipped() {
        let data = alloy::primitives::LogData::new_unchecked(
            vec![alloy::primitives::B256::repeat_byte(0xAB)],
            Default::default(),
        );
        let log = rpc_log(Address::ZERO, data, 1);
        assert!(CometEvent::from_log(&log).is_none());
    }

    #[test]
    fn test_potential_borrowers() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let c = Address::repeat_byte(3);
        let absorber = Address::repeat_byte(9);

        let events = vec![
            CometEvent::Supply {
                from: absorber,
                dst: a,
                amount: U256::from(1u64),
                block_number: 1,
            },
            // Mint leg of a base supply
            CometEvent::Transfer {
                from: Address::ZERO,
                to: a,
                amount: U256::from(1u64),
                block_number: 1,
            },
            CometEvent::Withdraw {
                src: b,
                to: absorber,
                amount: U256::from(1u64),
                block_number: 2,
            },
            CometEvent::Transfer {
                from: b,
                to: c,
                amount: U256::from(1u64),
                block_number: 3,
            },
            CometEvent::AbsorbDebt {
                absorber,
                borrower: a,
                base_paid_out: U256::from(1u64),
                usd_value: U256::ZERO,
                block_number: 4,
            },
        ];

        // Every party counts once; the zero address never does
        assert_eq!(potential_borrowers(&events), vec![a, absorber, b, c]);
    }

    #[test]
    fn test_potential_borrowers_include_counterparties() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let x = Address::repeat_byte(7);
        let absorber = Address::repeat_byte(9);

        let events = vec![
            CometEvent::Supply {
                from: x,
                dst: a,
                amount: U256::from(1u64),
                block_number: 1,
            },
            CometEvent::Withdraw {
                src: a,
                to: b,
                amount: U256::from(1u64),
                block_number: 1,
            },
            CometEvent::AbsorbDebt {
                absorber,
                borrower: b,
                base_paid_out: U256::from(1u64),
                usd_value: U256::ZERO,
                block_number: 2,
            },
        ];

        assert_eq!(potential_borrowers(&events), vec![a, x, b, absorber]);
    }
}
