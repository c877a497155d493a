//! FIFO of findings waiting to be emitted.

use std::collections::VecDeque;

use crate::finding::Finding;

/// Findings carried across block invocations. Nothing is ever dropped.
#[derive(Debug, Clone, Default)]
pub struct FindingBuffer {
    pending: VecDeque<Finding>,
}

impl FindingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Append findings at the back, keeping their order.
    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.pending.extend(findings);
    }

    /// Remove and return up to `max` findings from the front.
    pub fn drain(&mut self, max: usize) -> Vec<Finding> {
        let n = max.min(self.pending.len());
        self.pending.drain(..n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};
    use comet_monitor_chain::BlockInfo;

    fn finding(n: u64) -> Finding {
        Finding::liquidation_risk(
            1,
            Address::ZERO,
            Address::repeat_byte(1),
            U256::from(n),
            BlockInfo {
                number: n,
                timestamp: n,
            },
        )
    }

    #[test]
    fn test_drain_is_fifo_and_bounded() {
        let mut buffer = FindingBuffer::new();
        buffer.extend((0..12).map(finding));

        let first = buffer.drain(10);
        assert_eq!(first.len(), 10);
        assert_eq!(first[0].amount, U256::from(0u64));
        assert_eq!(buffer.len(), 2);

        buffer.extend([finding(99)]);
        let second = buffer.drain(10);
        let amounts: Vec<U256> = second.iter().map(|f| f.amount).collect();
        assert_eq!(amounts, vec![U256::from(10u64), U256::from(11u64), U256::from(99u64)]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_zero() {
        let mut buffer = FindingBuffer::new();
        buffer.extend([finding(1)]);
        assert!(buffer.drain(0).is_empty());
        assert_eq!(buffer.len(), 1);
    }
}
