//! State carried between `initialize` and successive `on_block` calls.

use std::collections::HashMap;

use alloy::primitives::Address;

use crate::finding_buffer::FindingBuffer;
use crate::monitoring_list::MonitoringList;

/// Engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Backfill has not completed. Block handling is a no-op.
    #[default]
    Backfilling,
    /// Backfill completed at `initialization_block`.
    Live { initialization_block: u64 },
}

/// Mutable engine state. Owned by the host and passed to every invocation.
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub(crate) phase: Phase,
    pub(crate) monitoring_lists: HashMap<Address, MonitoringList>,
    pub(crate) last_handled_block: Option<u64>,
    pub(crate) finding_buffer: FindingBuffer,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.phase, Phase::Live { .. })
    }

    pub fn initialization_block(&self) -> Option<u64> {
        match self.phase {
            Phase::Live {
                initialization_block,
            } => Some(initialization_block),
            Phase::Backfilling => None,
        }
    }

    pub fn last_handled_block(&self) -> Option<u64> {
        self.last_handled_block
    }

    pub fn monitoring_list(&self, comet: &Address) -> Option<&MonitoringList> {
        self.monitoring_lists.get(comet)
    }

    pub fn finding_buffer(&self) -> &FindingBuffer {
        &self.finding_buffer
    }

    /// Install backfilled lists and enter live mode.
    pub(crate) fn go_live(&mut self, lists: HashMap<Address, MonitoringList>, initialization_block: u64) {
        self.monitoring_lists = lists;
        self.last_handled_block = None;
        self.phase = Phase::Live {
            initialization_block,
        };
    }
}
