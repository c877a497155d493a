//! Bounded, sorted list of the largest borrow positions on one Comet market.
//!
//! Positions live in a map keyed by borrower, with a `BTreeSet` index ordered
//! by descending borrow magnitude and then by insertion sequence. Upserts touch
//! one index entry, so the list is never re-sorted wholesale.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use alloy::primitives::{Address, I256, U256};
use comet_monitor_chain::RateSnapshot;
use serde::{Deserialize, Serialize};

use crate::rate::borrow_present_value;

/// A tracked borrower and its signed principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowPosition {
    pub borrower: Address,
    /// Negative means outstanding debt.
    pub principal: I256,
    /// Timestamp of the last liquidation-risk alert, 0 if never alerted.
    pub alerted_at: u64,
}

impl BorrowPosition {
    pub fn new(borrower: Address, principal: I256) -> Self {
        Self {
            borrower,
            principal,
            alerted_at: 0,
        }
    }

    /// Absolute principal when borrowing, zero otherwise.
    #[inline]
    pub fn borrow_magnitude(&self) -> U256 {
        if self.principal.is_negative() {
            self.principal.unsigned_abs()
        } else {
            U256::ZERO
        }
    }

    /// Borrow present value at `rate`.
    #[inline]
    pub fn present_value(&self, rate: &RateSnapshot) -> U256 {
        borrow_present_value(self.principal, rate)
    }
}

/// What an upsert did to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Existing entry's principal replaced.
    Updated,
    /// New entry inserted below capacity.
    Inserted,
    /// New entry inserted by evicting the smallest one.
    Replaced { evicted: Address },
    /// List full and the new entry was not larger than the smallest.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    magnitude: Reverse<U256>,
    seq: u64,
    borrower: Address,
}

#[derive(Debug, Clone)]
struct Slot {
    position: BorrowPosition,
    seq: u64,
}

impl Slot {
    fn key(&self) -> SortKey {
        SortKey {
            magnitude: Reverse(self.position.borrow_magnitude()),
            seq: self.seq,
            borrower: self.position.borrower,
        }
    }
}

/// Per-market monitoring list with capacity-bounded insertion.
#[derive(Debug, Clone)]
pub struct MonitoringList {
    capacity: usize,
    slots: HashMap<Address, Slot>,
    order: BTreeSet<SortKey>,
    next_seq: u64,
}

impl MonitoringList {
    /// Create an empty list holding at most `capacity` positions.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: HashMap::with_capacity(capacity.min(4096)),
            order: BTreeSet::new(),
            next_seq: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    pub fn get(&self, borrower: &Address) -> Option<&BorrowPosition> {
        self.slots.get(borrower).map(|slot| &slot.position)
    }

    /// Insert or update `borrower`.
    ///
    /// An existing entry keeps its `alerted_at` and its tie-break position.
    pub fn upsert(&mut self, borrower: Address, principal: I256) -> UpsertOutcome {
        if let Some(slot) = self.slots.get_mut(&borrower) {
            self.order.remove(&slot.key());
            slot.position.principal = principal;
            self.order.insert(slot.key());
            return UpsertOutcome::Updated;
        }

        let position = BorrowPosition::new(borrower, principal);
        if !self.is_full() {
            self.insert_new(position);
            return UpsertOutcome::Inserted;
        }

        let Some(smallest) = self.order.last().copied() else {
            // Zero capacity
            return UpsertOutcome::Discarded;
        };
        if position.borrow_magnitude() <= smallest.magnitude.0 {
            return UpsertOutcome::Discarded;
        }

        self.order.remove(&smallest);
        self.slots.remove(&smallest.borrower);
        self.insert_new(position);
        UpsertOutcome::Replaced {
            evicted: smallest.borrower,
        }
    }

    fn insert_new(&mut self, position: BorrowPosition) {
        let slot = Slot {
            position,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.order.insert(slot.key());
        self.slots.insert(position.borrower, slot);
    }

    /// Record an alert for `borrower`. No-op if absent.
    pub fn mark_alerted(&mut self, borrower: &Address, timestamp: u64) {
        if let Some(slot) = self.slots.get_mut(borrower) {
            slot.position.alerted_at = timestamp;
        }
    }

    /// Positions in descending borrow-magnitude order.
    pub fn iter(&self) -> impl Iterator<Item = &BorrowPosition> + '_ {
        self.order
            .iter()
            .filter_map(|key| self.slots.get(&key.borrower).map(|slot| &slot.position))
    }

    /// Smallest-magnitude entry (the next eviction candidate).
    pub fn smallest(&self) -> Option<&BorrowPosition> {
        self.order
            .last()
            .and_then(|key| self.slots.get(&key.borrower))
            .map(|slot| &slot.position)
    }

    /// True when the list is full and even its smallest entry is at or above
    /// `threshold`, so large positions may exist beyond the cutoff.
    pub fn is_saturated(&self, threshold: U256, rate: &RateSnapshot) -> bool {
        self.is_full()
            && self
                .smallest()
                .is_some_and(|p| p.present_value(rate) >= threshold)
    }
}
