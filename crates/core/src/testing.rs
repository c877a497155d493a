//! In-memory Comet markets for engine tests.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::Arc;

use alloy::primitives::{Address, I256, U256};
use async_trait::async_trait;
use comet_monitor_chain::{BlockTag, ChainError, CometEvent, CometSource, RateSnapshot};
use parking_lot::Mutex;
use tracing::subscriber::DefaultGuard;

use crate::config::CometMarket;

pub(crate) fn market(
    address: Address,
    deployment_block: u64,
    threshold: u64,
    monitoring_list_length: usize,
) -> CometMarket {
    CometMarket {
        address,
        deployment_block,
        large_threshold: U256::from(threshold),
        monitoring_list_length,
    }
}

/// Warnings emitted on the current thread while the guard is alive.
#[derive(Clone, Default)]
pub(crate) struct CapturedWarnings(Arc<Mutex<Vec<u8>>>);

impl CapturedWarnings {
    pub fn install() -> (Self, DefaultGuard) {
        let captured = Self::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        (captured, tracing::subscriber::set_default(subscriber))
    }

    pub fn contains(&self, message: &str) -> bool {
        String::from_utf8_lossy(&self.0.lock()).contains(message)
    }
}

impl io::Write for CapturedWarnings {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn signed(v: i64) -> I256 {
    I256::try_from(v).unwrap_or_default()
}

fn injected(target: Address) -> ChainError {
    ChainError::CallFailed {
        index: 0,
        target,
        calldata: "00".to_string(),
    }
}

#[derive(Default)]
struct FakeState {
    head: u64,
    events: HashMap<Address, Vec<CometEvent>>,
    /// (comet, account) -> principal after each block that changed it
    principals: HashMap<(Address, Address), BTreeMap<u64, I256>>,
    uncollateralized: HashMap<Address, Vec<Address>>,
    rates: HashMap<Address, RateSnapshot>,
    fail_logs: bool,
    fail_collateralization: bool,
    log_queries: Vec<(Address, u64, u64)>,
    principal_queries: Vec<(Address, Vec<Address>, BlockTag)>,
    collateral_queries: Vec<(Address, Vec<Address>, BlockTag)>,
}

impl FakeState {
    fn principal_at(&self, comet: Address, account: Address, block: BlockTag) -> I256 {
        let Some(history) = self.principals.get(&(comet, account)) else {
            return I256::ZERO;
        };
        let entry = match block {
            BlockTag::Latest => history.iter().next_back(),
            BlockTag::Number(n) => history.range(..=n).next_back(),
        };
        entry.map(|(_, v)| *v).unwrap_or_default()
    }

    fn adjust(&mut self, comet: Address, account: Address, delta: I256, block: u64) {
        let current = self.principal_at(comet, account, BlockTag::Latest);
        self.principals
            .entry((comet, account))
            .or_default()
            .insert(block, current + delta);
    }
}

/// Fake chain holding any number of Comet markets.
///
/// Principals follow the emitted events; every account is collateralized
/// unless marked otherwise; rates default to index = scale = 1.
pub(crate) struct FakeChain {
    state: Mutex<FakeState>,
}

impl FakeChain {
    pub fn new(head: u64) -> Self {
        Self {
            state: Mutex::new(FakeState {
                head,
                ..FakeState::default()
            }),
        }
    }

    pub fn set_head(&self, head: u64) {
        self.state.lock().head = head;
    }

    pub fn withdraw(&self, comet: Address, account: Address, amount: i64, block: u64) {
        let mut state = self.state.lock();
        state.events.entry(comet).or_default().push(CometEvent::Withdraw {
            src: account,
            to: account,
            amount: U256::from(amount.unsigned_abs()),
            block_number: block,
        });
        state.adjust(comet, account, signed(-amount), block);
    }

    pub fn supply(&self, comet: Address, account: Address, amount: i64, block: u64) {
        let mut state = self.state.lock();
        state.events.entry(comet).or_default().push(CometEvent::Supply {
            from: account,
            dst: account,
            amount: U256::from(amount.unsigned_abs()),
            block_number: block,
        });
        state.adjust(comet, account, signed(amount), block);
    }

    pub fn transfer(&self, comet: Address, from: Address, to: Address, amount: i64, block: u64) {
        let mut state = self.state.lock();
        state.events.entry(comet).or_default().push(CometEvent::Transfer {
            from,
            to,
            amount: U256::from(amount.unsigned_abs()),
            block_number: block,
        });
        state.adjust(comet, from, signed(-amount), block);
        state.adjust(comet, to, signed(amount), block);
    }

    /// Absorb `borrower`, zeroing its principal.
    pub fn absorb(&self, comet: Address, absorber: Address, borrower: Address, base_paid_out: u64, block: u64) {
        let mut state = self.state.lock();
        state.events.entry(comet).or_default().push(CometEvent::AbsorbDebt {
            absorber,
            borrower,
            base_paid_out: U256::from(base_paid_out),
            usd_value: U256::ZERO,
            block_number: block,
        });
        let current = state.principal_at(comet, borrower, BlockTag::Latest);
        state.adjust(comet, borrower, -current, block);
    }

    pub fn set_collateralized(&self, comet: Address, account: Address, collateralized: bool) {
        let mut state = self.state.lock();
        let list = state.uncollateralized.entry(comet).or_default();
        list.retain(|a| *a != account);
        if !collateralized {
            list.push(account);
        }
    }

    pub fn set_rate(&self, comet: Address, index: u64, scale: u64) {
        if let Ok(rate) = RateSnapshot::new(comet, U256::from(index), U256::from(scale)) {
            self.state.lock().rates.insert(comet, rate);
        }
    }

    pub fn fail_logs(&self, fail: bool) {
        self.state.lock().fail_logs = fail;
    }

    pub fn fail_collateralization(&self, fail: bool) {
        self.state.lock().fail_collateralization = fail;
    }

    pub fn log_queries(&self) -> Vec<(Address, u64, u64)> {
        self.state.lock().log_queries.clone()
    }

    pub fn principal_queries(&self) -> Vec<(Address, Vec<Address>, BlockTag)> {
        self.state.lock().principal_queries.clone()
    }

    pub fn collateral_queries(&self) -> Vec<(Address, Vec<Address>, BlockTag)> {
        self.state.lock().collateral_queries.clone()
    }
}

#[async_trait]
impl CometSource for FakeChain {
    async fn head(&self) -> Result<u64, ChainError> {
        Ok(self.state.lock().head)
    }

    async fn fetch_events(
        &self,
        comet: Address,
        from: u64,
        to: u64,
    ) -> Result<Vec<CometEvent>, ChainError> {
        let mut state = self.state.lock();
        state.log_queries.push((comet, from, to));
        if state.fail_logs {
            return Err(injected(comet));
        }
        Ok(state
            .events
            .get(&comet)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| (from..=to).contains(&e.block_number()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn rate_snapshot(
        &self,
        comet: Address,
        _block: BlockTag,
    ) -> Result<RateSnapshot, ChainError> {
        let state = self.state.lock();
        match state.rates.get(&comet) {
            Some(rate) => Ok(*rate),
            None => RateSnapshot::new(comet, U256::from(1u64), U256::from(1u64)),
        }
    }

    async fn principals(
        &self,
        comet: Address,
        accounts: &[Address],
        block: BlockTag,
    ) -> Result<Vec<I256>, ChainError> {
        let mut state = self.state.lock();
        state.principal_queries.push((comet, accounts.to_vec(), block));
        Ok(accounts
            .iter()
            .map(|account| state.principal_at(comet, *account, block))
            .collect())
    }

    async fn collateralization(
        &self,
        comet: Address,
        accounts: &[Address],
        block: BlockTag,
    ) -> Result<Vec<bool>, ChainError> {
        let mut state = self.state.lock();
        state.collateral_queries.push((comet, accounts.to_vec(), block));
        if state.fail_collateralization {
            return Err(injected(comet));
        }
        let uncollateralized = state.uncollateralized.get(&comet);
        Ok(accounts
            .iter()
            .map(|account| !uncollateralized.is_some_and(|list| list.contains(account)))
            .collect())
    }
}
