//! Block-by-block large borrow monitoring.
//!
//! [`CometMonitor::initialize`] runs the backfill and moves the state to live
//! mode. [`CometMonitor::on_block`] then updates every market's monitoring list
//! from the block's events, reports large absorptions, checks the large
//! positions for collateralization and returns a bounded batch of findings.
//!
//! Each market is processed concurrently on its own copy of its list. The
//! copies and the new findings are committed only if every market succeeded,
//! so a failed block can be retried without duplicate findings.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use comet_monitor_chain::{potential_borrowers, BlockInfo, BlockTag, CometEvent, CometSource};
use futures::future::try_join_all;
use tracing::{debug, info, instrument, warn};

use crate::backfill::backfill;
use crate::config::{CometMarket, MonitorSettings, ResolvedNetwork};
use crate::error::MonitorError;
use crate::finding::Finding;
use crate::monitoring_list::MonitoringList;
use crate::rate_limit::MinIntervalScheduler;
use crate::state::{AgentState, Phase};

/// Large borrow monitor for one network.
pub struct CometMonitor<S: ?Sized> {
    source: Arc<S>,
    chain_id: u64,
    comets: Vec<CometMarket>,
    settings: MonitorSettings,
    scheduler: MinIntervalScheduler,
}

/// Result of processing one market for one block.
struct MarketUpdate {
    comet: Address,
    list: MonitoringList,
    findings: Vec<Finding>,
}

impl<S: CometSource + ?Sized> CometMonitor<S> {
    pub fn new(source: Arc<S>, network: &ResolvedNetwork) -> Self {
        Self {
            source,
            chain_id: network.chain_id,
            comets: network.comets.clone(),
            settings: network.settings.clone(),
            scheduler: MinIntervalScheduler::new(network.settings.log_fetching_interval),
        }
    }

    /// Backfill every market and enter live mode.
    ///
    /// On failure the state is left untouched, so block handling stays a
    /// no-op until a later call succeeds.
    #[instrument(skip_all, fields(chain_id = self.chain_id))]
    pub async fn initialize(&self, state: &mut AgentState) -> Result<(), MonitorError> {
        let outcome = backfill(self.source.as_ref(), &self.comets, &self.settings, &self.scheduler).await?;

        for market in &self.comets {
            let tracked = outcome
                .lists
                .get(&market.address)
                .map_or(0, MonitoringList::len);
            info!(comet = %market.address, tracked = tracked, "Monitoring list ready");
        }

        state.go_live(outcome.lists, outcome.head);
        info!(initialization_block = outcome.head, "Initialization finished");
        Ok(())
    }

    /// First block whose events are read when handling block `block`.
    fn from_block(&self, state: &AgentState, initialization_block: u64, block: u64) -> u64 {
        let Some(last) = state.last_handled_block else {
            return initialization_block.saturating_add(1);
        };

        let next = last.saturating_add(1);
        if block <= next {
            return block;
        }

        let gap = block - next;
        if gap <= self.settings.gap_fill_max_blocks {
            debug!(from_block = next, to_block = block, gap = gap, "Catching up skipped blocks");
            next
        } else {
            warn!(
                skipped_from = next,
                skipped_to = block - 1,
                gap = gap,
                "Block gap detected, events in skipped blocks are not processed"
            );
            block
        }
    }

    /// Process one block and return at most `max_findings_per_block` findings.
    ///
    /// Returns no findings while uninitialized.
    #[instrument(skip_all, fields(block = block.number))]
    pub async fn on_block(
        &self,
        state: &mut AgentState,
        block: BlockInfo,
    ) -> Result<Vec<Finding>, MonitorError> {
        let Phase::Live {
            initialization_block,
        } = state.phase
        else {
            debug!("Not initialized, skipping block");
            return Ok(Vec::new());
        };

        let from = self.from_block(state, initialization_block, block.number);

        let updates = try_join_all(self.comets.iter().map(|market| {
            let list = state
                .monitoring_lists
                .get(&market.address)
                .cloned()
                .unwrap_or_else(|| MonitoringList::new(market.monitoring_list_length));
            self.process_market(market, list, from, block)
        }))
        .await?;

        for update in updates {
            state.monitoring_lists.insert(update.comet, update.list);
            state.finding_buffer.extend(update.findings);
        }
        state.last_handled_block = Some(block.number);

        let max = self.settings.max_findings_per_block;
        let pending = state.finding_buffer.len();
        if pending > max {
            warn!(
                pending = pending,
                max = max,
                "Finding buffer exceeds per-block limit, excess carried to next block"
            );
        }

        let findings = state.finding_buffer.drain(max);
        debug!(emitted = findings.len(), remaining = state.finding_buffer.len(), "Block processed");
        Ok(findings)
    }

    async fn process_market(
        &self,
        market: &CometMarket,
        mut list: MonitoringList,
        from: u64,
        block: BlockInfo,
    ) -> Result<MarketUpdate, MonitorError> {
        let comet = market.address;
        let mut findings = Vec::new();

        if block.number < market.deployment_block {
            return Ok(MarketUpdate {
                comet,
                list,
                findings,
            });
        }

        let err = |source| MonitorError::Block {
            comet,
            block: block.number,
            source,
        };
        let at = BlockTag::Number(block.number);

        let from = from.max(market.deployment_block);
        let events = if from <= block.number {
            self.source
                .fetch_events(comet, from, block.number)
                .await
                .map_err(err)?
        } else {
            Vec::new()
        };
        let rate = self.source.rate_snapshot(comet, at).await.map_err(err)?;

        for event in &events {
            if let CometEvent::AbsorbDebt {
                absorber,
                borrower,
                base_paid_out,
                ..
            } = event
            {
                if *base_paid_out >= market.large_threshold {
                    findings.push(Finding::absorption(
                        self.chain_id,
                        comet,
                        *absorber,
                        *borrower,
                        *base_paid_out,
                        block,
                    ));
                }
            }
        }

        let borrowers = potential_borrowers(&events);
        if !borrowers.is_empty() {
            let principals = self
                .source
                .principals(comet, &borrowers, at)
                .await
                .map_err(err)?;
            for (borrower, principal) in borrowers.iter().zip(principals) {
                list.upsert(*borrower, principal);
            }
            if list.is_saturated(market.large_threshold, &rate) {
                warn!(
                    comet = %comet,
                    capacity = list.capacity(),
                    threshold = %market.large_threshold,
                    "Monitoring list too short for threshold, large positions may be missed"
                );
            }
        }

        let interval = self.settings.alert_interval;
        let eligible: Vec<(Address, U256)> = list
            .iter()
            .filter(|p| p.alerted_at == 0 || block.timestamp.saturating_sub(p.alerted_at) >= interval)
            .map(|p| (p.borrower, p.present_value(&rate)))
            .filter(|(_, value)| *value >= market.large_threshold)
            .collect();

        if !eligible.is_empty() {
            let accounts: Vec<Address> = eligible.iter().map(|(borrower, _)| *borrower).collect();
            let statuses = self
                .source
                .collateralization(comet, &accounts, at)
                .await
                .map_err(err)?;

            for ((borrower, value), collateralized) in eligible.into_iter().zip(statuses) {
                if collateralized {
                    continue;
                }
                findings.push(Finding::liquidation_risk(self.chain_id, comet, borrower, value, block));
                list.mark_alerted(&borrower, block.timestamp);
            }
        }

        debug!(
            comet = %comet,
            from_block = from,
            events = events.len(),
            borrowers = borrowers.len(),
            findings = findings.len(),
            "Market processed"
        );

        Ok(MarketUpdate {
            comet,
            list,
            findings,
        })
    }
}
