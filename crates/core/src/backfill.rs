//! Historical scan that seeds the monitoring lists before live processing.
//!
//! Windows of `log_fetching_block_range` blocks are walked from the earliest
//! deployment block to the head observed at start. Each window's log fetch is
//! spaced by the rate limiter; principals are read at the window's end block.

use std::collections::HashMap;

use alloy::primitives::Address;
use comet_monitor_chain::{potential_borrowers, BlockTag, CometSource, RateSnapshot};
use futures::future::try_join_all;
use tracing::{debug, info, instrument, warn};

use crate::config::{CometMarket, MonitorSettings};
use crate::error::MonitorError;
use crate::monitoring_list::MonitoringList;
use crate::rate_limit::MinIntervalScheduler;

/// Result of a completed backfill.
#[derive(Debug)]
pub struct BackfillOutcome {
    pub lists: HashMap<Address, MonitoringList>,
    /// Head block the scan ran up to.
    pub head: u64,
}

/// Build fresh monitoring lists for `comets` from their full event history.
///
/// Any failure aborts the scan and nothing built so far is returned.
#[instrument(skip_all, fields(comets = comets.len()))]
pub async fn backfill<S>(
    source: &S,
    comets: &[CometMarket],
    settings: &MonitorSettings,
    scheduler: &MinIntervalScheduler,
) -> Result<BackfillOutcome, MonitorError>
where
    S: CometSource + ?Sized,
{
    let rates: Vec<RateSnapshot> = try_join_all(comets.iter().map(|market| async move {
        source
            .rate_snapshot(market.address, BlockTag::Latest)
            .await
            .map_err(|source| MonitorError::Snapshot {
                comet: market.address,
                source,
            })
    }))
    .await?;

    let head = source.head().await.map_err(MonitorError::Head)?;

    let mut lists: HashMap<Address, MonitoringList> = comets
        .iter()
        .map(|market| (market.address, MonitoringList::new(market.monitoring_list_length)))
        .collect();

    let Some(mut cursor) = comets.iter().map(|m| m.deployment_block).min() else {
        return Ok(BackfillOutcome { lists, head });
    };

    let range = settings.log_fetching_block_range.max(1);
    info!(from_block = cursor, to_block = head, range = range, "Starting backfill");

    while cursor <= head {
        let to = cursor.saturating_add(range - 1).min(head);

        let deployed: Vec<(&CometMarket, &RateSnapshot)> = comets
            .iter()
            .zip(&rates)
            .filter(|(market, _)| market.deployment_block <= to)
            .collect();

        let fetches = deployed.iter().map(|(market, _)| {
            let from = cursor.max(market.deployment_block);
            async move {
                source
                    .fetch_events(market.address, from, to)
                    .await
                    .map_err(|source| MonitorError::Backfill {
                        comet: market.address,
                        from,
                        to,
                        source,
                    })
            }
        });
        let events = scheduler.schedule(try_join_all(fetches)).await?;

        let reads = deployed.iter().zip(&events).map(|((market, _), events)| {
            let borrowers = potential_borrowers(events);
            async move {
                if borrowers.is_empty() {
                    return Ok::<_, MonitorError>((borrowers, Vec::new()));
                }
                let principals = source
                    .principals(market.address, &borrowers, BlockTag::Number(to))
                    .await
                    .map_err(|source| MonitorError::Backfill {
                        comet: market.address,
                        from: cursor,
                        to,
                        source,
                    })?;
                Ok((borrowers, principals))
            }
        });
        let reads = try_join_all(reads).await?;

        for ((market, rate), (borrowers, principals)) in deployed.iter().zip(reads) {
            let Some(list) = lists.get_mut(&market.address) else {
                continue;
            };
            for (borrower, principal) in borrowers.iter().zip(principals) {
                list.upsert(*borrower, principal);
            }
            if !borrowers.is_empty() && list.is_saturated(market.large_threshold, rate) {
                warn!(
                    comet = %market.address,
                    capacity = list.capacity(),
                    threshold = %market.large_threshold,
                    "Monitoring list too short for threshold, large positions may be missed"
                );
            }
            debug!(
                comet = %market.address,
                from_block = cursor,
                to_block = to,
                borrowers = borrowers.len(),
                tracked = list.len(),
                "Window merged"
            );
        }

        info!(from_block = cursor, to_block = to, comets = deployed.len(), "Scanned window");

        match to.checked_add(1) {
            Some(next) => cursor = next,
            None => break,
        }
    }

    info!(head = head, "Backfill finished");
    Ok(BackfillOutcome { lists, head })
}
