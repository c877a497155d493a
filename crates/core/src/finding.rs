//! Alerts emitted by the monitor.

use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use comet_monitor_chain::BlockInfo;
use serde::Serialize;
use smallvec::{smallvec, SmallVec};

/// Finding severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Info,
    Medium,
}

/// Kind of finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    /// A large borrow was absorbed.
    Absorption,
    /// A large borrow is not collateralized and has not been absorbed yet.
    LiquidationRisk,
}

impl FindingKind {
    pub fn alert_id(&self) -> &'static str {
        match self {
            Self::Absorption => "COMP2-4-1",
            Self::LiquidationRisk => "COMP2-4-2",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Absorption => "Large borrow position absorption on Comet contract",
            Self::LiquidationRisk => "Large borrow position not collateralized on Comet contract",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Absorption => "A large borrow position was absorbed in a Comet contract",
            Self::LiquidationRisk => {
                "A large borrow position exceeded the borrowCollateralFactor and is at risk in a Comet contract"
            }
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Absorption => Severity::Medium,
            Self::LiquidationRisk => Severity::Info,
        }
    }
}

/// Chain name used in finding metadata.
pub fn chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        1 => "MAINNET",
        5 => "GOERLI",
        137 => "POLYGON",
        _ => "UNKNOWN",
    }
}

/// Immutable alert record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub alert_id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub protocol: &'static str,
    pub chain_id: u64,
    /// Comet market that emitted or holds the position.
    pub contract: Address,
    /// `[contract, absorber, borrower]` or `[contract, borrower]`.
    pub subject_addresses: SmallVec<[Address; 3]>,
    /// `basePaidOut` for absorptions, present-value borrow for risk findings.
    pub amount: U256,
    pub block_number: u64,
    pub timestamp: u64,
    pub metadata: BTreeMap<&'static str, String>,
}

impl Finding {
    fn new(
        kind: FindingKind,
        chain_id: u64,
        contract: Address,
        subject_addresses: SmallVec<[Address; 3]>,
        amount: U256,
        block: BlockInfo,
        metadata: BTreeMap<&'static str, String>,
    ) -> Self {
        Self {
            kind,
            alert_id: kind.alert_id(),
            name: kind.name(),
            description: kind.description(),
            severity: kind.severity(),
            protocol: "Compound",
            chain_id,
            contract,
            subject_addresses,
            amount,
            block_number: block.number,
            timestamp: block.timestamp,
            metadata,
        }
    }

    /// Large absorption observed in `block`.
    pub fn absorption(
        chain_id: u64,
        comet: Address,
        absorber: Address,
        borrower: Address,
        base_paid_out: U256,
        block: BlockInfo,
    ) -> Self {
        let metadata = BTreeMap::from([
            ("chain", chain_name(chain_id).to_string()),
            ("comet", comet.to_string()),
            ("absorber", absorber.to_string()),
            ("borrower", borrower.to_string()),
            ("basePaidOut", base_paid_out.to_string()),
        ]);
        Self::new(
            FindingKind::Absorption,
            chain_id,
            comet,
            smallvec![comet, absorber, borrower],
            base_paid_out,
            block,
            metadata,
        )
    }

    /// Uncollateralized large borrow observed in `block`.
    pub fn liquidation_risk(
        chain_id: u64,
        comet: Address,
        borrower: Address,
        position_size: U256,
        block: BlockInfo,
    ) -> Self {
        let metadata = BTreeMap::from([
            ("chain", chain_name(chain_id).to_string()),
            ("comet", comet.to_string()),
            ("borrower", borrower.to_string()),
            ("positionSize", position_size.to_string()),
        ]);
        Self::new(
            FindingKind::LiquidationRisk,
            chain_id,
            comet,
            smallvec![comet, borrower],
            position_size,
            block,
            metadata,
        )
    }
}
