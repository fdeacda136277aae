// 8.0.2: result types and errors for engine operations.

use crate::config::ConfigError;
use crate::hawkes::ArrivalSample;
use crate::protocol::{ProtocolError, ProvisionError, Reserves};
use crate::record::{RecordError, StepRecord};
use crate::registry::RegistryError;
use crate::types::{ParticipantId, Price, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What the arbitrageur did this step.
#[derive(Debug, Clone, PartialEq)]
pub enum ArbitrageOutcome {
    /// Pool and reference within the threshold.
    Idle,
    Executed { side: Side, base_amount: Decimal },
    Rejected { side: Side, reason: ProtocolError },
}

/// What the event-arrival branch did this step.
#[derive(Debug, Clone, PartialEq)]
pub enum SpawnOutcome {
    NotTriggered,
    Opened {
        participant: ParticipantId,
        side: Side,
        original_base_amount: Decimal,
    },
    Rejected {
        participant: ParticipantId,
        side: Side,
        reason: ProtocolError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationResult {
    pub participant: ParticipantId,
    pub side: Side,
    pub entry_price: Price,
    pub base_reserve_before: Decimal,
    pub base_reserve_after: Decimal,
    pub pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanResult {
    pub liquidated: Option<LiquidationResult>,
    pub anomalies: Vec<ParticipantId>,
}

/// Everything one step did, including the record it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub step: u64,
    pub arrival: ArrivalSample,
    pub arbitrage: ArbitrageOutcome,
    pub spawn: SpawnOutcome,
    pub scan: ScanResult,
    pub record: StepRecord,
}

/// Totals for a finished (or interrupted) run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub steps: u64,
    pub random_longs: u64,
    pub random_shorts: u64,
    pub trade_rejections: u64,
    pub arbitrage_trades: u64,
    pub arbitrage_rejections: u64,
    pub liquidations: u64,
    pub anomalies: u64,
    pub total_pnl: Decimal,
    pub open_positions: usize,
    pub final_price: f64,
    pub draws: u64,
}

impl RunSummary {
    pub fn random_trades(&self) -> u64 {
        self.random_longs + self.random_shorts
    }

    /// Folds one step into the running totals.
    pub(super) fn absorb(&mut self, outcome: &StepOutcome) {
        self.steps = outcome.step;
        match &outcome.arbitrage {
            ArbitrageOutcome::Idle => {}
            ArbitrageOutcome::Executed { .. } => self.arbitrage_trades += 1,
            ArbitrageOutcome::Rejected { .. } => self.arbitrage_rejections += 1,
        }
        match &outcome.spawn {
            SpawnOutcome::NotTriggered => {}
            SpawnOutcome::Opened { side: Side::Long, .. } => self.random_longs += 1,
            SpawnOutcome::Opened { side: Side::Short, .. } => self.random_shorts += 1,
            SpawnOutcome::Rejected { .. } => self.trade_rejections += 1,
        }
        if let Some(liquidation) = &outcome.scan.liquidated {
            self.liquidations += 1;
            self.total_pnl += liquidation.pnl;
        }
        self.anomalies += outcome.scan.anomalies.len() as u64;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Provisioning failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Record stream error: {0}")]
    Record(#[from] RecordError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Reference price {0} cannot be pushed")]
    DegeneratePrice(f64),

    #[error("Pool has no price: reserves {0:?}")]
    EmptyPool(Reserves),
}
