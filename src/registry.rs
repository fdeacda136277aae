// 4.0: open synthetic positions opened by random traders, in insertion order.
// 4.1 the registry. one entry per participant, scanned front to back for liquidation.

use crate::types::{ParticipantId, Price, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub participant: ParticipantId,
    pub side: Side,
    /// Pool price the trade was sized at.
    pub entry_price: Price,
    /// Base moved by the opening trade plus margin posted. pnl baseline.
    pub original_base_amount: Decimal,
    pub opened_at_step: u64,
}

impl OpenPosition {
    pub fn new(
        participant: ParticipantId,
        side: Side,
        entry_price: Price,
        original_base_amount: Decimal,
        opened_at_step: u64,
    ) -> Self {
        Self {
            participant,
            side,
            entry_price,
            original_base_amount,
            opened_at_step,
        }
    }

    // 4.2: pnl of a settled liquidation. baseline minus the base the pool took in.
    pub fn realized_pnl(&self, base_reserve_before: Decimal, base_reserve_after: Decimal) -> Decimal {
        calculate_realized_pnl(self.original_base_amount, base_reserve_before, base_reserve_after)
    }
}

// 4.3: the pnl formula. same order of subtraction for both sides.
pub fn calculate_realized_pnl(
    original_base_amount: Decimal,
    base_reserve_before: Decimal,
    base_reserve_after: Decimal,
) -> Decimal {
    original_base_amount - (base_reserve_after - base_reserve_before)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Participant {0} already has an open position")]
    Duplicate(ParticipantId),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionRegistry {
    entries: Vec<OpenPosition>,
}

impl PositionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, position: OpenPosition) -> Result<(), RegistryError> {
        if self.contains(position.participant) {
            return Err(RegistryError::Duplicate(position.participant));
        }
        self.entries.push(position);
        Ok(())
    }

    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.entries.iter().any(|p| p.participant == participant)
    }

    pub fn find(&self, participant: ParticipantId) -> Option<&OpenPosition> {
        self.entries.iter().find(|p| p.participant == participant)
    }

    /// Removes and returns the entry, keeping the order of the rest.
    pub fn remove(&mut self, participant: ParticipantId) -> Option<OpenPosition> {
        let index = self.entries.iter().position(|p| p.participant == participant)?;
        Some(self.entries.remove(index))
    }

    /// Participants in scan order.
    pub fn participants(&self) -> Vec<ParticipantId> {
        self.entries.iter().map(|p| p.participant).collect()
    }

    pub fn count_by_side(&self, side: Side) -> usize {
        self.entries.iter().filter(|p| p.side == side).count()
    }
}
