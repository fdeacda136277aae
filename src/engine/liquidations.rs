//! Liquidation scanning and PnL accounting.
//!
//! Registry entries are checked in insertion order. The first one that
//! liquidates cleanly ends the scan for the step, so at most one liquidation
//! lands in each record. Entries whose liquidation fails or leaves the quote
//! leg open stay registered and are retried on later steps.

use super::core::Engine;
use super::results::{EngineError, LiquidationResult, ScanResult};
use super::state::SimulationState;
use crate::events::{AnomalyReason, EventPayload, LiquidationAnomalyEvent, LiquidationEvent};
use crate::protocol::{Protocol, Provisioner};
use crate::registry::OpenPosition;
use crate::types::ParticipantId;

impl<P: Protocol, V: Provisioner> Engine<P, V> {
    pub(super) fn scan_liquidations<R>(&mut self, state: &mut SimulationState<R>) -> Result<ScanResult, EngineError> {
        let mut result = ScanResult::default();

        for participant in state.registry.participants() {
            if !self.protocol.can_liquidate(participant)? {
                continue;
            }
            let Some(entry) = state.registry.find(participant).cloned() else {
                continue;
            };

            match self.settle(&entry)? {
                Ok(liquidation) => {
                    state.registry.remove(participant);
                    result.liquidated = Some(liquidation);
                    break;
                }
                Err(reason) => {
                    self.report_anomaly(participant, reason);
                    result.anomalies.push(participant);
                }
            }
        }

        Ok(result)
    }

    /// Liquidate one entry and measure what the pool took in.
    ///
    /// The outer error is fatal (a failed query or an unreachable exchange).
    /// The inner error is an anomaly: the liquidate call was refused or the
    /// position survived it.
    fn settle(&mut self, entry: &OpenPosition) -> Result<Result<LiquidationResult, AnomalyReason>, EngineError> {
        let pair = self.sim.pair.clone();
        let before = self.protocol.reserves(&pair)?.base;

        match self.protocol.liquidate(entry.participant, self.owner.id) {
            Ok(_) => {}
            Err(e) if !e.is_rejection() => return Err(e.into()),
            Err(e) => return Ok(Err(AnomalyReason::LiquidateFailed(e.to_string()))),
        }

        let position = self.protocol.position(&pair, entry.participant)?;
        if !position.is_closed() {
            return Ok(Err(AnomalyReason::PositionNotCleared {
                quote_size: position.quote_size,
            }));
        }

        let after = self.protocol.reserves(&pair)?.base;
        let pnl = entry.realized_pnl(before, after);

        tracing::info!(
            step = self.current_step,
            participant = %entry.participant,
            side = %entry.side,
            entry_price = %entry.entry_price,
            %pnl,
            "position liquidated"
        );
        self.emit_event(EventPayload::PositionLiquidated(LiquidationEvent {
            participant: entry.participant,
            side: entry.side,
            entry_price: entry.entry_price,
            base_reserve_delta: after - before,
            pnl,
        }));

        Ok(Ok(LiquidationResult {
            participant: entry.participant,
            side: entry.side,
            entry_price: entry.entry_price,
            base_reserve_before: before,
            base_reserve_after: after,
            pnl,
        }))
    }

    fn report_anomaly(&mut self, participant: ParticipantId, reason: AnomalyReason) {
        match &reason {
            AnomalyReason::PositionNotCleared { quote_size } => {
                tracing::warn!(step = self.current_step, %participant, %quote_size, "failed to liquidate: position still open");
            }
            AnomalyReason::LiquidateFailed(error) => {
                tracing::warn!(step = self.current_step, %participant, %error, "failed to liquidate");
            }
        }
        self.emit_event(EventPayload::LiquidationAnomaly(LiquidationAnomalyEvent { participant, reason }));
    }
}
