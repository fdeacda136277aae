//! Reference price updates.

use super::core::Engine;
use super::results::EngineError;
use super::state::SimulationState;
use crate::events::{DrawClampedEvent, EventPayload, ReferencePriceEvent};
use crate::protocol::{Protocol, Provisioner};
use crate::random::UniformSource;
use crate::types::Price;
use rust_decimal::Decimal;

impl<P: Protocol, V: Provisioner> Engine<P, V> {
    /// Advance the diffusion one step and push the result to the oracle.
    ///
    /// The price is pushed as `1` base for `floor(P * 10^12) / 10^12` quote and
    /// read back, so the returned value is what the oracle actually holds.
    pub(super) fn update_reference_price<R: UniformSource>(
        &mut self,
        state: &mut SimulationState<R>,
    ) -> Result<Price, EngineError> {
        let first_draw = state.source.draws() + 1;
        let step = state.diffusion.advance(&mut state.source);

        if step.clamped {
            tracing::warn!(step = self.current_step, draw = first_draw, "uniform draw outside [0, 1) clamped");
            self.emit_event(EventPayload::DrawClamped(DrawClampedEvent { draw_index: first_draw }));
        }

        let pushed = Price::from_f64_truncated(step.price).ok_or(EngineError::DegeneratePrice(step.price))?;
        self.protocol
            .set_reference_price(&self.sim.pair, Decimal::ONE, pushed.value())?;
        let price = self.protocol.reference_price(&self.sim.pair)?;

        self.emit_event(EventPayload::ReferencePriceUpdated(ReferencePriceEvent {
            price,
            shock: step.shock,
        }));

        Ok(price)
    }
}
