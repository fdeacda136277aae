// 8.3 engine/spawner.rs: random traders. on an event arrival, a fresh participant opens
// a 10x position in a random direction at the current pool price.

use super::core::Engine;
use super::results::{EngineError, SpawnOutcome};
use super::state::SimulationState;
use crate::events::{EventPayload, RejectionEvent, TraderSpawnedEvent};
use crate::protocol::{OpenOrder, Protocol, Provisioner};
use crate::random::UniformSource;
use crate::registry::OpenPosition;
use crate::types::{truncate_amount, Price, Side};
use rust_decimal::Decimal;

/// `draw > 0.5` is long, anything else short.
pub fn side_from_draw(draw: f64) -> Side {
    if draw > 0.5 {
        Side::Long
    } else {
        Side::Short
    }
}

/// Margin posted by a random trader: `notional / pool price / leverage divisor`, truncated at each division.
pub fn trader_margin(notional: Decimal, pool_price: Price, leverage_divisor: Decimal) -> Decimal {
    let base_notional = truncate_amount(notional / pool_price.value());
    truncate_amount(base_notional / leverage_divisor)
}

impl<P: Protocol, V: Provisioner> Engine<P, V> {
    /// Provision, draw a side and open. The side draw is consumed even if the
    /// open is rejected.
    pub(super) fn spawn_trader<R: UniformSource>(
        &mut self,
        state: &mut SimulationState<R>,
        pool_price: Price,
    ) -> Result<SpawnOutcome, EngineError> {
        let participant = self.provisioner.provision()?.id;
        let side = side_from_draw(state.source.next_uniform());
        let margin = trader_margin(self.sim.trader.notional, pool_price, self.sim.trader.leverage_divisor);

        let order = OpenOrder {
            pair: self.sim.pair.clone(),
            side,
            margin,
            notional: self.sim.trader.notional,
            limit: self.sim.limits.limit_for(side),
            deadline: self.sim.limits.deadline,
        };

        let before = self.protocol.reserves(&self.sim.pair)?.base;
        if let Err(reason) = self.protocol.open_position(participant, &order) {
            if !reason.is_rejection() {
                return Err(reason.into());
            }
            tracing::warn!(
                step = self.current_step,
                %participant,
                %side,
                %margin,
                error = %reason,
                "random trade rejected"
            );
            self.emit_event(EventPayload::TradeRejected(RejectionEvent {
                participant,
                side,
                reason: reason.to_string(),
            }));
            return Ok(SpawnOutcome::Rejected {
                participant,
                side,
                reason,
            });
        }
        let after = self.protocol.reserves(&self.sim.pair)?.base;

        // base the pool paid out (long) or took in (short), plus the margin
        let original_base_amount = (before - after) + margin;
        state.registry.insert(OpenPosition::new(
            participant,
            side,
            pool_price,
            original_base_amount,
            self.current_step,
        ))?;

        self.emit_event(EventPayload::TraderSpawned(TraderSpawnedEvent {
            participant,
            side,
            margin,
            entry_price: pool_price,
            original_base_amount,
        }));

        Ok(SpawnOutcome::Opened {
            participant,
            side,
            original_base_amount,
        })
    }
}
