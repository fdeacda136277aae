// 8.2 engine/arbitrage.rs: keep the pool near the reference price.
// one corrective trade at most per step, sized by config, never retried.

use super::core::Engine;
use super::results::{ArbitrageOutcome, EngineError};
use crate::events::{ArbitrageEvent, EventPayload, RejectionEvent};
use crate::protocol::{OpenOrder, Protocol, Provisioner};
use crate::types::{Price, Side};
use rust_decimal::Decimal;

// 8.2.1: which way to trade. pool rich -> short pushes it down, pool cheap -> long pushes it up.
pub fn arbitrage_side(pool: Price, reference: Price, threshold: Decimal) -> Option<Side> {
    if pool.value() / reference.value() > threshold {
        Some(Side::Short)
    } else if reference.value() / pool.value() > threshold {
        Some(Side::Long)
    } else {
        None
    }
}

impl<P: Protocol, V: Provisioner> Engine<P, V> {
    pub(super) fn run_arbitrage(&mut self, reference: Price) -> Result<ArbitrageOutcome, EngineError> {
        let pool = self.pool_price()?;
        let Some(side) = arbitrage_side(pool, reference, self.sim.arbitrage.threshold) else {
            return Ok(ArbitrageOutcome::Idle);
        };

        let order = OpenOrder {
            pair: self.sim.pair.clone(),
            side,
            margin: self.sim.arbitrage.margin,
            notional: self.sim.arbitrage.notional,
            limit: self.sim.limits.limit_for(side),
            deadline: self.sim.limits.deadline,
        };
        let participant = self.arbitrageur.id;

        match self.protocol.open_position(participant, &order) {
            Ok(receipt) => {
                self.emit_event(EventPayload::ArbitrageExecuted(ArbitrageEvent {
                    participant,
                    side,
                    pool_price: pool,
                    reference_price: reference,
                    base_amount: receipt.base_amount,
                }));
                Ok(ArbitrageOutcome::Executed {
                    side,
                    base_amount: receipt.base_amount,
                })
            }
            // an unreachable exchange is not a rejection
            Err(reason) if !reason.is_rejection() => Err(reason.into()),
            Err(reason) => {
                tracing::warn!(
                    step = self.current_step,
                    %side,
                    pool_price = %pool,
                    reference_price = %reference,
                    error = %reason,
                    "arbitrage trade rejected"
                );
                self.emit_event(EventPayload::ArbitrageRejected(RejectionEvent {
                    participant,
                    side,
                    reason: reason.to_string(),
                }));
                Ok(ArbitrageOutcome::Rejected { side, reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn price(v: Decimal) -> Price {
        Price::new_unchecked(v)
    }

    #[test]
    fn within_band_does_nothing() {
        let threshold = dec!(1.005);
        assert_eq!(arbitrage_side(price(dec!(2000)), price(dec!(2003.47)), threshold), None);
        assert_eq!(arbitrage_side(price(dec!(2005)), price(dec!(2000)), threshold), None);
    }

    #[test]
    fn rich_pool_is_shorted() {
        assert_eq!(
            arbitrage_side(price(dec!(2020)), price(dec!(2000)), dec!(1.005)),
            Some(Side::Short)
        );
    }

    #[test]
    fn cheap_pool_is_bought() {
        assert_eq!(
            arbitrage_side(price(dec!(1980)), price(dec!(2000)), dec!(1.005)),
            Some(Side::Long)
        );
    }

    #[test]
    fn exact_threshold_is_not_crossed() {
        assert_eq!(arbitrage_side(price(dec!(2010)), price(dec!(2000)), dec!(1.005)), None);
    }
}
