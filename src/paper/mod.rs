// 9.0 paper/: an in-process protocol. one constant-product pool, an oracle slot,
// debt-ratio margin positions. lets the binary and the tests run end to end with no chain.
// 9.1 amm.rs pool maths. 9.2 margin.rs debt ratio and liquidation status.

pub mod amm;
pub mod margin;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::config::{SimConfig, TraderConfig};
use crate::protocol::{
    LiquidationReceipt, OpenOrder, Participant, PositionSnapshot, Protocol, ProtocolError, ProvisionError,
    Provisioner, Reserves, TradeReceipt,
};
use crate::types::{Pair, ParticipantId, Price, Side, Timestamp};
use amm::ConstantProductPool;
use margin::{evaluate_margin_status, liquidation_threshold, MarginStatus};

/// Base liquidity the pool is seeded with.
pub const DEFAULT_BASE_LIQUIDITY: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

#[derive(Debug, Clone)]
pub struct PaperExchange {
    pair: Pair,
    pool: ConstantProductPool,
    reference_price: Option<Price>,
    reference_updates: u64,
    threshold: Decimal,
    positions: HashMap<ParticipantId, PositionSnapshot>,
    liquidation_rewards: HashMap<ParticipantId, Decimal>,
    clock: Option<Timestamp>,
}

impl PaperExchange {
    pub fn new(pair: Pair, initial_price: Price, base_liquidity: Decimal) -> Result<Self, ProtocolError> {
        Ok(Self {
            pair,
            pool: ConstantProductPool::seeded(base_liquidity, initial_price)?,
            reference_price: None,
            reference_updates: 0,
            threshold: liquidation_threshold(50)?,
            positions: HashMap::new(),
            liquidation_rewards: HashMap::new(),
            clock: None,
        })
    }

    /// Pool seeded with 500 base at the configured initial reference price.
    pub fn from_config(config: &SimConfig) -> Result<Self, ProtocolError> {
        let initial = Decimal::from_f64(config.diffusion.initial_price)
            .and_then(Price::new)
            .ok_or_else(|| {
                ProtocolError::Unreachable(format!(
                    "initial price {} is not representable",
                    config.diffusion.initial_price
                ))
            })?;
        Self::new(config.pair.clone(), initial, DEFAULT_BASE_LIQUIDITY)
    }

    /// Pin the clock deadlines are checked against. Wall clock otherwise.
    pub fn with_clock(mut self, now: Timestamp) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn open_positions(&self) -> usize {
        self.positions.len()
    }

    pub fn reference_updates(&self) -> u64 {
        self.reference_updates
    }

    /// Base paid out to a liquidation reward recipient so far.
    pub fn rewards_of(&self, participant: ParticipantId) -> Decimal {
        self.liquidation_rewards.get(&participant).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn margin_status(&self, participant: ParticipantId) -> Option<MarginStatus> {
        self.positions
            .get(&participant)
            .map(|p| evaluate_margin_status(p, &self.pool, self.threshold))
    }

    fn now(&self) -> Timestamp {
        self.clock.unwrap_or_else(Timestamp::now)
    }

    fn check_pair(&self, pair: &Pair) -> Result<(), ProtocolError> {
        if *pair != self.pair {
            return Err(ProtocolError::UnknownPair(pair.clone()));
        }
        Ok(())
    }

    fn check_deadline(&self, deadline: Timestamp) -> Result<(), ProtocolError> {
        let now = self.now();
        if deadline < now {
            return Err(ProtocolError::DeadlineExpired { deadline, now });
        }
        Ok(())
    }

    // 9.0.1: settle a quote leg against a pool. returns (base delta for the position, pool after).
    fn settle_quote_leg(
        pool: &ConstantProductPool,
        quote_leg: Decimal,
    ) -> Result<(Decimal, ConstantProductPool), ProtocolError> {
        let mut next = pool.clone();
        let base_delta = if quote_leg < Decimal::ZERO {
            -next.sell_base(-quote_leg)?
        } else {
            next.buy_base(quote_leg)?
        };
        Ok((base_delta, next))
    }
}

impl Protocol for PaperExchange {
    fn set_risk_parameter(&mut self, beta: u32) -> Result<(), ProtocolError> {
        self.threshold = liquidation_threshold(beta)?;
        Ok(())
    }

    fn set_reference_price(
        &mut self,
        pair: &Pair,
        base_amount: Decimal,
        quote_amount: Decimal,
    ) -> Result<(), ProtocolError> {
        self.check_pair(pair)?;
        if base_amount <= Decimal::ZERO {
            return Err(ProtocolError::InvalidAmount(base_amount));
        }
        let price = Price::from_ratio(quote_amount, base_amount).ok_or(ProtocolError::InvalidAmount(quote_amount))?;
        self.reference_price = Some(price);
        self.reference_updates += 1;
        Ok(())
    }

    fn reference_price(&self, pair: &Pair) -> Result<Price, ProtocolError> {
        self.check_pair(pair)?;
        self.reference_price.ok_or(ProtocolError::NoReferencePrice)
    }

    fn reserves(&self, pair: &Pair) -> Result<Reserves, ProtocolError> {
        self.check_pair(pair)?;
        Ok(self.pool.reserves())
    }

    fn open_position(
        &mut self,
        participant: ParticipantId,
        order: &OpenOrder,
    ) -> Result<TradeReceipt, ProtocolError> {
        self.check_pair(&order.pair)?;
        self.check_deadline(order.deadline)?;
        if order.margin <= Decimal::ZERO {
            return Err(ProtocolError::InvalidAmount(order.margin));
        }
        if order.notional <= Decimal::ZERO {
            return Err(ProtocolError::InvalidAmount(order.notional));
        }

        let mut pool = self.pool.clone();
        let (base_delta, quote_delta) = match order.side {
            Side::Long => {
                let base_out = pool.buy_base(order.notional)?;
                if base_out < order.limit {
                    return Err(ProtocolError::SlippageExceeded {
                        limit: order.limit,
                        actual: base_out,
                    });
                }
                (base_out, -order.notional)
            }
            Side::Short => {
                let base_in = pool.sell_base(order.notional)?;
                if base_in > order.limit {
                    return Err(ProtocolError::SlippageExceeded {
                        limit: order.limit,
                        actual: base_in,
                    });
                }
                (-base_in, order.notional)
            }
        };

        let current = self.positions.get(&participant).copied().unwrap_or_default();
        let next = PositionSnapshot {
            margin: current.margin + order.margin,
            base_size: current.base_size + order.margin + base_delta,
            quote_size: current.quote_size + quote_delta,
        };

        // no position may open already underwater
        if let MarginStatus::Liquidatable { debt_ratio } = evaluate_margin_status(&next, &pool, self.threshold) {
            return Err(ProtocolError::InitialMarginViolated { debt_ratio });
        }

        self.pool = pool;
        self.positions.insert(participant, next);

        Ok(TradeReceipt {
            participant,
            side: order.side,
            base_amount: base_delta.abs(),
            quote_amount: order.notional,
        })
    }

    fn close_position(
        &mut self,
        participant: ParticipantId,
        pair: &Pair,
        quote_amount: Decimal,
        deadline: Timestamp,
    ) -> Result<TradeReceipt, ProtocolError> {
        self.check_pair(pair)?;
        self.check_deadline(deadline)?;
        let current = *self.positions.get(&participant).ok_or(ProtocolError::NoPosition(participant))?;
        if quote_amount <= Decimal::ZERO || quote_amount > current.quote_size.abs() {
            return Err(ProtocolError::InvalidAmount(quote_amount));
        }

        // closing a long repays borrowed quote; closing a short hands quote back for base
        let (side, leg) = if current.quote_size < Decimal::ZERO {
            (Side::Short, -quote_amount)
        } else {
            (Side::Long, quote_amount)
        };
        let (base_delta, pool) = Self::settle_quote_leg(&self.pool, leg)?;

        let next = PositionSnapshot {
            margin: current.margin,
            base_size: current.base_size + base_delta,
            quote_size: current.quote_size - leg,
        };
        self.pool = pool;
        if next.is_closed() {
            self.positions.remove(&participant);
        } else {
            self.positions.insert(participant, next);
        }

        Ok(TradeReceipt {
            participant,
            side,
            base_amount: base_delta.abs(),
            quote_amount,
        })
    }

    fn position(&self, pair: &Pair, participant: ParticipantId) -> Result<PositionSnapshot, ProtocolError> {
        self.check_pair(pair)?;
        Ok(self.positions.get(&participant).copied().unwrap_or_default())
    }

    fn can_liquidate(&self, participant: ParticipantId) -> Result<bool, ProtocolError> {
        Ok(self
            .margin_status(participant)
            .map(|s| s.is_liquidatable())
            .unwrap_or(false))
    }

    fn liquidate(
        &mut self,
        participant: ParticipantId,
        reward_recipient: ParticipantId,
    ) -> Result<LiquidationReceipt, ProtocolError> {
        let position = *self.positions.get(&participant).ok_or(ProtocolError::NoPosition(participant))?;
        if !evaluate_margin_status(&position, &self.pool, self.threshold).is_liquidatable() {
            return Err(ProtocolError::NotLiquidatable(participant));
        }

        let (base_delta, pool) = if position.quote_size.is_zero() {
            (Decimal::ZERO, self.pool.clone())
        } else {
            Self::settle_quote_leg(&self.pool, position.quote_size)?
        };
        let remaining_base = position.base_size + base_delta;

        self.pool = pool;
        self.positions.remove(&participant);
        if remaining_base > Decimal::ZERO {
            *self.liquidation_rewards.entry(reward_recipient).or_insert(Decimal::ZERO) += remaining_base;
        }

        Ok(LiquidationReceipt {
            participant,
            reward_recipient,
            base_closed: base_delta.abs(),
            quote_closed: position.quote_size.abs(),
            remaining_base,
        })
    }
}

/// Issues participants with sequential ids and fixed balances.
#[derive(Debug, Clone)]
pub struct SequentialProvisioner {
    next_id: u64,
    native_grant: Decimal,
    collateral_grant: Decimal,
    capacity: Option<u64>,
    issued: u64,
}

impl SequentialProvisioner {
    pub fn new(native_grant: Decimal, collateral_grant: Decimal) -> Self {
        Self {
            next_id: 1,
            native_grant,
            collateral_grant,
            capacity: None,
            issued: 0,
        }
    }

    pub fn from_config(trader: &TraderConfig) -> Self {
        Self::new(trader.native_grant, trader.collateral_grant)
    }

    /// Stop issuing after `capacity` participants.
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }
}

impl Provisioner for SequentialProvisioner {
    fn provision(&mut self) -> Result<Participant, ProvisionError> {
        if self.capacity.is_some_and(|cap| self.issued >= cap) {
            return Err(ProvisionError::Exhausted(self.issued));
        }
        let id = ParticipantId(self.next_id);
        self.next_id += 1;
        self.issued += 1;
        Ok(Participant {
            id,
            native_balance: self.native_grant,
            collateral_balance: self.collateral_grant,
            trading_approved: true,
        })
    }
}
