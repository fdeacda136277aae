// 2.0 protocol.rs: the capability seam between the engine and the trading system.
// the engine only sees reserves, position state and liquidation eligibility through these traits.
// 2.1 Protocol covers oracle, pool, router and margin calls. 2.2 Provisioner covers identities.

use crate::types::{Pair, ParticipantId, Price, Side, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub base: Decimal,
    pub quote: Decimal,
}

impl Reserves {
    pub fn new(base: Decimal, quote: Decimal) -> Self {
        Self { base, quote }
    }

    /// Pool price implied by the reserve ratio, truncated to 18 decimals.
    pub fn price(&self) -> Option<Price> {
        Price::from_ratio(self.quote, self.base)
    }
}

/// Parameters of an open-position request routed through the protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub pair: Pair,
    pub side: Side,
    /// Collateral posted, in base.
    pub margin: Decimal,
    /// Position notional, in quote.
    pub notional: Decimal,
    /// Slippage bound in base: minimum received for longs, maximum paid for shorts.
    pub limit: Decimal,
    pub deadline: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub participant: ParticipantId,
    pub side: Side,
    /// Base moved through the pool by the trade.
    pub base_amount: Decimal,
    pub quote_amount: Decimal,
}

/// Signed position state. base includes margin; quote is negative for a long's debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub margin: Decimal,
    pub base_size: Decimal,
    pub quote_size: Decimal,
}

impl PositionSnapshot {
    pub fn is_closed(&self) -> bool {
        self.quote_size.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationReceipt {
    pub participant: ParticipantId,
    pub reward_recipient: ParticipantId,
    pub base_closed: Decimal,
    pub quote_closed: Decimal,
    /// Base left over after the debt leg was closed. negative means bad debt.
    pub remaining_base: Decimal,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Slippage limit exceeded: limit {limit}, actual {actual}")]
    SlippageExceeded { limit: Decimal, actual: Decimal },

    #[error("Deadline {deadline:?} has passed (now {now:?})")]
    DeadlineExpired { deadline: Timestamp, now: Timestamp },

    #[error("Insufficient pool liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: Decimal, available: Decimal },

    #[error("Initial margin requirement not met: debt ratio {debt_ratio}")]
    InitialMarginViolated { debt_ratio: Decimal },

    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Invalid risk parameter: {0}")]
    InvalidRiskParameter(u32),

    #[error("Unknown pair {0}")]
    UnknownPair(Pair),

    #[error("No position for {0}")]
    NoPosition(ParticipantId),

    #[error("Position of {0} is not liquidatable")]
    NotLiquidatable(ParticipantId),

    #[error("Reference price not set")]
    NoReferencePrice,

    #[error("Protocol unreachable: {0}")]
    Unreachable(String),
}

impl ProtocolError {
    /// True for rejections the protocol is expected to return in normal operation.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, ProtocolError::Unreachable(_))
    }
}

/// The trading system under test. Every call is a blocking request/response.
pub trait Protocol {
    /// Applied once before the first step.
    fn set_risk_parameter(&mut self, beta: u32) -> Result<(), ProtocolError>;

    /// Record one reference price sample as `quote_amount / base_amount`.
    fn set_reference_price(
        &mut self,
        pair: &Pair,
        base_amount: Decimal,
        quote_amount: Decimal,
    ) -> Result<(), ProtocolError>;

    fn reference_price(&self, pair: &Pair) -> Result<Price, ProtocolError>;

    fn reserves(&self, pair: &Pair) -> Result<Reserves, ProtocolError>;

    fn open_position(
        &mut self,
        participant: ParticipantId,
        order: &OpenOrder,
    ) -> Result<TradeReceipt, ProtocolError>;

    fn close_position(
        &mut self,
        participant: ParticipantId,
        pair: &Pair,
        quote_amount: Decimal,
        deadline: Timestamp,
    ) -> Result<TradeReceipt, ProtocolError>;

    fn position(&self, pair: &Pair, participant: ParticipantId) -> Result<PositionSnapshot, ProtocolError>;

    fn can_liquidate(&self, participant: ParticipantId) -> Result<bool, ProtocolError>;

    fn liquidate(
        &mut self,
        participant: ParticipantId,
        reward_recipient: ParticipantId,
    ) -> Result<LiquidationReceipt, ProtocolError>;
}

/// A funded ephemeral identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub native_balance: Decimal,
    pub collateral_balance: Decimal,
    pub trading_approved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvisionError {
    #[error("Identity pool exhausted after {0} participants")]
    Exhausted(u64),

    #[error("Funding failed: {0}")]
    FundingFailed(String),
}

/// Creates and funds new participants.
pub trait Provisioner {
    fn provision(&mut self) -> Result<Participant, ProvisionError>;
}

impl<T: Provisioner + ?Sized> Provisioner for &mut T {
    fn provision(&mut self) -> Result<Participant, ProvisionError> {
        (**self).provision()
    }
}

impl<T: Protocol + ?Sized> Protocol for &mut T {
    fn set_risk_parameter(&mut self, beta: u32) -> Result<(), ProtocolError> {
        (**self).set_risk_parameter(beta)
    }

    fn set_reference_price(
        &mut self,
        pair: &Pair,
        base_amount: Decimal,
        quote_amount: Decimal,
    ) -> Result<(), ProtocolError> {
        (**self).set_reference_price(pair, base_amount, quote_amount)
    }

    fn reference_price(&self, pair: &Pair) -> Result<Price, ProtocolError> {
        (**self).reference_price(pair)
    }

    fn reserves(&self, pair: &Pair) -> Result<Reserves, ProtocolError> {
        (**self).reserves(pair)
    }

    fn open_position(
        &mut self,
        participant: ParticipantId,
        order: &OpenOrder,
    ) -> Result<TradeReceipt, ProtocolError> {
        (**self).open_position(participant, order)
    }

    fn close_position(
        &mut self,
        participant: ParticipantId,
        pair: &Pair,
        quote_amount: Decimal,
        deadline: Timestamp,
    ) -> Result<TradeReceipt, ProtocolError> {
        (**self).close_position(participant, pair, quote_amount, deadline)
    }

    fn position(&self, pair: &Pair, participant: ParticipantId) -> Result<PositionSnapshot, ProtocolError> {
        (**self).position(pair, participant)
    }

    fn can_liquidate(&self, participant: ParticipantId) -> Result<bool, ProtocolError> {
        (**self).can_liquidate(participant)
    }

    fn liquidate(
        &mut self,
        participant: ParticipantId,
        reward_recipient: ParticipantId,
    ) -> Result<LiquidationReceipt, ProtocolError> {
        (**self).liquidate(participant, reward_recipient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reserves_price_is_quote_over_base() {
        let reserves = Reserves::new(dec!(500), dec!(1_000_000));
        assert_eq!(reserves.price().unwrap().value(), dec!(2000));
        assert!(Reserves::new(Decimal::ZERO, dec!(1)).price().is_none());
    }

    #[test]
    fn closed_position_has_zero_quote_leg() {
        let open = PositionSnapshot {
            margin: dec!(0.25),
            base_size: dec!(2.7),
            quote_size: dec!(-5000),
        };
        assert!(!open.is_closed());
        assert!(PositionSnapshot::default().is_closed());
    }

    #[test]
    fn unreachable_is_not_a_rejection() {
        assert!(ProtocolError::NotLiquidatable(ParticipantId(1)).is_rejection());
        assert!(!ProtocolError::Unreachable("rpc down".into()).is_rejection());
    }
}
