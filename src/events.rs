// 6.0: every action the engine takes against the protocol produces an event. used for audit
// trails and run analysis next to the record stream. EventPayload lists all event types.

use crate::types::{ParticipantId, Price, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub step: u64,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, step: u64, payload: EventPayload) -> Self {
        Self { id, step, payload }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Price events
    ReferencePriceUpdated(ReferencePriceEvent),
    DrawClamped(DrawClampedEvent),

    // Arbitrage events
    ArbitrageExecuted(ArbitrageEvent),
    ArbitrageRejected(RejectionEvent),

    // Random trader events
    TraderSpawned(TraderSpawnedEvent),
    TradeRejected(RejectionEvent),

    // Liquidation events
    PositionLiquidated(LiquidationEvent),
    LiquidationAnomaly(LiquidationAnomalyEvent),
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::ReferencePriceUpdated(_) => "reference_price_updated",
            EventPayload::DrawClamped(_) => "draw_clamped",
            EventPayload::ArbitrageExecuted(_) => "arbitrage_executed",
            EventPayload::ArbitrageRejected(_) => "arbitrage_rejected",
            EventPayload::TraderSpawned(_) => "trader_spawned",
            EventPayload::TradeRejected(_) => "trade_rejected",
            EventPayload::PositionLiquidated(_) => "position_liquidated",
            EventPayload::LiquidationAnomaly(_) => "liquidation_anomaly",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencePriceEvent {
    pub price: Price,
    pub shock: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawClampedEvent {
    pub draw_index: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageEvent {
    pub participant: ParticipantId,
    pub side: Side,
    pub pool_price: Price,
    pub reference_price: Price,
    pub base_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionEvent {
    pub participant: ParticipantId,
    pub side: Side,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraderSpawnedEvent {
    pub participant: ParticipantId,
    pub side: Side,
    pub margin: Decimal,
    pub entry_price: Price,
    pub original_base_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationEvent {
    pub participant: ParticipantId,
    pub side: Side,
    pub entry_price: Price,
    pub base_reserve_delta: Decimal,
    pub pnl: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationAnomalyEvent {
    pub participant: ParticipantId,
    pub reason: AnomalyReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnomalyReason {
    /// Liquidation went through but the quote leg is still open.
    PositionNotCleared { quote_size: Decimal },
    /// The liquidate call itself failed.
    LiquidateFailed(String),
}
