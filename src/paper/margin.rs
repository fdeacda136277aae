//! Debt-ratio margin rules for paper positions.
//!
//! A position holds `base_size` base (margin included) against a signed quote
//! leg: negative for a long that borrowed quote, positive for a short that
//! sold borrowed base. The debt ratio is what closing the quote leg against
//! the pool would cost, in base, relative to the base on hand. A position is
//! liquidatable once the ratio reaches `1 - beta / 1000`.

use rust_decimal::Decimal;

use super::amm::ConstantProductPool;
use crate::protocol::{PositionSnapshot, ProtocolError};

/// `1 - beta / 1000`.
pub fn liquidation_threshold(beta: u32) -> Result<Decimal, ProtocolError> {
    if beta == 0 || beta >= 1000 {
        return Err(ProtocolError::InvalidRiskParameter(beta));
    }
    Ok(Decimal::ONE - Decimal::from(beta) / Decimal::from(1000))
}

pub fn debt_ratio(position: &PositionSnapshot, pool: &ConstantProductPool) -> Decimal {
    let base = position.base_size;
    let quote = position.quote_size;

    if quote.is_zero() {
        return if base >= Decimal::ZERO { Decimal::ZERO } else { Decimal::MAX };
    }

    if quote < Decimal::ZERO {
        // long: base owed to buy back the borrowed quote
        if base <= Decimal::ZERO {
            return Decimal::MAX;
        }
        match pool.base_in_for_quote_out(-quote) {
            Ok(cost) => cost / base,
            Err(_) => Decimal::MAX,
        }
    } else {
        // short: base owed, covered by selling the quote back
        if base >= Decimal::ZERO {
            return Decimal::ZERO;
        }
        match pool.base_out_for_quote_in(quote) {
            Ok(cover) if cover > Decimal::ZERO => -base / cover,
            _ => Decimal::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarginStatus {
    Healthy { debt_ratio: Decimal },
    Liquidatable { debt_ratio: Decimal },
}

impl MarginStatus {
    pub fn is_liquidatable(&self) -> bool {
        matches!(self, MarginStatus::Liquidatable { .. })
    }

    pub fn debt_ratio(&self) -> Decimal {
        match self {
            MarginStatus::Healthy { debt_ratio } | MarginStatus::Liquidatable { debt_ratio } => *debt_ratio,
        }
    }
}

pub fn evaluate_margin_status(
    position: &PositionSnapshot,
    pool: &ConstantProductPool,
    threshold: Decimal,
) -> MarginStatus {
    let debt_ratio = debt_ratio(position, pool);
    if debt_ratio >= threshold {
        MarginStatus::Liquidatable { debt_ratio }
    } else {
        MarginStatus::Healthy { debt_ratio }
    }
}
