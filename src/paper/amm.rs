// 9.1 paper/amm.rs: constant-product pool (x * y = k). base reserve x, quote reserve y.
// every amount leaving the pool is truncated to 18 decimals, so k never shrinks.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::protocol::{ProtocolError, Reserves};
use crate::types::{truncate_amount, Price};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantProductPool {
    base: Decimal,
    quote: Decimal,
}

impl ConstantProductPool {
    /// Seed the pool with `base_liquidity` at `price` quote per base.
    pub fn seeded(base_liquidity: Decimal, price: Price) -> Result<Self, ProtocolError> {
        if base_liquidity <= Decimal::ZERO {
            return Err(ProtocolError::InvalidAmount(base_liquidity));
        }
        let quote = truncate_amount(base_liquidity * price.value());
        Ok(Self {
            base: base_liquidity,
            quote,
        })
    }

    pub fn reserves(&self) -> Reserves {
        Reserves::new(self.base, self.quote)
    }

    pub fn price(&self) -> Option<Price> {
        self.reserves().price()
    }

    // 9.1.1: quotes. pure, the pool is not touched.

    /// Base received for paying `quote_in` into the pool.
    pub fn base_out_for_quote_in(&self, quote_in: Decimal) -> Result<Decimal, ProtocolError> {
        if quote_in <= Decimal::ZERO {
            return Err(ProtocolError::InvalidAmount(quote_in));
        }
        Ok(truncate_amount(self.base * quote_in / (self.quote + quote_in)))
    }

    /// Base that must be paid in to take `quote_out` out of the pool.
    pub fn base_in_for_quote_out(&self, quote_out: Decimal) -> Result<Decimal, ProtocolError> {
        if quote_out <= Decimal::ZERO {
            return Err(ProtocolError::InvalidAmount(quote_out));
        }
        if quote_out >= self.quote {
            return Err(ProtocolError::InsufficientLiquidity {
                requested: quote_out,
                available: self.quote,
            });
        }
        // round the payment up so the invariant holds after truncation
        let exact = self.base * quote_out / (self.quote - quote_out);
        let truncated = truncate_amount(exact);
        Ok(if truncated < exact { truncated + Decimal::new(1, crate::types::AMOUNT_DP) } else { truncated })
    }

    // 9.1.2: swaps. mutate reserves, return the base amount moved.

    /// Pay quote in, take base out.
    pub fn buy_base(&mut self, quote_in: Decimal) -> Result<Decimal, ProtocolError> {
        let base_out = self.base_out_for_quote_in(quote_in)?;
        self.base -= base_out;
        self.quote += quote_in;
        Ok(base_out)
    }

    /// Pay base in, take exactly `quote_out` out.
    pub fn sell_base(&mut self, quote_out: Decimal) -> Result<Decimal, ProtocolError> {
        let base_in = self.base_in_for_quote_out(quote_out)?;
        self.base += base_in;
        self.quote -= quote_out;
        Ok(base_in)
    }
}
