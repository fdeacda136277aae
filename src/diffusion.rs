//! Geometric Brownian motion for the reference price.
//!
//! `P <- P * exp((mu - sigma^2 / 2) * dt + sigma * Z)` with `Z` from the
//! Box-Muller transform over two consecutive uniform draws.

use crate::random::UniformSource;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Largest f64 strictly below 1.
pub const ONE_MINUS_ULP: f64 = 1.0 - f64::EPSILON / 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffusionParams {
    pub initial_price: f64,
    pub drift: f64,
    pub volatility: f64,
    pub step_size: f64,
}

impl Default for DiffusionParams {
    fn default() -> Self {
        Self {
            initial_price: 2000.0,
            drift: 0.0,
            volatility: 0.002,
            step_size: 0.02,
        }
    }
}

/// A standard normal variate and whether its first draw had to be clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalDraw {
    pub value: f64,
    pub clamped: bool,
}

/// Box-Muller: `sqrt(-2 ln(1 - u1)) * cos(2 pi u2)`.
///
/// A first draw of exactly 1 (or anything outside `[0, 1)`) would take the log
/// of zero; it is clamped to [`ONE_MINUS_ULP`] instead of being resampled so
/// the draw count per variate stays at two.
pub fn standard_normal<R: UniformSource + ?Sized>(source: &mut R) -> NormalDraw {
    let u1 = source.next_uniform();
    let u2 = source.next_uniform();
    let (u1, clamped) = clamp_unit(u1);
    NormalDraw {
        value: (-2.0 * (1.0 - u1).ln()).sqrt() * (2.0 * PI * u2).cos(),
        clamped,
    }
}

fn clamp_unit(u: f64) -> (f64, bool) {
    if u.is_nan() {
        (0.0, true)
    } else if u >= 1.0 {
        (ONE_MINUS_ULP, true)
    } else if u < 0.0 {
        (0.0, true)
    } else {
        (u, false)
    }
}

/// Result of one diffusion step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffusionStep {
    pub price: f64,
    pub shock: f64,
    pub clamped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceDiffusion {
    params: DiffusionParams,
    price: f64,
}

impl PriceDiffusion {
    pub fn new(params: DiffusionParams) -> Self {
        let price = params.initial_price;
        Self { params, price }
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn params(&self) -> &DiffusionParams {
        &self.params
    }

    /// Advance one step, consuming exactly two draws.
    pub fn advance<R: UniformSource + ?Sized>(&mut self, source: &mut R) -> DiffusionStep {
        let z = standard_normal(source);
        let p = &self.params;
        let exponent = (p.drift - p.volatility * p.volatility / 2.0) * p.step_size + p.volatility * z.value;
        self.price *= exponent.exp();
        DiffusionStep {
            price: self.price,
            shock: z.value,
            clamped: z.clamped,
        }
    }
}
