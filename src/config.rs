// 7.0 config.rs: all run settings in one place. seed, processes, trade sizes, risk param.
// 7.1 defaults reproduce the reference run: seed "apeX", 750 steps, beta 50.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::diffusion::DiffusionParams;
use crate::hawkes::HawkesParams;
use crate::random::SourceKind;
use crate::types::{Pair, Timestamp};

/// Initial reference prices outside this range are rejected. The pool is seeded
/// in 18-decimal fixed point and prices are pushed at 12 decimals.
pub const MIN_INITIAL_PRICE: f64 = 1e-6;
pub const MAX_INITIAL_PRICE: f64 = 1e12;

// Run identity and length
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    // Seed string for the uniform source
    pub seed: String,
    // Generator backing the run
    pub source: SourceKind,
    // Number of steps (and records) to produce
    pub steps: u64,
    // Log a progress line every N steps (0 = never)
    pub progress_interval: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: "apeX".to_string(),
            source: SourceKind::Arc4,
            steps: 750,
            progress_interval: 25,
        }
    }
}

/** 7.2: arbitrageur. trades once per step when pool and reference diverge past the threshold */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageConfig {
    // pool/reference (or reference/pool) ratio that triggers a correction
    pub threshold: Decimal,
    // Margin posted per correction, in base
    pub margin: Decimal,
    // Notional per correction, in quote
    pub notional: Decimal,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            threshold: dec!(1.005),
            margin: dec!(5),
            notional: dec!(2500),
        }
    }
}

// Random trader sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraderConfig {
    // Notional per random trade, in quote
    pub notional: Decimal,
    // margin = notional / pool price / leverage_divisor
    pub leverage_divisor: Decimal,
    // Balances granted to each new participant
    pub native_grant: Decimal,
    pub collateral_grant: Decimal,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            notional: dec!(5000),
            leverage_divisor: dec!(10),
            native_grant: dec!(25),
            collateral_grant: dec!(250_000),
        }
    }
}

// Slippage bounds and deadline attached to every order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLimits {
    // Minimum base a long must receive
    pub long_min_base_out: Decimal,
    // Maximum base a short may pay in
    pub short_max_base_in: Decimal,
    pub deadline: Timestamp,
}

impl Default for TradeLimits {
    fn default() -> Self {
        Self {
            long_min_base_out: Decimal::new(1, 18),
            short_max_base_in: dec!(1_000_000),
            deadline: Timestamp::FAR_FUTURE,
        }
    }
}

impl TradeLimits {
    pub fn limit_for(&self, side: crate::types::Side) -> Decimal {
        match side {
            crate::types::Side::Long => self.long_min_base_out,
            crate::types::Side::Short => self.short_max_base_in,
        }
    }
}

// Protocol risk parameter, applied once before the loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub beta: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self { beta: 50 }
    }
}

// The complete simulation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub pair: Pair,
    #[serde(default)]
    pub diffusion: DiffusionParams,
    #[serde(default)]
    pub hawkes: HawkesParams,
    #[serde(default)]
    pub arbitrage: ArbitrageConfig,
    #[serde(default)]
    pub trader: TraderConfig,
    #[serde(default)]
    pub limits: TradeLimits,
    #[serde(default)]
    pub risk: RiskConfig,
}

impl SimConfig {
    // Fewer random trades: roughly 1.5% of steps instead of 10%
    pub fn calm() -> Self {
        let mut config = Self::default();
        config.hawkes.decay = 0.2;
        config
    }

    // Twice the volatility and a more aggressive liquidation threshold
    pub fn stressed() -> Self {
        let mut config = Self::default();
        config.diffusion.volatility = 0.004;
        config.risk.beta = 80;
        config
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }

    /// Default output file name, `sim_{beta}_{steps}.csv`.
    pub fn output_file_name(&self) -> String {
        format!("sim_{}_{}.csv", self.risk.beta, self.run.steps)
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.steps == 0 {
            return Err(ConfigError::InvalidRun {
                reason: "step count must be positive".to_string(),
            });
        }

        let d = &self.diffusion;
        if !(d.initial_price.is_finite() && d.initial_price > 0.0) {
            return Err(ConfigError::InvalidDiffusion {
                reason: "initial price must be positive".to_string(),
            });
        }
        if !(MIN_INITIAL_PRICE..=MAX_INITIAL_PRICE).contains(&d.initial_price) {
            return Err(ConfigError::InvalidDiffusion {
                reason: format!("initial price must lie in [{MIN_INITIAL_PRICE}, {MAX_INITIAL_PRICE}]"),
            });
        }
        if !(d.volatility.is_finite() && d.volatility >= 0.0)
            || !d.drift.is_finite()
            || !(d.step_size.is_finite() && d.step_size > 0.0)
        {
            return Err(ConfigError::InvalidDiffusion {
                reason: "drift, volatility and step size must be finite; volatility >= 0, step > 0".to_string(),
            });
        }

        let h = &self.hawkes;
        if !(h.baseline.is_finite() && h.baseline > 0.0) {
            return Err(ConfigError::InvalidHawkes {
                reason: "baseline intensity must be positive".to_string(),
            });
        }
        if !(h.decay.is_finite() && h.decay > 0.0) || !(h.jump.is_finite() && h.jump >= 0.0) {
            return Err(ConfigError::InvalidHawkes {
                reason: "decay must be positive and jump non-negative".to_string(),
            });
        }

        if self.arbitrage.threshold <= Decimal::ONE {
            return Err(ConfigError::InvalidArbitrage {
                reason: "threshold ratio must exceed 1".to_string(),
            });
        }
        if self.arbitrage.margin <= Decimal::ZERO || self.arbitrage.notional <= Decimal::ZERO {
            return Err(ConfigError::InvalidArbitrage {
                reason: "margin and notional must be positive".to_string(),
            });
        }

        if self.trader.notional <= Decimal::ZERO || self.trader.leverage_divisor <= Decimal::ZERO {
            return Err(ConfigError::InvalidTrader {
                reason: "notional and leverage divisor must be positive".to_string(),
            });
        }

        if self.limits.long_min_base_out < Decimal::ZERO || self.limits.short_max_base_in <= Decimal::ZERO {
            return Err(ConfigError::InvalidLimits {
                reason: "slippage bounds must be non-negative".to_string(),
            });
        }

        if self.risk.beta == 0 || self.risk.beta >= 1000 {
            return Err(ConfigError::InvalidRisk {
                reason: "beta must be in 1..1000".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid run settings: {reason}")]
    InvalidRun { reason: String },
    #[error("invalid diffusion parameters: {reason}")]
    InvalidDiffusion { reason: String },
    #[error("invalid event-arrival parameters: {reason}")]
    InvalidHawkes { reason: String },
    #[error("invalid arbitrage settings: {reason}")]
    InvalidArbitrage { reason: String },
    #[error("invalid trader settings: {reason}")]
    InvalidTrader { reason: String },
    #[error("invalid trade limits: {reason}")]
    InvalidLimits { reason: String },
    #[error("invalid risk parameter: {reason}")]
    InvalidRisk { reason: String },
    #[error("cannot read config {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("cannot parse config: {0}")]
    Parse(String),
}

// Named presets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    #[default]
    Reference,
    Calm,
    Stressed,
}

impl Preset {
    pub fn config(&self) -> SimConfig {
        match self {
            Preset::Reference => SimConfig::default(),
            Preset::Calm => SimConfig::calm(),
            Preset::Stressed => SimConfig::stressed(),
        }
    }
}
